//! External process execution.

mod process;

pub use process::{CommandRunner, MountCommand, MountOutcome, SystemRunner};
