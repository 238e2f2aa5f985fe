//! # gluvol-common
//!
//! Shared types for the gluvol volume driver:
//! - Error type and error kinds
//! - Standard filesystem paths

#![warn(missing_docs)]

pub mod error;
pub mod paths;

pub use error::{ErrorKind, GluvolError, GluvolResult};
pub use paths::GluvolPaths;
