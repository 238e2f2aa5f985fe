//! # gluvol
//!
//! State and lifecycle core of a GlusterFS volume driver.
//!
//! ## Features
//!
//! - **Shared mounts**: volumes pointing at the same remote volume can share
//!   one FUSE mount, reference counted per volume and per mount
//! - **Crash recovery**: the live mount table is consulted before mounting, so
//!   a mount left behind by a previous run is adopted instead of duplicated
//! - **Persistence**: the whole state is rewritten to a versioned JSON file
//!   after every change
//!
//! ## Usage
//!
//! ```no_run
//! use std::collections::HashMap;
//!
//! use gluvol::runtime::{DriverConfig, VolumeDriver};
//!
//! # async fn example() -> gluvol_common::GluvolResult<()> {
//! let driver = VolumeDriver::new(DriverConfig::default().with_shared_mounts(true));
//!
//! let options = HashMap::from([("voluri".to_string(), "node-1,node-2:gv0".to_string())]);
//! driver.create("data", Some(options)).await?;
//!
//! let mountpoint = driver.mount("data").await?;
//! println!("mounted at {}", mountpoint.display());
//!
//! driver.unmount("data").await?;
//! driver.remove("data").await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod backend;
pub mod cli;
pub mod exec;
pub mod filesystem;
pub mod runtime;
pub mod types;

pub use runtime::VolumeDriver;
