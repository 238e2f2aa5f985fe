//! Volume driver core.
//!
//! This module provides the [`VolumeDriver`] and the state it guards.

mod config;
mod driver;
mod state;
mod store;

pub use config::{DEFAULT_MOUNT_WAIT, DriverConfig, MountNaming, SCHEMA_VERSION};
pub use driver::VolumeDriver;
pub use state::SnapshotCodec;
pub use store::{
    ConnectionDelta, Connections, Mount, ResourceStore, Snapshot, Volume, adjust,
};

pub(crate) use state::create_private_dir;
