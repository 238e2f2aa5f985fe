//! Filesystem operations for mount points.
//!
//! This module handles:
//! - Mount point directory creation and removal
//! - Probing the live mount table

mod dirs;
mod mounts;

pub use dirs::{prepare_mountpoint, remove_mountpoint};
pub use mounts::{MountEntry, MountTable, PROC_MOUNTS, ProcMounts};
