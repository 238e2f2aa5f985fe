//! Backend mount-command builders.
//!
//! A backend turns the opaque options a volume was created with into a
//! canonical target (used to share mounts between volumes) and into the
//! command that mounts that target.

mod gluster;

use std::collections::BTreeMap;
use std::path::Path;

use gluvol_common::GluvolResult;

use crate::exec::MountCommand;

pub use gluster::{GlusterBackend, VOLURI_OPTION};

/// Builds mount commands for one kind of remote storage.
pub trait MountBackend: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &str;

    /// Normalize and validate creation options in place.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when options are missing or malformed.
    fn validate(&self, options: &mut BTreeMap<String, String>) -> GluvolResult<()>;

    /// Canonical form of the remote target.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when the target option is missing.
    fn target(&self, options: &BTreeMap<String, String>) -> GluvolResult<String>;

    /// Command that mounts the target on `mountpoint`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when the target option is missing or malformed.
    fn mount_command(
        &self,
        options: &BTreeMap<String, String>,
        mountpoint: &Path,
    ) -> GluvolResult<MountCommand>;

    /// Prefix of the filesystem type the mount shows up with.
    fn fs_type(&self) -> &str;
}
