//! Driver configuration.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use gluvol_common::{GluvolError, GluvolPaths, GluvolResult};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Schema version of the snapshot file written by this build.
pub const SCHEMA_VERSION: u32 = 1;

/// How long a mount process is watched for an early failure.
pub const DEFAULT_MOUNT_WAIT: Duration = Duration::from_secs(5);

/// Bytes left as is in a mount key: unreserved characters plus the
/// sub-delimiters allowed inside a URL path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b':')
    .remove(b'=')
    .remove(b'@');

/// How a volume's mount key is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MountNaming {
    /// One mount per volume, named after the volume.
    #[default]
    VolumeName,
    /// One mount per remote target, shared by every volume pointing at it.
    Target,
}

impl MountNaming {
    /// Derive the mount key, path-escaped so it is a single path component.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when the escaped key is empty, `.` or `..`.
    pub fn mount_key(self, volume: &str, target: &str) -> GluvolResult<String> {
        let raw = match self {
            Self::VolumeName => volume,
            Self::Target => target,
        };
        let key = utf8_percent_encode(raw, PATH_SEGMENT).to_string();

        let mut components = Path::new(&key).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(key),
            _ => Err(GluvolError::invalid_argument(format!(
                "`{raw}` cannot be used as a mount point name"
            ))),
        }
    }
}

/// Driver configuration options.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Mount root and state directory.
    pub paths: GluvolPaths,
    /// Mount key policy.
    pub naming: MountNaming,
    /// Snapshot schema version.
    pub schema_version: u32,
    /// Observation window for a starting mount process.
    pub mount_wait: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            paths: GluvolPaths::new(),
            naming: MountNaming::default(),
            schema_version: SCHEMA_VERSION,
            mount_wait: DEFAULT_MOUNT_WAIT,
        }
    }
}

impl DriverConfig {
    /// Keep mount points and state under a single directory.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.paths = GluvolPaths::with_root(root);
        self
    }

    /// Set the mount point base directory.
    #[must_use]
    pub fn with_mount_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.paths.root = root.into();
        self
    }

    /// Set the state directory.
    #[must_use]
    pub fn with_state_dir(mut self, state: impl Into<PathBuf>) -> Self {
        self.paths = self.paths.with_state_dir(state);
        self
    }

    /// Share one mount between volumes with the same target.
    #[must_use]
    pub fn with_shared_mounts(mut self, shared: bool) -> Self {
        self.naming = if shared {
            MountNaming::Target
        } else {
            MountNaming::VolumeName
        };
        self
    }

    /// Set the mount observation window.
    #[must_use]
    pub fn with_mount_wait(mut self, wait: Duration) -> Self {
        self.mount_wait = wait;
        self
    }

    /// Set the snapshot schema version.
    #[must_use]
    pub fn with_schema_version(mut self, version: u32) -> Self {
        self.schema_version = version;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = DriverConfig::default();
        assert_eq!(config.naming, MountNaming::VolumeName);
        assert_eq!(config.schema_version, 1);
        assert_eq!(config.mount_wait, Duration::from_secs(5));
    }

    #[test]
    fn builder_pattern() {
        let config = DriverConfig::default()
            .with_root("/custom/root")
            .with_shared_mounts(true)
            .with_mount_wait(Duration::from_millis(50));

        assert_eq!(config.naming, MountNaming::Target);
        assert_eq!(config.paths.root, PathBuf::from("/custom/root/mounts"));
        assert_eq!(config.mount_wait, Duration::from_millis(50));
    }

    #[test]
    fn mount_key_policy() {
        let key = |naming: MountNaming, volume, target| naming.mount_key(volume, target).unwrap();

        assert_eq!(key(MountNaming::VolumeName, "test", "gluster-node:volname"), "test");
        assert_eq!(
            key(MountNaming::Target, "test", "gluster-node:volname"),
            "gluster-node:volname"
        );
        assert_eq!(
            key(MountNaming::Target, "test", "node-1,node-2:gv0"),
            "node-1%2Cnode-2:gv0"
        );
        assert_eq!(key(MountNaming::VolumeName, "a/b", ""), "a%2Fb");
        assert_eq!(key(MountNaming::VolumeName, "my vol;1?", ""), "my%20vol%3B1%3F");
        assert_eq!(key(MountNaming::VolumeName, "..hidden", ""), "..hidden");
    }

    #[test]
    fn mount_key_must_be_a_single_component() {
        for name in ["", ".", ".."] {
            let err = MountNaming::VolumeName.mount_key(name, "node:gv0").unwrap_err();
            assert_eq!(err.kind(), gluvol_common::ErrorKind::InvalidArgument, "{name:?}");
        }
    }
}
