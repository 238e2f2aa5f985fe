//! Standard filesystem paths for gluvol.

use std::path::PathBuf;

use once_cell::sync::Lazy;

/// Name of the snapshot file inside the state directory.
pub const PERSISTENCE_FILE: &str = "persistence.json";

/// Default base directory for mount points.
pub static GLUVOL_ROOT: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var("GLUVOL_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/var/lib/docker-volumes/gluster"))
});

/// Default directory holding the persisted snapshot.
pub static GLUVOL_STATE_DIR: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var("GLUVOL_STATE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/etc/docker-volumes/gluster"))
});

/// Standard paths used by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GluvolPaths {
    /// Base directory under which every mount point is created.
    pub root: PathBuf,
    /// Directory holding the snapshot file.
    pub state: PathBuf,
}

impl GluvolPaths {
    /// Create paths with default locations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create paths rooted in a single directory.
    ///
    /// Mount points go to `<root>/mounts`, the snapshot to `<root>/state`.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            state: root.join("state"),
            root: root.join("mounts"),
        }
    }

    /// Override the state directory.
    #[must_use]
    pub fn with_state_dir(mut self, state: impl Into<PathBuf>) -> Self {
        self.state = state.into();
        self
    }

    /// Mount point for a mount key.
    #[must_use]
    pub fn mountpoint(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl Default for GluvolPaths {
    fn default() -> Self {
        Self {
            root: GLUVOL_ROOT.clone(),
            state: GLUVOL_STATE_DIR.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_root() {
        let paths = GluvolPaths::with_root("/tmp/gluvol-test");
        assert_eq!(paths.root, PathBuf::from("/tmp/gluvol-test/mounts"));
        assert_eq!(paths.state, PathBuf::from("/tmp/gluvol-test/state"));
    }

    #[test]
    fn mountpoint_path() {
        let paths = GluvolPaths::with_root("/srv").with_state_dir("/etc/gluvol");
        assert_eq!(paths.mountpoint("v1"), PathBuf::from("/srv/mounts/v1"));
        assert_eq!(paths.state, PathBuf::from("/etc/gluvol"));
    }
}
