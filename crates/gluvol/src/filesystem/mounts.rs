//! Live mount table probing.

use std::path::{Path, PathBuf};

use gluvol_common::GluvolResult;

/// Default location of the kernel mount table.
pub const PROC_MOUNTS: &str = "/proc/mounts";

/// Read-only view of the OS mount table.
pub trait MountTable: Send + Sync {
    /// Whether `path` currently has a filesystem whose type starts with
    /// `fs_type` mounted on it.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the mount table cannot be read.
    fn is_mounted(&self, path: &Path, fs_type: &str) -> GluvolResult<bool>;
}

/// One parsed mount table line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    /// Mounted device or remote.
    pub source: String,
    /// Mount point.
    pub target: PathBuf,
    /// Filesystem type (e.g. `fuse.glusterfs`).
    pub fs_type: String,
}

/// Mount table backed by `/proc/mounts` (or any file in that format).
#[derive(Debug, Clone)]
pub struct ProcMounts {
    source: PathBuf,
}

impl ProcMounts {
    /// Probe the kernel mount table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe a file in `/proc/mounts` format.
    pub fn with_source(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Read and parse every entry.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read.
    pub fn entries(&self) -> GluvolResult<Vec<MountEntry>> {
        let content = std::fs::read_to_string(&self.source)?;
        Ok(content.lines().filter_map(parse_line).collect())
    }
}

impl Default for ProcMounts {
    fn default() -> Self {
        Self::with_source(PROC_MOUNTS)
    }
}

impl MountTable for ProcMounts {
    fn is_mounted(&self, path: &Path, fs_type: &str) -> GluvolResult<bool> {
        let mounted = self
            .entries()?
            .iter()
            .any(|entry| entry.target == path && entry.fs_type.starts_with(fs_type));

        tracing::debug!(path = %path.display(), fs_type, mounted, "Probed mount table");
        Ok(mounted)
    }
}

fn parse_line(line: &str) -> Option<MountEntry> {
    let mut fields = line.split_ascii_whitespace();
    let source = fields.next()?;
    let target = fields.next()?;
    let fs_type = fields.next()?;
    Some(MountEntry {
        source: unescape(source),
        target: PathBuf::from(unescape(target)),
        fs_type: fs_type.to_string(),
    })
}

/// Decode the `\ooo` octal escapes the kernel uses for whitespace and
/// backslashes.
fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && is_octal(&bytes[i + 1..i + 4]) {
            let value = (bytes[i + 1] - b'0') * 64 + (bytes[i + 2] - b'0') * 8 + (bytes[i + 3] - b'0');
            out.push(value);
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn is_octal(digits: &[u8]) -> bool {
    digits.len() == 3 && digits[0] <= b'3' && digits.iter().all(|d| (b'0'..=b'7').contains(d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    const TABLE: &str = "\
proc /proc proc rw,nosuid,nodev,noexec,relatime 0 0
node-1:/gv0 /var/lib/docker-volumes/gluster/v1 fuse.glusterfs rw,relatime,user_id=0,group_id=0 0 0
node-1:/gv1 /var/lib/docker-volumes/gluster/with\\040space fuse.glusterfs rw 0 0
/dev/sda1 /var/lib/docker-volumes/gluster/plain ext4 rw 0 0
";

    fn table() -> (NamedTempFile, ProcMounts) {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), TABLE).unwrap();
        let mounts = ProcMounts::with_source(file.path());
        (file, mounts)
    }

    #[test]
    fn detects_fuse_mount() {
        let (_file, mounts) = table();
        assert!(
            mounts
                .is_mounted(Path::new("/var/lib/docker-volumes/gluster/v1"), "fuse")
                .unwrap()
        );
        assert!(
            !mounts
                .is_mounted(Path::new("/var/lib/docker-volumes/gluster/v2"), "fuse")
                .unwrap()
        );
    }

    #[test]
    fn ignores_other_filesystem_types() {
        let (_file, mounts) = table();
        assert!(
            !mounts
                .is_mounted(Path::new("/var/lib/docker-volumes/gluster/plain"), "fuse")
                .unwrap()
        );
    }

    #[test]
    fn prefix_of_a_path_is_not_a_match() {
        let (_file, mounts) = table();
        assert!(
            !mounts
                .is_mounted(Path::new("/var/lib/docker-volumes/gluster"), "fuse")
                .unwrap()
        );
    }

    #[test]
    fn decodes_octal_escapes() {
        let (_file, mounts) = table();
        let entries = mounts.entries().unwrap();
        assert_eq!(
            entries[2].target,
            PathBuf::from("/var/lib/docker-volumes/gluster/with space")
        );
        assert_eq!(entries[1].source, "node-1:/gv0");
    }

    #[test]
    fn unreadable_table_is_an_error() {
        let mounts = ProcMounts::with_source("/nonexistent/mounts");
        assert!(mounts.is_mounted(Path::new("/x"), "fuse").is_err());
    }
}
