//! Snapshot persistence.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use gluvol_common::paths::PERSISTENCE_FILE;
use gluvol_common::{GluvolError, GluvolResult};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::store::{Mount, Snapshot, Volume};

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    volumes: &'a HashMap<String, Volume>,
    mounts: &'a HashMap<String, Mount>,
}

/// Reads and writes the versioned snapshot file.
#[derive(Debug, Clone)]
pub struct SnapshotCodec {
    /// Directory holding the snapshot file.
    state_dir: PathBuf,
    /// Schema version written on save and required on load.
    version: u32,
}

impl SnapshotCodec {
    /// Create a codec for `state_dir`.
    pub fn new(state_dir: impl Into<PathBuf>, version: u32) -> Self {
        Self {
            state_dir: state_dir.into(),
            version,
        }
    }

    /// Path of the snapshot file.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.state_dir.join(PERSISTENCE_FILE)
    }

    /// Schema version of this codec.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Write the whole snapshot, replacing the previous file.
    ///
    /// # Errors
    ///
    /// `Persistence` if the state directory cannot be created, is not a
    /// directory, or the file cannot be written.
    pub fn save(&self, snapshot: &Snapshot) -> GluvolResult<()> {
        self.ensure_state_dir()?;

        let json = serde_json::to_vec(&SnapshotRef {
            version: self.version,
            volumes: &snapshot.volumes,
            mounts: &snapshot.mounts,
        })?;

        let path = self.path();
        let mut file = tempfile::NamedTempFile::new_in(&self.state_dir)
            .map_err(|e| GluvolError::persistence(format!("{}: {e}", path.display())))?;
        file.write_all(&json)
            .and_then(|()| file.as_file().sync_all())
            .map_err(|e| GluvolError::persistence(format!("{}: {e}", path.display())))?;
        file.persist(&path).map_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Unable to write snapshot");
            GluvolError::persistence(format!("{}: {}", path.display(), e.error))
        })?;

        tracing::debug!(
            path = %path.display(),
            volumes = snapshot.volumes.len(),
            mounts = snapshot.mounts.len(),
            "Saved snapshot"
        );
        Ok(())
    }

    /// Read the snapshot.
    ///
    /// Never fails: a missing, unreadable or incompatible file yields an empty
    /// snapshot. A version mismatch discards everything the file holds.
    #[must_use]
    pub fn load(&self) -> Snapshot {
        let empty = Snapshot {
            version: self.version,
            ..Snapshot::default()
        };
        let path = self.path();

        let content = match std::fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No snapshot found, starting with no volumes");
                return empty;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Unable to read snapshot, starting with no volumes");
                return empty;
            }
        };

        let mut raw: serde_json::Map<String, serde_json::Value> =
            match serde_json::from_slice(&content) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Unable to parse snapshot, starting with no volumes");
                    return empty;
                }
            };

        let version = raw
            .get("version")
            .and_then(serde_json::Value::as_u64)
            .and_then(|v| u32::try_from(v).ok());
        if version != Some(self.version) {
            tracing::warn!(
                path = %path.display(),
                found = ?version,
                expected = self.version,
                "Snapshot version mismatch, discarding all persisted volumes and mounts"
            );
            return empty;
        }

        let snapshot = Snapshot {
            version: self.version,
            volumes: take_section(&mut raw, "volumes"),
            mounts: take_section(&mut raw, "mounts"),
        };

        tracing::debug!(
            path = %path.display(),
            volumes = snapshot.volumes.len(),
            mounts = snapshot.mounts.len(),
            "Loaded snapshot"
        );
        snapshot
    }

    fn ensure_state_dir(&self) -> GluvolResult<()> {
        match std::fs::symlink_metadata(&self.state_dir) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(GluvolError::persistence(format!(
                "{} already exists and is not a directory",
                self.state_dir.display()
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                create_private_dir(&self.state_dir)
                    .map_err(|e| GluvolError::persistence(format!("{}: {e}", self.state_dir.display())))
            }
            Err(e) => Err(GluvolError::persistence(format!(
                "{}: {e}",
                self.state_dir.display()
            ))),
        }
    }
}

/// Decode one top-level map, falling back to empty on its own.
fn take_section<T: DeserializeOwned>(
    raw: &mut serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> HashMap<String, T> {
    let Some(value) = raw.remove(key) else {
        return HashMap::new();
    };
    if value.is_null() {
        return HashMap::new();
    }
    serde_json::from_value(value).unwrap_or_else(|e| {
        tracing::warn!(section = key, error = %e, "Unable to decode snapshot section, starting it empty");
        HashMap::new()
    })
}

/// `mkdir -p` with mode 0700.
pub(crate) fn create_private_dir(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(path)
}
