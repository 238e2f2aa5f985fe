//! In-memory volume and mount records.
//!
//! The store is a plain pair of maps. It performs no I/O and no locking; the
//! driver owns it behind its lock and is the only caller that mutates it.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use gluvol_common::{GluvolError, GluvolResult};
use serde::{Deserialize, Serialize};

/// Something that carries a connection counter.
pub trait Connections {
    /// Current number of active attachments.
    fn connections(&self) -> u32;

    /// Overwrite the counter.
    fn set_connections(&mut self, n: u32);
}

/// Change applied to connection counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionDelta {
    /// Set every target to this value.
    Set(u32),
    /// Add to every target, saturating at zero.
    Add(i64),
}

impl ConnectionDelta {
    fn apply(self, current: u32) -> u32 {
        match self {
            Self::Set(n) => n,
            Self::Add(d) => {
                let next = i64::from(current).saturating_add(d);
                u32::try_from(next.max(0)).unwrap_or(u32::MAX)
            }
        }
    }
}

/// Apply one delta to every entity in order.
pub fn adjust(delta: ConnectionDelta, targets: &mut [&mut dyn Connections]) {
    for target in targets.iter_mut() {
        let next = delta.apply(target.connections());
        target.set_connections(next);
    }
}

/// A named volume bound to a mount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    /// Backend options given at creation (e.g. `voluri`).
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    /// Key of the mount this volume is bound to.
    pub mount: String,
    /// Active attachments through this volume.
    #[serde(default)]
    pub connections: u32,
    /// Creation time. Missing in snapshots written by older versions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Volume {
    /// Create an unattached volume bound to `mount`.
    pub fn new(options: BTreeMap<String, String>, mount: impl Into<String>) -> Self {
        Self {
            options,
            mount: mount.into(),
            connections: 0,
            created_at: Some(Utc::now()),
        }
    }
}

impl Connections for Volume {
    fn connections(&self) -> u32 {
        self.connections
    }

    fn set_connections(&mut self, n: u32) {
        self.connections = n;
    }
}

/// A mount point shared by one or more volumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mount {
    /// Absolute mount point directory.
    pub path: PathBuf,
    /// Sum of the attachments of every volume bound here.
    #[serde(default)]
    pub connections: u32,
    /// Pid of a mount process left running in the background.
    #[serde(skip)]
    pub process: Option<u32>,
}

impl Mount {
    /// Create an unattached mount at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            connections: 0,
            process: None,
        }
    }
}

impl Connections for Mount {
    fn connections(&self) -> u32 {
        self.connections
    }

    fn set_connections(&mut self, n: u32) {
        self.connections = n;
    }
}

/// Serialized form of the whole store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Schema version the snapshot was written with.
    pub version: u32,
    /// Volumes by name.
    #[serde(default)]
    pub volumes: HashMap<String, Volume>,
    /// Mounts by key.
    #[serde(default)]
    pub mounts: HashMap<String, Mount>,
}

/// Owner of every volume and mount record.
#[derive(Debug, Default)]
pub struct ResourceStore {
    volumes: HashMap<String, Volume>,
    mounts: HashMap<String, Mount>,
}

impl ResourceStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a loaded snapshot.
    ///
    /// Volumes whose mount key does not resolve are dropped.
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let Snapshot {
            volumes, mounts, ..
        } = snapshot;

        let volumes = volumes
            .into_iter()
            .filter(|(name, volume)| {
                let bound = mounts.contains_key(&volume.mount);
                if !bound {
                    tracing::warn!(
                        volume = %name,
                        mount = %volume.mount,
                        "Dropping volume bound to an unknown mount"
                    );
                }
                bound
            })
            .collect();

        Self { volumes, mounts }
    }

    /// Copy the current state into a snapshot.
    #[must_use]
    pub fn snapshot(&self, version: u32) -> Snapshot {
        Snapshot {
            version,
            volumes: self.volumes.clone(),
            mounts: self.mounts.clone(),
        }
    }

    /// Insert or replace a volume.
    pub fn put_volume(&mut self, name: impl Into<String>, volume: Volume) {
        self.volumes.insert(name.into(), volume);
    }

    /// Look up a volume.
    #[must_use]
    pub fn volume(&self, name: &str) -> Option<&Volume> {
        self.volumes.get(name)
    }

    /// Delete a volume, returning it if it existed.
    pub fn remove_volume(&mut self, name: &str) -> Option<Volume> {
        self.volumes.remove(name)
    }

    /// Insert or replace a mount.
    pub fn put_mount(&mut self, key: impl Into<String>, mount: Mount) {
        self.mounts.insert(key.into(), mount);
    }

    /// Look up a mount.
    #[must_use]
    pub fn mount(&self, key: &str) -> Option<&Mount> {
        self.mounts.get(key)
    }

    /// Mutable access to a mount, for runtime-only fields.
    pub fn mount_mut(&mut self, key: &str) -> Option<&mut Mount> {
        self.mounts.get_mut(key)
    }

    /// Delete a mount, returning it if it existed.
    pub fn remove_mount(&mut self, key: &str) -> Option<Mount> {
        self.mounts.remove(key)
    }

    /// Iterate over all volumes.
    pub fn volumes(&self) -> impl Iterator<Item = (&String, &Volume)> {
        self.volumes.iter()
    }

    /// Number of volumes bound to `key`.
    #[must_use]
    pub fn volumes_on(&self, key: &str) -> usize {
        self.volumes.values().filter(|v| v.mount == key).count()
    }

    /// Resolve a volume and the mount it is bound to.
    ///
    /// # Errors
    ///
    /// `VolumeNotFound` or `MountNotFound`.
    pub fn volume_and_mount(&self, name: &str) -> GluvolResult<(&Volume, &Mount)> {
        let volume = self
            .volumes
            .get(name)
            .ok_or_else(|| GluvolError::VolumeNotFound {
                name: name.to_string(),
            })?;
        let mount = self
            .mounts
            .get(&volume.mount)
            .ok_or_else(|| GluvolError::MountNotFound {
                key: volume.mount.clone(),
            })?;
        Ok((volume, mount))
    }

    /// Apply `delta` to a volume and its mount together.
    ///
    /// Both records are resolved before either is touched.
    ///
    /// # Errors
    ///
    /// `VolumeNotFound` or `MountNotFound`; nothing is modified in that case.
    pub fn adjust_connections(&mut self, name: &str, delta: ConnectionDelta) -> GluvolResult<()> {
        let volume = self
            .volumes
            .get_mut(name)
            .ok_or_else(|| GluvolError::VolumeNotFound {
                name: name.to_string(),
            })?;
        let mount = self
            .mounts
            .get_mut(&volume.mount)
            .ok_or_else(|| GluvolError::MountNotFound {
                key: volume.mount.clone(),
            })?;

        adjust(
            delta,
            &mut [&mut *volume as &mut dyn Connections, &mut *mount],
        );

        tracing::debug!(
            volume = %name,
            volume_connections = volume.connections,
            mount_connections = mount.connections,
            "Adjusted connections"
        );
        Ok(())
    }

    /// Zero a mount and every volume bound to it.
    ///
    /// # Errors
    ///
    /// `MountNotFound`.
    pub fn reset_mount(&mut self, key: &str) -> GluvolResult<()> {
        let mount = self
            .mounts
            .get_mut(key)
            .ok_or_else(|| GluvolError::MountNotFound {
                key: key.to_string(),
            })?;

        let mut targets: Vec<&mut dyn Connections> = vec![mount as &mut dyn Connections];
        targets.extend(
            self.volumes
                .values_mut()
                .filter(|v| v.mount == key)
                .map(|v| v as &mut dyn Connections),
        );
        adjust(ConnectionDelta::Set(0), &mut targets);

        tracing::debug!(mount = %key, "Reset mount connections");
        Ok(())
    }
}
