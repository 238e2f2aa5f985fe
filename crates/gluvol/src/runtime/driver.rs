//! Volume lifecycle operations.
//!
//! Every operation runs under a single readers-writer lock around the
//! [`ResourceStore`]. Mutating operations hold the write lock for their whole
//! duration, external commands and the snapshot write included, so counter
//! updates can never interleave.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use gluvol_common::{GluvolError, GluvolResult};
use tokio::sync::RwLock;

use super::config::DriverConfig;
use super::state::SnapshotCodec;
use super::store::{ConnectionDelta, Mount, ResourceStore, Volume};
use crate::backend::{GlusterBackend, MountBackend};
use crate::exec::{CommandRunner, SystemRunner};
use crate::filesystem::{MountTable, ProcMounts, prepare_mountpoint, remove_mountpoint};
use crate::types::{Capabilities, Scope, VolumeInfo};

/// The volume driver.
pub struct VolumeDriver {
    config: DriverConfig,
    store: RwLock<ResourceStore>,
    codec: SnapshotCodec,
    backend: Arc<dyn MountBackend>,
    runner: Arc<dyn CommandRunner>,
    mount_table: Arc<dyn MountTable>,
}

impl std::fmt::Debug for VolumeDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolumeDriver")
            .field("config", &self.config)
            .field("backend", &self.backend.name())
            .finish_non_exhaustive()
    }
}

impl VolumeDriver {
    /// Create a driver with the GlusterFS backend and host collaborators.
    #[must_use]
    pub fn new(config: DriverConfig) -> Self {
        Self::with_collaborators(
            config,
            Arc::new(GlusterBackend::new()),
            Arc::new(SystemRunner::new()),
            Arc::new(ProcMounts::new()),
        )
    }

    /// Create a driver with explicit collaborators.
    ///
    /// The persisted snapshot is loaded immediately; an absent or
    /// incompatible snapshot starts the driver empty.
    pub fn with_collaborators(
        config: DriverConfig,
        backend: Arc<dyn MountBackend>,
        runner: Arc<dyn CommandRunner>,
        mount_table: Arc<dyn MountTable>,
    ) -> Self {
        tracing::debug!(
            root = %config.paths.root.display(),
            state = %config.paths.state.display(),
            naming = ?config.naming,
            backend = backend.name(),
            "Initializing volume driver"
        );

        let codec = SnapshotCodec::new(&config.paths.state, config.schema_version);
        let store = ResourceStore::from_snapshot(codec.load());

        Self {
            config,
            store: RwLock::new(store),
            codec,
            backend,
            runner,
            mount_table,
        }
    }

    /// Driver configuration.
    #[must_use]
    pub const fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Create a volume.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for missing or malformed options or a name that
    /// does not make a single path component, `Conflict` when
    /// the mount point is not empty or the name exists with other options,
    /// `Io` for filesystem errors, `Persistence` if the snapshot write fails.
    pub async fn create(
        &self,
        name: &str,
        options: Option<HashMap<String, String>>,
    ) -> GluvolResult<()> {
        tracing::debug!(volume = name, ?options, "Entering create");

        let mut options: BTreeMap<String, String> = options
            .ok_or_else(|| GluvolError::invalid_argument("options required"))?
            .into_iter()
            .collect();
        self.backend.validate(&mut options)?;
        let target = self.backend.target(&options)?;
        let key = self.config.naming.mount_key(name, &target)?;

        let mut store = self.store.write().await;

        if let Some(existing) = store.volume(name) {
            if existing.options == options {
                tracing::debug!(volume = name, "Volume already exists with the same options");
                return Ok(());
            }
            return Err(GluvolError::Conflict {
                message: format!("volume {name} already exists with different options"),
            });
        }

        if store.mount(&key).is_none() {
            let path = self.config.paths.mountpoint(&key);
            prepare_mountpoint(&path)?;
            store.put_mount(key.clone(), Mount::new(path));
        }

        store.put_volume(name, Volume::new(options, key.clone()));
        tracing::info!(volume = name, mount = %key, "Volume created");

        self.persist(&store)
    }

    /// Describe one volume.
    ///
    /// # Errors
    ///
    /// `VolumeNotFound` or `MountNotFound`.
    pub async fn get(&self, name: &str) -> GluvolResult<VolumeInfo> {
        tracing::debug!(volume = name, "Entering get");
        let store = self.store.read().await;
        let (volume, mount) = store.volume_and_mount(name)?;
        Ok(VolumeInfo::new(name, volume, mount))
    }

    /// Describe every volume, sorted by name.
    ///
    /// # Errors
    ///
    /// `MountNotFound` if any volume is bound to a missing mount.
    pub async fn list(&self) -> GluvolResult<Vec<VolumeInfo>> {
        tracing::debug!("Entering list");
        let store = self.store.read().await;
        let mut volumes = store
            .volumes()
            .map(|(name, _)| {
                let (volume, mount) = store.volume_and_mount(name)?;
                Ok(VolumeInfo::new(name, volume, mount))
            })
            .collect::<GluvolResult<Vec<_>>>()?;
        volumes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(volumes)
    }

    /// Mount point of a volume.
    ///
    /// # Errors
    ///
    /// `VolumeNotFound` or `MountNotFound`.
    pub async fn path(&self, name: &str) -> GluvolResult<PathBuf> {
        tracing::debug!(volume = name, "Entering path");
        let store = self.store.read().await;
        let (_, mount) = store.volume_and_mount(name)?;
        Ok(mount.path.clone())
    }

    /// Attach a volume, mounting its target if nothing else holds it.
    ///
    /// # Errors
    ///
    /// `VolumeNotFound`/`MountNotFound`, `Io` when the mount table cannot be
    /// read or the mount command fails (counters are left untouched), and
    /// `Persistence` if the snapshot write fails.
    pub async fn mount(&self, name: &str) -> GluvolResult<PathBuf> {
        tracing::debug!(volume = name, "Entering mount");
        let mut store = self.store.write().await;

        let (volume, mount) = store.volume_and_mount(name)?;
        let key = volume.mount.clone();
        let options = volume.options.clone();
        let path = mount.path.clone();
        let in_use = mount.connections > 0;

        let mounted = self
            .mount_table
            .is_mounted(&path, self.backend.fs_type())?;

        if in_use && mounted {
            store.adjust_connections(name, ConnectionDelta::Add(1))?;
            tracing::debug!(volume = name, mount = %key, "Reusing active mount");
            self.persist(&store)?;
            return Ok(path);
        }

        // Counters are only rewritten once the OS mount is known to exist.
        let pid = if mounted {
            tracing::warn!(
                volume = name,
                mount = %key,
                path = %path.display(),
                "Found a live mount left from a previous run, adopting it"
            );
            None
        } else {
            if in_use {
                tracing::warn!(
                    volume = name,
                    mount = %key,
                    path = %path.display(),
                    "Mount has connections but is not mounted, remounting"
                );
            }
            let command = self.backend.mount_command(&options, &path)?;
            let outcome = self.runner.mount(&command, self.config.mount_wait).await?;
            tracing::info!(volume = name, mount = %key, path = %path.display(), "Mounted");
            outcome.pid
        };

        store.reset_mount(&key)?;
        store
            .mount_mut(&key)
            .ok_or_else(|| GluvolError::Internal {
                message: format!("mount {key} vanished while locked"),
            })?
            .process = pid;
        store.adjust_connections(name, ConnectionDelta::Add(1))?;
        self.persist(&store)?;
        Ok(path)
    }

    /// Detach a volume, unmounting its target on the last detach.
    ///
    /// # Errors
    ///
    /// `VolumeNotFound`/`MountNotFound`, `Io` when the unmount command fails
    /// (counters are left untouched), and `Persistence` if the snapshot write
    /// fails.
    pub async fn unmount(&self, name: &str) -> GluvolResult<()> {
        tracing::debug!(volume = name, "Entering unmount");
        let mut store = self.store.write().await;

        let (volume, mount) = store.volume_and_mount(name)?;
        if volume.connections == 0 {
            tracing::warn!(volume = name, "Volume is not attached, nothing to unmount");
            return Ok(());
        }
        let key = volume.mount.clone();
        let path = mount.path.clone();

        if mount.connections <= 1 {
            if self
                .mount_table
                .is_mounted(&path, self.backend.fs_type())?
            {
                self.runner.unmount(&path).await?;
                tracing::info!(volume = name, mount = %key, path = %path.display(), "Unmounted");
            } else {
                tracing::warn!(
                    volume = name,
                    path = %path.display(),
                    "Mount already gone, resetting connections"
                );
            }
            store.reset_mount(&key)?;
            if let Some(mount) = store.mount_mut(&key) {
                mount.process = None;
            }
        } else {
            store.adjust_connections(name, ConnectionDelta::Add(-1))?;
            tracing::debug!(volume = name, mount = %key, "Mount still in use, keeping it");
        }

        self.persist(&store)
    }

    /// Delete a detached volume and, with its last reference, its mount.
    ///
    /// # Errors
    ///
    /// `Busy` while the volume is attached, `VolumeNotFound`/`MountNotFound`,
    /// `Io` for filesystem or unmount failures, `Persistence` if the snapshot
    /// write fails.
    pub async fn remove(&self, name: &str) -> GluvolResult<()> {
        tracing::debug!(volume = name, "Entering remove");
        let mut store = self.store.write().await;

        let (volume, mount) = store.volume_and_mount(name)?;
        if volume.connections != 0 {
            return Err(GluvolError::Busy {
                name: name.to_string(),
                connections: volume.connections,
            });
        }
        let key = volume.mount.clone();
        let path = mount.path.clone();
        let last_reference = mount.connections == 0 && store.volumes_on(&key) == 1;

        if last_reference {
            if self
                .mount_table
                .is_mounted(&path, self.backend.fs_type())?
            {
                tracing::warn!(path = %path.display(), "Unmounting leftover mount before removal");
                self.runner.unmount(&path).await?;
            }
            remove_mountpoint(&path)?;
            store.remove_mount(&key);
            tracing::info!(mount = %key, "Mount removed");
        }

        store.remove_volume(name);
        tracing::info!(volume = name, "Volume removed");

        self.persist(&store)
    }

    /// Static capabilities of this driver.
    ///
    /// The scope is `local`: every counter and mount table this driver
    /// consults belongs to the current host, so volumes are never reported
    /// as visible cluster-wide.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        tracing::debug!("Entering capabilities");
        Capabilities {
            scope: Scope::Local,
        }
    }

    fn persist(&self, store: &ResourceStore) -> GluvolResult<()> {
        self.codec
            .save(&store.snapshot(self.codec.version()))
            .inspect_err(|e| tracing::warn!(error = %e, "State changed but snapshot is stale"))
    }
}
