//! Shared fakes for the driver integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gluvol::backend::GlusterBackend;
use gluvol::exec::{CommandRunner, MountCommand, MountOutcome};
use gluvol::filesystem::MountTable;
use gluvol::runtime::{DriverConfig, VolumeDriver};
use gluvol_common::{GluvolError, GluvolResult};
use parking_lot::Mutex;
use tempfile::TempDir;

/// The host mount table as the fakes see it.
#[derive(Debug, Default)]
pub struct FakeHost {
    mounted: Mutex<HashSet<PathBuf>>,
    mount_calls: Mutex<Vec<MountCommand>>,
    unmount_calls: Mutex<Vec<PathBuf>>,
    fail_mount: Mutex<bool>,
    fail_unmount: Mutex<bool>,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Pretend something mounted `path` behind the driver's back.
    pub fn mark_mounted(&self, path: impl Into<PathBuf>) {
        self.mounted.lock().insert(path.into());
    }

    pub fn mark_unmounted(&self, path: &Path) {
        self.mounted.lock().remove(path);
    }

    pub fn is_mounted(&self, path: &Path) -> bool {
        self.mounted.lock().contains(path)
    }

    pub fn mount_calls(&self) -> Vec<MountCommand> {
        self.mount_calls.lock().clone()
    }

    pub fn unmount_calls(&self) -> Vec<PathBuf> {
        self.unmount_calls.lock().clone()
    }

    pub fn fail_mount(&self, fail: bool) {
        *self.fail_mount.lock() = fail;
    }

    pub fn fail_unmount(&self, fail: bool) {
        *self.fail_unmount.lock() = fail;
    }
}

/// Command runner that flips entries in a [`FakeHost`].
#[derive(Debug, Clone)]
pub struct FakeRunner(pub Arc<FakeHost>);

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn mount(&self, command: &MountCommand, _window: Duration) -> GluvolResult<MountOutcome> {
        self.0.mount_calls.lock().push(command.clone());
        if *self.0.fail_mount.lock() {
            return Err(GluvolError::Command {
                command: command.to_string(),
                message: "exit status: 1".to_string(),
            });
        }

        let mountpoint = command.args.last().cloned().unwrap_or_default();
        self.0.mark_mounted(mountpoint);
        Ok(MountOutcome { pid: Some(4242) })
    }

    async fn unmount(&self, path: &Path) -> GluvolResult<()> {
        self.0.unmount_calls.lock().push(path.to_path_buf());
        if *self.0.fail_unmount.lock() {
            return Err(GluvolError::Command {
                command: format!("umount {}", path.display()),
                message: "target is busy".to_string(),
            });
        }

        self.0.mark_unmounted(path);
        Ok(())
    }
}

/// Mount table backed by a [`FakeHost`].
#[derive(Debug, Clone)]
pub struct FakeMountTable(pub Arc<FakeHost>);

impl MountTable for FakeMountTable {
    fn is_mounted(&self, path: &Path, _fs_type: &str) -> GluvolResult<bool> {
        Ok(self.0.is_mounted(path))
    }
}

/// A driver wired to fakes, rooted in a temporary directory.
pub struct Harness {
    pub dir: TempDir,
    pub host: Arc<FakeHost>,
    pub config: DriverConfig,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(|config| config)
    }

    pub fn shared() -> Self {
        Self::with_config(|config| config.with_shared_mounts(true))
    }

    pub fn with_config(f: impl FnOnce(DriverConfig) -> DriverConfig) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let config = f(DriverConfig::default().with_root(dir.path()));
        Self {
            dir,
            host: FakeHost::new(),
            config,
        }
    }

    /// Build a driver; each call loads the persisted snapshot afresh.
    pub fn driver(&self) -> VolumeDriver {
        VolumeDriver::with_collaborators(
            self.config.clone(),
            Arc::new(GlusterBackend::new()),
            Arc::new(FakeRunner(Arc::clone(&self.host))),
            Arc::new(FakeMountTable(Arc::clone(&self.host))),
        )
    }
}

pub fn voluri(value: &str) -> Option<HashMap<String, String>> {
    Some(HashMap::from([("voluri".to_string(), value.to_string())]))
}
