//! External mount and unmount commands.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use gluvol_common::{GluvolError, GluvolResult};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountCommand {
    /// Program to run.
    pub program: PathBuf,
    /// Arguments, mount point included.
    pub args: Vec<String>,
}

impl MountCommand {
    /// Create a command.
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl std::fmt::Display for MountCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Result of a successful mount command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MountOutcome {
    /// Pid of the process when it is still running in the background.
    pub pid: Option<u32>,
}

/// Runs the commands that establish and tear down OS mounts.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Start a mount command and watch it for `window`.
    ///
    /// A process that exits unsuccessfully inside the window is a failure. A
    /// process still running when the window elapses is presumed to have
    /// mounted and is left running.
    async fn mount(&self, command: &MountCommand, window: Duration) -> GluvolResult<MountOutcome>;

    /// Unmount `path`.
    async fn unmount(&self, path: &Path) -> GluvolResult<()>;
}

/// Runs commands on the host.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    umount: PathBuf,
}

impl SystemRunner {
    /// Create a runner using `umount` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific unmount program.
    #[must_use]
    pub fn with_umount(mut self, umount: impl Into<PathBuf>) -> Self {
        self.umount = umount.into();
        self
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self {
            umount: PathBuf::from("umount"),
        }
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn mount(&self, command: &MountCommand, window: Duration) -> GluvolResult<MountOutcome> {
        tracing::debug!(%command, ?window, "Starting mount command");

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| GluvolError::Command {
                command: command.to_string(),
                message: e.to_string(),
            })?;

        let pid = child.id();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_output(stdout, pid, false));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_output(stderr, pid, true));
        }

        let waited = tokio::time::timeout(window, child.wait()).await;
        match waited {
            Ok(Ok(status)) => {
                check_status(&command.to_string(), status)?;
                tracing::debug!(%command, "Mount command exited successfully");
                Ok(MountOutcome::default())
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => {
                tracing::info!(%command, ?pid, "Mount process still running, leaving it in the background");
                let line = command.to_string();
                tokio::spawn(async move {
                    match child.wait().await {
                        Ok(status) => tracing::info!(command = %line, ?pid, %status, "Mount process exited"),
                        Err(e) => tracing::warn!(command = %line, ?pid, error = %e, "Lost track of mount process"),
                    }
                });
                Ok(MountOutcome { pid })
            }
        }
    }

    async fn unmount(&self, path: &Path) -> GluvolResult<()> {
        let line = format!("{} {}", self.umount.display(), path.display());
        tracing::debug!(command = %line, "Running unmount command");

        let output = Command::new(&self.umount)
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| GluvolError::Command {
                command: line.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(command = %line, status = %output.status, %stderr, "Unmount failed");
            return Err(GluvolError::Command {
                command: line,
                message: format!("{}: {}", output.status, stderr.trim()),
            });
        }
        Ok(())
    }
}

fn check_status(command: &str, status: ExitStatus) -> GluvolResult<()> {
    if status.success() {
        Ok(())
    } else {
        Err(GluvolError::Command {
            command: command.to_string(),
            message: status.to_string(),
        })
    }
}

/// Copy a child's output into the log, one event per line.
async fn forward_output<R>(reader: R, pid: Option<u32>, stderr: bool)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if stderr {
            tracing::warn!(target: "gluvol::mount_output", ?pid, "{line}");
        } else {
            tracing::debug!(target: "gluvol::mount_output", ?pid, "{line}");
        }
    }
}
