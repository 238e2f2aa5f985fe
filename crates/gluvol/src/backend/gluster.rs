//! GlusterFS FUSE client backend.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use gluvol_common::{GluvolError, GluvolResult};
use once_cell::sync::Lazy;
use regex::Regex;

use super::MountBackend;
use crate::exec::MountCommand;

/// Option holding the remote volume, `server[,server...]:volume`.
pub const VOLURI_OPTION: &str = "voluri";

const HOSTNAME: &str = r"(?:(?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9\-]*[a-zA-Z0-9])\.)*(?:[A-Za-z0-9]|[A-Za-z0-9][A-Za-z0-9\-]*[A-Za-z0-9])";

static VOLURI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^{HOSTNAME}(?:,{HOSTNAME})*:.+$")).expect("valid volume URI regex")
});

/// Mounts GlusterFS volumes with the `glusterfs` client.
#[derive(Debug, Clone)]
pub struct GlusterBackend {
    binary: PathBuf,
}

impl GlusterBackend {
    /// Use `glusterfs` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific client binary.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Whether `voluri` is `server[,server...]:volume`.
    #[must_use]
    pub fn is_valid_uri(voluri: &str) -> bool {
        VOLURI_RE.is_match(voluri)
    }

    /// Client arguments selecting the volume and its servers.
    #[must_use]
    pub fn volfile_args(voluri: &str) -> Vec<String> {
        let (servers, volume) = voluri.split_once(':').unwrap_or((voluri, ""));
        std::iter::once(format!("--volfile-id={volume}"))
            .chain(
                servers
                    .split(',')
                    .map(|server| format!("--volfile-server={server}")),
            )
            .collect()
    }

    fn voluri<'a>(&self, options: &'a BTreeMap<String, String>) -> GluvolResult<&'a str> {
        options
            .get(VOLURI_OPTION)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| GluvolError::invalid_argument("voluri option required"))
    }
}

impl Default for GlusterBackend {
    fn default() -> Self {
        Self::with_binary("glusterfs")
    }
}

impl MountBackend for GlusterBackend {
    fn name(&self) -> &str {
        "glusterfs"
    }

    fn validate(&self, options: &mut BTreeMap<String, String>) -> GluvolResult<()> {
        let trimmed = self.voluri(options)?.trim_matches('"').to_string();
        if !Self::is_valid_uri(&trimmed) {
            return Err(GluvolError::invalid_argument(format!(
                "voluri option is malformed: {trimmed}"
            )));
        }
        options.insert(VOLURI_OPTION.to_string(), trimmed);
        Ok(())
    }

    fn target(&self, options: &BTreeMap<String, String>) -> GluvolResult<String> {
        self.voluri(options).map(ToString::to_string)
    }

    fn mount_command(
        &self,
        options: &BTreeMap<String, String>,
        mountpoint: &Path,
    ) -> GluvolResult<MountCommand> {
        let voluri = self.voluri(options)?;
        if !Self::is_valid_uri(voluri) {
            return Err(GluvolError::invalid_argument(format!(
                "voluri option is malformed: {voluri}"
            )));
        }

        let mut args = Self::volfile_args(voluri);
        args.push("--no-daemon".to_string());
        args.push(mountpoint.to_string_lossy().into_owned());
        Ok(MountCommand::new(&self.binary, args))
    }

    fn fs_type(&self) -> &str {
        "fuse"
    }
}
