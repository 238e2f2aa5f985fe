//! Mount point directories.

use std::path::Path;

use gluvol_common::{GluvolError, GluvolResult};

use crate::runtime::create_private_dir;

/// Make sure `path` exists and is an empty directory.
///
/// A missing directory is created (mode 0700). An existing empty directory is
/// accepted as is.
///
/// # Errors
///
/// `Conflict` if the directory holds anything, I/O errors otherwise.
pub fn prepare_mountpoint(path: &Path) -> GluvolResult<()> {
    match std::fs::symlink_metadata(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            create_private_dir(path)?;
            tracing::debug!(path = %path.display(), "Created mount point");
        }
        Err(e) => return Err(e.into()),
        Ok(_) => {}
    }

    if !is_empty_dir(path)? {
        return Err(GluvolError::Conflict {
            message: format!("{} already exists and is not empty", path.display()),
        });
    }
    Ok(())
}

/// Remove a mount point directory, ignoring one that is already gone.
///
/// # Errors
///
/// I/O errors other than `NotFound`.
pub fn remove_mountpoint(path: &Path) -> GluvolResult<()> {
    match std::fs::remove_dir(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Removed mount point");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn is_empty_dir(path: &Path) -> GluvolResult<bool> {
    Ok(std::fs::read_dir(path)?.next().is_none())
}
