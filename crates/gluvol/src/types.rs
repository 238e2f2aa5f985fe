//! Descriptors handed back to the protocol layer.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::runtime::{Mount, Volume};

/// A volume as reported by Get and List.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeInfo {
    /// Volume name.
    pub name: String,
    /// Mount point of the volume.
    pub mountpoint: PathBuf,
    /// Creation time, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Driver-specific details.
    pub status: BTreeMap<String, serde_json::Value>,
}

impl VolumeInfo {
    pub(crate) fn new(name: &str, volume: &Volume, mount: &Mount) -> Self {
        let mut status = BTreeMap::new();
        status.insert("mount".to_string(), volume.mount.clone().into());
        status.insert("connections".to_string(), volume.connections.into());
        status.insert("mount_connections".to_string(), mount.connections.into());
        if let Some(voluri) = volume.options.get(crate::backend::VOLURI_OPTION) {
            status.insert("voluri".to_string(), voluri.clone().into());
        }

        Self {
            name: name.to_string(),
            mountpoint: mount.path.clone(),
            created_at: volume.created_at,
            status,
        }
    }
}

/// Reach of the volumes this driver manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Volumes exist on this host only.
    Local,
    /// Volumes are visible cluster-wide.
    Global,
}

/// Static capability descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Capabilities {
    /// Volume scope.
    pub scope: Scope,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_wire_shape() {
        let caps = Capabilities {
            scope: Scope::Local,
        };
        assert_eq!(
            serde_json::to_value(caps).unwrap(),
            serde_json::json!({ "Scope": "local" })
        );
    }

    #[test]
    fn volume_info_status() {
        let options = BTreeMap::from([("voluri".to_string(), "node:gv0".to_string())]);
        let mut volume = Volume::new(options, "v1");
        volume.connections = 1;
        volume.created_at = None;
        let mut mount = Mount::new("/mnt/v1");
        mount.connections = 3;

        let info = VolumeInfo::new("v1", &volume, &mount);
        assert_eq!(info.mountpoint, PathBuf::from("/mnt/v1"));
        assert_eq!(info.status["connections"], 1);
        assert_eq!(info.status["mount_connections"], 3);
        assert_eq!(info.status["voluri"], "node:gv0");

        insta::assert_snapshot!(serde_json::to_string(&info).unwrap(), @r#"{"Name":"v1","Mountpoint":"/mnt/v1","Status":{"connections":1,"mount":"v1","mount_connections":3,"voluri":"node:gv0"}}"#);
    }
}
