//! Loader for `mesh_db.json` snapshots.
//!
//! Snapshots are device-centric: every device lists the groups it is in
//! and groups carry no member list. Loading inverts those per-device
//! lists back into `group_id -> [device_id]`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};
use crate::inventory::{
    DEFAULT_DEVICE_NAME, DEFAULT_GROUP_NAME, Device, Group, Inventory, MeshId, mesh_id,
    push_unique,
};

#[derive(Debug, Deserialize)]
struct SnapshotDoc {
    #[serde(default)]
    devices: Vec<SnapshotDevice>,
    #[serde(default)]
    groups: Vec<SnapshotGroup>,
    #[serde(default)]
    passphrase: Option<String>,
}

// Ids stay raw JSON so a single unprovisioned or odd record is skipped
// instead of failing the whole document.
#[derive(Debug, Deserialize)]
struct SnapshotDevice {
    #[serde(default)]
    device_id: Value,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    product_id: Option<u32>,
    #[serde(default)]
    groups: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct SnapshotGroup {
    #[serde(default)]
    group_id: Value,
    #[serde(default)]
    name: Option<String>,
}

pub fn load_snapshot(path: &Path) -> SyncResult<Inventory> {
    info!(path = %path.display(), "loading snapshot");
    let contents = std::fs::read_to_string(path).map_err(|err| SyncError::io(path, err))?;
    let inventory = parse_snapshot(&contents).map_err(|err| match err {
        SyncError::ParseFailure { reason, .. } => {
            SyncError::parse(format!("snapshot {}", path.display()), reason)
        }
        other => other,
    })?;
    info!(
        devices = inventory.devices.len(),
        groups = inventory.groups.len(),
        passphrase = inventory.passphrase.is_some(),
        "snapshot loaded"
    );
    Ok(inventory)
}

pub fn parse_snapshot(contents: &str) -> SyncResult<Inventory> {
    let doc: SnapshotDoc =
        serde_json::from_str(contents).map_err(|err| SyncError::parse("snapshot", err))?;

    let mut inventory = Inventory {
        passphrase: doc.passphrase,
        ..Inventory::default()
    };
    let mut members: BTreeMap<MeshId, Vec<MeshId>> = BTreeMap::new();

    for raw in doc.devices {
        let Some(device_id) = mesh_id(&raw.device_id) else {
            debug!(device_id = %raw.device_id, "skipping unprovisioned snapshot device");
            continue;
        };
        let added = inventory.push_device(Device {
            device_id,
            name: raw.name.unwrap_or_else(|| DEFAULT_DEVICE_NAME.to_string()),
            product_type: raw.product_id.unwrap_or(0),
        });
        if !added {
            continue;
        }
        for group_id in raw.groups.iter().filter_map(mesh_id) {
            push_unique(members.entry(group_id).or_default(), device_id);
        }
    }

    for raw in doc.groups {
        let Some(group_id) = mesh_id(&raw.group_id) else {
            debug!(group_id = %raw.group_id, "skipping snapshot group without id");
            continue;
        };
        inventory.push_group(Group {
            group_id,
            name: raw.name.unwrap_or_else(|| DEFAULT_GROUP_NAME.to_string()),
            members: members.remove(&group_id).unwrap_or_default(),
        });
    }

    for (group_id, devices) in &members {
        debug!(group_id, devices = ?devices, "membership names an undeclared group, ignoring");
    }

    Ok(inventory)
}
