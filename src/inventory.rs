use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Mesh-scoped identifier shared by devices and groups. The hub stores
/// these as 16-bit values.
pub type MeshId = u16;

/// Product class sent when the cloud record carries none.
pub const DEFAULT_PRODUCT_TYPE: u32 = 134;

pub const DEFAULT_DEVICE_NAME: &str = "Device";
pub const DEFAULT_GROUP_NAME: &str = "Group";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub device_id: MeshId,
    pub name: String,
    pub product_type: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub group_id: MeshId,
    pub name: String,
    pub members: Vec<MeshId>,
}

/// Reads a JSON value as a usable mesh id: a non-zero integer that fits
/// in 16 bits. Anything else is `None`.
pub fn mesh_id(value: &Value) -> Option<MeshId> {
    value
        .as_u64()
        .and_then(|raw| MeshId::try_from(raw).ok())
        .filter(|id| *id != 0)
}

/// Canonical, source-agnostic inventory. Both the cloud and snapshot
/// paths produce one of these.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Inventory {
    pub devices: Vec<Device>,
    pub groups: Vec<Group>,
    pub passphrase: Option<String>,
}

impl Inventory {
    /// Adds a device unless its id is zero or already taken. Returns
    /// whether it was added.
    pub fn push_device(&mut self, device: Device) -> bool {
        if device.device_id == 0 {
            return false;
        }
        if self.has_device(device.device_id) {
            warn!(device_id = device.device_id, name = %device.name, "duplicate device id, keeping first");
            return false;
        }
        self.devices.push(device);
        true
    }

    pub fn push_group(&mut self, group: Group) -> bool {
        if group.group_id == 0 {
            return false;
        }
        if self.groups.iter().any(|g| g.group_id == group.group_id) {
            warn!(group_id = group.group_id, name = %group.name, "duplicate group id, keeping first");
            return false;
        }
        self.groups.push(group);
        true
    }

    pub fn has_device(&self, device_id: MeshId) -> bool {
        self.devices.iter().any(|d| d.device_id == device_id)
    }
}

/// Appends `id` unless already present, keeping first-encounter order.
pub(crate) fn push_unique(ids: &mut Vec<MeshId>, id: MeshId) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}
