use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{SyncError, SyncResult};
use crate::inventory::{Device, Group, Inventory};

/// Largest request body the hub accepts on its import endpoint.
pub const DEVICE_IMPORT_LIMIT: usize = 16 * 1024;

/// Shortest passphrase the hub will initialise its mesh crypto with.
pub const MIN_PASSPHRASE_LEN: usize = 8;

/// What the hub does with its existing inventory before applying ours.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResetPolicy {
    /// Discard everything first (`"reset": true`).
    #[default]
    Replace,
    /// Leave the directive out; the hub adds what it does not know yet.
    Keep,
}

/// The document posted to the hub's import endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportPayload {
    pub devices: Vec<Device>,
    pub groups: Vec<Group>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset: Option<bool>,
}

impl ImportPayload {
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Whether the encoded payload is larger than the hub will read.
    pub fn exceeds_device_limit(&self) -> SyncResult<bool> {
        Ok(self.to_json()?.len() > DEVICE_IMPORT_LIMIT)
    }

    pub fn to_json(&self) -> SyncResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|err| SyncError::parse("import payload", err))
    }

    pub fn to_pretty_json(&self) -> SyncResult<String> {
        serde_json::to_string_pretty(self).map_err(|err| SyncError::parse("import payload", err))
    }
}

pub fn synthesize(inventory: Inventory, reset: ResetPolicy) -> ImportPayload {
    let passphrase = inventory.passphrase.filter(|value| !value.is_empty());
    if let Some(value) = &passphrase
        && value.len() < MIN_PASSPHRASE_LEN
    {
        warn!(
            len = value.len(),
            min = MIN_PASSPHRASE_LEN,
            "passphrase is shorter than the hub accepts"
        );
    }

    let payload = ImportPayload {
        devices: inventory.devices,
        groups: inventory.groups,
        passphrase,
        reset: match reset {
            ResetPolicy::Replace => Some(true),
            ResetPolicy::Keep => None,
        },
    };
    if let Ok(true) = payload.exceeds_device_limit() {
        warn!(
            limit = DEVICE_IMPORT_LIMIT,
            devices = payload.device_count(),
            groups = payload.group_count(),
            "payload exceeds the hub's import body limit, expect a rejection"
        );
    }
    payload
}
