//! Resolution of cloud group-membership references to mesh ids.
//!
//! The cloud does not list group members uniformly: depending on the
//! record a member can be the device's cloud key, its raw mesh id, or a
//! nested object carrying one of several id fields. Everything is turned
//! into a [`CloudReference`] first and resolved against the
//! [`DeviceRefMap`] built while fetching devices.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::inventory::{MeshId, mesh_id, push_unique};

/// Fields probed on a structured reference, highest priority first.
pub const RECORD_ID_FIELDS: [&str; 4] = ["avid", "avion_id", "device_id", "id"];

#[derive(Clone, Debug, PartialEq)]
pub enum CloudReference {
    /// Opaque cloud record key of a device.
    Key(String),
    /// Raw numeric id.
    Id(u64),
    /// Object with candidate id fields.
    Record(Map<String, Value>),
    Other,
}

impl From<&Value> for CloudReference {
    fn from(value: &Value) -> Self {
        match value {
            Value::String(key) => CloudReference::Key(key.clone()),
            Value::Number(number) => number
                .as_u64()
                .map(CloudReference::Id)
                .unwrap_or(CloudReference::Other),
            Value::Object(record) => CloudReference::Record(record.clone()),
            _ => CloudReference::Other,
        }
    }
}

/// Cloud device key → mesh id, built by one device fetch and consumed by
/// that run's group resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceRefMap {
    ids: HashMap<String, MeshId>,
}

impl DeviceRefMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, device_id: MeshId) {
        self.ids.insert(key.into(), device_id);
    }

    pub fn get(&self, key: &str) -> Option<MeshId> {
        self.ids.get(key).copied()
    }

    pub fn resolve(&self, reference: &CloudReference) -> Option<MeshId> {
        match reference {
            CloudReference::Key(key) => self.get(key),
            CloudReference::Id(raw) => MeshId::try_from(*raw).ok().filter(|id| *id != 0),
            CloudReference::Record(record) => RECORD_ID_FIELDS
                .iter()
                .find_map(|field| record.get(*field).and_then(mesh_id)),
            CloudReference::Other => None,
        }
    }

    /// Resolves a raw member list. Unresolvable entries are dropped and
    /// repeats collapse onto their first occurrence.
    pub fn resolve_members(&self, raw: &[Value]) -> Vec<MeshId> {
        let mut members = Vec::with_capacity(raw.len());
        for value in raw {
            match self.resolve(&CloudReference::from(value)) {
                Some(id) => push_unique(&mut members, id),
                None => debug!(reference = %value, "dropping unresolvable group member"),
            }
        }
        members
    }
}

impl FromIterator<(String, MeshId)> for DeviceRefMap {
    fn from_iter<I: IntoIterator<Item = (String, MeshId)>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}
