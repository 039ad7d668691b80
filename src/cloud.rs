//! Avi-on cloud client.
//!
//! One login, then a fixed walk over the account: first location, its
//! passphrase, its devices, its groups, and one detail call per group for
//! the membership list. Calls are sequential and never retried.

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::http::{HttpClient, HttpRequest};
use crate::inventory::{
    DEFAULT_DEVICE_NAME, DEFAULT_GROUP_NAME, DEFAULT_PRODUCT_TYPE, Device, Group, Inventory,
    mesh_id,
};
use crate::resolver::DeviceRefMap;
use crate::settings::CloudSettings;

#[derive(Clone)]
pub struct CloudCredentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for CloudCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudCredentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub pid: String,
    pub name: String,
    pub passphrase: Option<String>,
}

pub struct CloudClient<C> {
    http: C,
    settings: CloudSettings,
}

impl<C: HttpClient> CloudClient<C> {
    pub fn new(http: C, settings: CloudSettings) -> Self {
        Self { http, settings }
    }

    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.settings.api_base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn login(self, credentials: &CloudCredentials) -> SyncResult<CloudSession<C>> {
        info!(email = %credentials.email, "logging in");
        let url = self.url("sessions");
        let body = json!({
            "email": credentials.email,
            "password": credentials.password,
        });
        let resp = match self.request(&url, Some(&body), None) {
            Err(SyncError::HttpFailure { status, body, .. }) if status == 401 || status == 403 => {
                return Err(SyncError::AuthFailure(format!("HTTP {status}: {body}")));
            }
            other => other?,
        };
        let token = resp
            .get("credentials")
            .and_then(|creds| creds.get("auth_token"))
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| SyncError::AuthFailure("response carried no credentials".to_string()))?
            .to_string();
        info!("authenticated");
        Ok(CloudSession {
            client: self,
            token,
        })
    }

    fn request(&self, url: &str, body: Option<&Value>, token: Option<&str>) -> SyncResult<Value> {
        let mut request = match body {
            Some(body) => {
                let bytes = serde_json::to_vec(body)
                    .map_err(|err| SyncError::parse("request body", err))?;
                HttpRequest::post(url, bytes)
            }
            None => HttpRequest::get(url),
        }
        .header("Content-Type", "application/json");
        if let Some(token) = token {
            request = request
                .header("Accept", self.settings.accept.as_str())
                .header("Authorization", format!("Token {token}"));
        }

        debug!(method = request.method(), url, "cloud request");
        let resp = self
            .http
            .send(request)
            .map_err(|reason| SyncError::NetworkFailure {
                url: url.to_string(),
                reason,
            })?;
        if !resp.is_success() {
            return Err(SyncError::HttpFailure {
                url: url.to_string(),
                status: resp.status,
                body: resp.body,
            });
        }
        serde_json::from_str(&resp.body)
            .map_err(|err| SyncError::parse(format!("response from {url}"), err))
    }
}

/// An authenticated cloud client.
pub struct CloudSession<C> {
    client: CloudClient<C>,
    token: String,
}

impl<C: HttpClient> CloudSession<C> {
    fn get(&self, path: &str) -> SyncResult<Value> {
        let url = self.client.url(path);
        self.client.request(&url, None, Some(&self.token))
    }

    /// Picks the first location of the account. Accounts with several
    /// locations only ever sync the first one.
    pub fn fetch_location(&self) -> SyncResult<Location> {
        let resp = self.get("user/locations")?;
        let first = resp
            .get("locations")
            .and_then(Value::as_array)
            .and_then(|locations| locations.first())
            .ok_or(SyncError::EmptyInventory)?;
        let pid = record_key(first).ok_or_else(|| {
            SyncError::parse("user/locations", "first location has no pid")
        })?;
        let name = first
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(pid.as_str())
            .to_string();
        info!(location = %name, pid = %pid, "using location");

        let detail = self.get(&format!("locations/{pid}"))?;
        let passphrase = detail
            .get("location")
            .and_then(|location| location.get("passphrase"))
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        if passphrase.is_some() {
            info!("passphrase found");
        } else {
            warn!("passphrase NOT FOUND, the hub keeps its stored one");
        }

        Ok(Location {
            pid,
            name,
            passphrase,
        })
    }

    /// Fetches physical, provisioned devices and the cloud-key map that
    /// group resolution needs.
    pub fn fetch_devices(&self, location: &Location) -> SyncResult<(Vec<Device>, DeviceRefMap)> {
        info!("fetching devices");
        let resp = self.get(&format!("locations/{}/abstract_devices", location.pid))?;
        let mut devices: Vec<Device> = Vec::new();
        let mut refs = DeviceRefMap::new();

        for raw in records(&resp, "abstract_devices") {
            if raw.get("type").and_then(Value::as_str) != Some("device") {
                continue;
            }
            let Some(device_id) = raw.get("avid").and_then(mesh_id) else {
                debug!(record = %raw, "skipping unprovisioned device");
                continue;
            };
            if let Some(key) = record_key(raw) {
                refs.insert(key, device_id);
            }
            if devices.iter().any(|d| d.device_id == device_id) {
                continue;
            }
            devices.push(Device {
                device_id,
                name: raw
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_DEVICE_NAME)
                    .to_string(),
                product_type: raw
                    .get("product_id")
                    .and_then(Value::as_u64)
                    .and_then(|value| u32::try_from(value).ok())
                    .unwrap_or(DEFAULT_PRODUCT_TYPE),
            });
        }
        info!(count = devices.len(), "devices fetched");
        Ok((devices, refs))
    }

    pub fn fetch_groups(&self, location: &Location, refs: &DeviceRefMap) -> SyncResult<Vec<Group>> {
        info!("fetching groups");
        let resp = self.get(&format!("locations/{}/groups", location.pid))?;
        let mut groups = Vec::new();

        for raw in records(&resp, "groups") {
            let Some(group_id) = raw.get("avid").and_then(mesh_id) else {
                continue;
            };
            let Some(pid) = record_key(raw) else {
                warn!(group_id, "group has no pid, cannot fetch its members");
                continue;
            };
            let name = raw
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_GROUP_NAME)
                .to_string();

            let detail = self.get(&format!("groups/{pid}"))?;
            let raw_members = detail
                .get("group")
                .and_then(|group| group.get("devices"))
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let members = refs.resolve_members(raw_members);
            info!(group = %name, group_id, members = members.len(), "group resolved");

            groups.push(Group {
                group_id,
                name,
                members,
            });
        }
        info!(count = groups.len(), "groups fetched");
        Ok(groups)
    }
}

/// Runs the whole cloud path and returns the canonical inventory.
pub fn fetch_inventory<C: HttpClient>(
    http: C,
    settings: &CloudSettings,
    credentials: &CloudCredentials,
) -> SyncResult<Inventory> {
    let session = CloudClient::new(http, settings.clone()).login(credentials)?;
    let location = session.fetch_location()?;
    let (devices, refs) = session.fetch_devices(&location)?;
    let groups = session.fetch_groups(&location, &refs)?;

    let mut inventory = Inventory {
        passphrase: location.passphrase,
        ..Inventory::default()
    };
    for device in devices {
        inventory.push_device(device);
    }
    for group in groups {
        inventory.push_group(group);
    }
    Ok(inventory)
}

fn records<'a>(resp: &'a Value, field: &str) -> impl Iterator<Item = &'a Value> {
    resp.get(field)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

/// Cloud record key (`pid`); usually a string, occasionally numeric.
fn record_key(record: &Value) -> Option<String> {
    match record.get("pid")? {
        Value::String(pid) if !pid.is_empty() => Some(pid.clone()),
        Value::Number(pid) => Some(pid.to_string()),
        _ => None,
    }
}
