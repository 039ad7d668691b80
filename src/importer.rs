use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use tracing::info;

use crate::error::{SyncError, SyncResult};
use crate::http::{HttpClient, HttpRequest};
use crate::payload::ImportPayload;

#[derive(Clone)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    pub fn header_value(&self) -> String {
        let encoded = STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {encoded}")
    }
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Where the payload goes: a hub address plus the import endpoint path.
#[derive(Clone, Debug)]
pub struct DeviceTarget {
    pub address: String,
    pub import_path: String,
    pub auth: Option<BasicAuth>,
}

impl DeviceTarget {
    /// `address` may be a host, `host:port`, or a full `http(s)://` URL.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            import_path: "/api/import".to_string(),
            auth: None,
        }
    }

    pub fn with_import_path(mut self, path: impl Into<String>) -> Self {
        self.import_path = path.into();
        self
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(BasicAuth {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    pub fn import_url(&self) -> String {
        let base = self.address.trim_end_matches('/');
        let path = self.import_path.trim_start_matches('/');
        if base.starts_with("http://") || base.starts_with("https://") {
            format!("{base}/{path}")
        } else {
            format!("http://{base}/{path}")
        }
    }
}

pub struct DeviceImporter<C> {
    http: C,
    target: DeviceTarget,
}

impl<C: HttpClient> DeviceImporter<C> {
    pub fn new(http: C, target: DeviceTarget) -> Self {
        Self { http, target }
    }

    /// Posts the payload once and returns the hub's JSON reply.
    pub fn send(&self, payload: &ImportPayload) -> SyncResult<Value> {
        let body = payload.to_json()?;
        info!(
            device = %self.target.address,
            bytes = body.len(),
            devices = payload.device_count(),
            groups = payload.group_count(),
            "importing"
        );

        let mut request =
            HttpRequest::post(self.target.import_url(), body).header("Content-Type", "application/json");
        if let Some(auth) = &self.target.auth {
            request = request.header("Authorization", auth.header_value());
        }

        let resp = self
            .http
            .send(request)
            .map_err(|reason| SyncError::DeviceUnreachable {
                device: self.target.address.clone(),
                reason,
            })?;
        if !resp.is_success() {
            return Err(SyncError::ImportRejected {
                status: resp.status,
                body: resp.body,
            });
        }
        let reply: Value =
            serde_json::from_str(&resp.body).map_err(|err| SyncError::parse("hub response", err))?;
        info!(response = %reply, "hub accepted import");
        Ok(reply)
    }
}
