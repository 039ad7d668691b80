use std::path::{Path, PathBuf};

use directories_next::ProjectDirs;
use serde::{Deserialize, Serialize};

pub const CONFIG_DIR_ENV: &str = "AVION_IMPORT_CONFIG_DIR";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    pub cloud: CloudSettings,
    pub device: DeviceSettings,
    /// Per-request timeout applied to every cloud and hub call.
    pub timeout_secs: u64,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            cloud: CloudSettings::default(),
            device: DeviceSettings::default(),
            timeout_secs: 30,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudSettings {
    pub api_base: String,
    /// Versioned media type sent on authenticated requests.
    pub accept: String,
}

impl Default for CloudSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.avi-on.com/".to_string(),
            accept: "application/api.avi-on.v3".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    pub import_path: String,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            import_path: "/api/import".to_string(),
        }
    }
}

pub fn load_settings() -> anyhow::Result<ImportSettings> {
    let path = settings_path()?;
    load_settings_from(&path)
}

/// Missing file means defaults.
pub fn load_settings_from(path: &Path) -> anyhow::Result<ImportSettings> {
    if !path.exists() {
        return Ok(ImportSettings::default());
    }
    let contents = std::fs::read_to_string(path)?;
    let settings: ImportSettings = serde_yaml_bw::from_str(&contents)
        .map_err(|err| anyhow::anyhow!("invalid settings file {}: {err}", path.display()))?;
    if settings.timeout_secs == 0 {
        return Err(anyhow::anyhow!(
            "invalid settings file {}: timeout_secs must be at least 1",
            path.display()
        ));
    }
    Ok(settings)
}

pub fn settings_path() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var(CONFIG_DIR_ENV) {
        return Ok(Path::new(&value).join("settings.yaml"));
    }
    let dirs = ProjectDirs::from("", "avionmesh", "avion-import")
        .ok_or_else(|| anyhow::anyhow!("unable to determine config directory"))?;
    Ok(dirs.config_dir().join("settings.yaml"))
}
