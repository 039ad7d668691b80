//! One sync run: load the inventory from the selected source, build the
//! import payload, then either hand it back (dry run) or post it to the hub.

use std::path::PathBuf;

use serde_json::Value;
use tracing::info;

use crate::cloud::{self, CloudCredentials};
use crate::error::{SyncError, SyncResult};
use crate::http::HttpClient;
use crate::importer::{DeviceImporter, DeviceTarget};
use crate::inventory::Inventory;
use crate::payload::{ImportPayload, ResetPolicy, synthesize};
use crate::settings::ImportSettings;
use crate::snapshot;

#[derive(Clone, Debug)]
pub enum Source {
    Snapshot(PathBuf),
    Cloud(CloudCredentials),
}

#[derive(Clone, Debug)]
pub struct SyncOptions {
    pub source: Source,
    pub target: DeviceTarget,
    pub dry_run: bool,
    pub reset: ResetPolicy,
    pub save_to: Option<PathBuf>,
}

#[derive(Debug)]
pub enum SyncOutcome {
    DryRun(ImportPayload),
    Imported {
        payload: ImportPayload,
        response: Value,
    },
}

impl SyncOutcome {
    pub fn payload(&self) -> &ImportPayload {
        match self {
            SyncOutcome::DryRun(payload) => payload,
            SyncOutcome::Imported { payload, .. } => payload,
        }
    }
}

pub fn load_inventory<C: HttpClient>(
    http: C,
    settings: &ImportSettings,
    source: &Source,
) -> SyncResult<Inventory> {
    match source {
        Source::Snapshot(path) => snapshot::load_snapshot(path),
        Source::Cloud(credentials) => cloud::fetch_inventory(http, &settings.cloud, credentials),
    }
}

/// Runs the pipeline. The hub is only contacted after the payload has
/// been fully built, and never on a dry run.
pub fn run<C: HttpClient>(
    http: C,
    settings: &ImportSettings,
    options: SyncOptions,
) -> SyncResult<SyncOutcome> {
    let inventory = load_inventory(&http, settings, &options.source)?;
    let payload = synthesize(inventory, options.reset);

    if let Some(path) = &options.save_to {
        let rendered = payload.to_pretty_json()?;
        std::fs::write(path, rendered).map_err(|err| SyncError::io(path, err))?;
        info!(path = %path.display(), "payload saved");
    }

    if options.dry_run {
        return Ok(SyncOutcome::DryRun(payload));
    }

    let importer = DeviceImporter::new(&http, options.target);
    let response = importer.send(&payload)?;
    Ok(SyncOutcome::Imported { payload, response })
}
