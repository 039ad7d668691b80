use std::{
    io::{self, IsTerminal},
    path::PathBuf,
    time::Duration,
};

use anyhow::Context;
use clap::{Args, Parser};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::cloud::CloudCredentials;
use crate::http::UreqClient;
use crate::importer::DeviceTarget;
use crate::payload::ResetPolicy;
use crate::settings::{self, ImportSettings};
use crate::sync::{self, Source, SyncOptions, SyncOutcome};

#[derive(Parser)]
#[command(name = "avion-import")]
#[command(
    about = "Import Avi-on cloud data or a mesh_db.json snapshot into an avionmesh hub",
    version,
    after_help = "Main options:\n  --from-file <PATH> | --email <EMAIL>\n  --device <HOST>\n\nOptional options:\n  --password <PASSWORD> (prompted when omitted)\n  --dry-run\n  --no-reset\n  --username <USER> --password-http <PASSWORD>\n  --save <PATH>\n  --api-base <URL>\n  --timeout <SECS> (default: 30)"
)]
pub struct Cli {
    #[command(flatten)]
    source: SourceArgs,
    #[arg(long, help = "Avi-on account password (used with --email).")]
    password: Option<String>,
    #[arg(long, value_name = "HOST", help = "Hub IP address, hostname, or URL.")]
    device: String,
    #[arg(long, help = "Print the payload instead of sending it.")]
    dry_run: bool,
    #[arg(long, help = "Don't clear existing hub data before import.")]
    no_reset: bool,
    #[arg(long, help = "HTTP Basic Auth username for the hub.")]
    username: Option<String>,
    #[arg(long, help = "HTTP Basic Auth password for the hub.")]
    password_http: Option<String>,
    #[arg(long, value_name = "PATH", help = "Also write the payload to this file.")]
    save: Option<PathBuf>,
    #[arg(long, value_name = "URL", help = "Override the cloud API base URL.")]
    api_base: Option<String>,
    #[arg(
        long,
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Per-request timeout in seconds."
    )]
    timeout: Option<u64>,
    #[arg(short, long, help = "Enable debug logging.")]
    verbose: bool,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct SourceArgs {
    #[arg(long, value_name = "PATH", help = "Import from a local mesh_db.json.")]
    from_file: Option<PathBuf>,
    #[arg(long, value_name = "EMAIL", help = "Avi-on account email (cloud import).")]
    email: Option<String>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        init_logging(self.verbose);

        let mut settings = settings::load_settings().context("loading settings")?;
        self.apply_overrides(&mut settings);

        let options = self.sync_options(&settings)?;
        let http = UreqClient::new(Duration::from_secs(settings.timeout_secs));
        let outcome = sync::run(&http, &settings, options)?;

        match outcome {
            SyncOutcome::DryRun(payload) => {
                eprintln!("--- Dry run (would send): ---");
                println!("{}", payload.to_pretty_json()?);
            }
            SyncOutcome::Imported { response, .. } => {
                println!("{}", serde_json::to_string_pretty(&response)?);
                eprintln!("Done!");
            }
        }
        Ok(())
    }

    fn apply_overrides(&self, settings: &mut ImportSettings) {
        if let Some(api_base) = &self.api_base {
            settings.cloud.api_base = api_base.clone();
        }
        if let Some(timeout) = self.timeout {
            settings.timeout_secs = timeout;
        }
    }

    fn sync_options(&self, settings: &ImportSettings) -> anyhow::Result<SyncOptions> {
        let source = match (&self.source.from_file, &self.source.email) {
            (Some(path), _) => Source::Snapshot(path.clone()),
            (None, Some(email)) => Source::Cloud(CloudCredentials {
                email: email.clone(),
                password: self.cloud_password()?,
            }),
            (None, None) => anyhow::bail!("one of --from-file or --email is required"),
        };

        let mut target =
            DeviceTarget::new(self.device.clone()).with_import_path(settings.device.import_path.clone());
        match (&self.username, &self.password_http) {
            (Some(username), Some(password)) => {
                target = target.with_basic_auth(username.clone(), password.clone());
            }
            (None, None) => {}
            _ => warn!("--username and --password-http must be given together, sending without auth"),
        }

        Ok(SyncOptions {
            source,
            target,
            dry_run: self.dry_run,
            reset: if self.no_reset {
                ResetPolicy::Keep
            } else {
                ResetPolicy::Replace
            },
            save_to: self.save.clone(),
        })
    }

    fn cloud_password(&self) -> anyhow::Result<String> {
        if let Some(password) = &self.password {
            return Ok(password.clone());
        }
        if !io::stdin().is_terminal() {
            anyhow::bail!("--password is required with --email");
        }
        rpassword::prompt_password("Avi-on password: ").context("reading password")
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
