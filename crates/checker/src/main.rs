//! `queuewatch` -- fleet mail-queue depth checker.
//!
//! Reads a YAML fleet configuration, asks every server for its queue depth
//! over SSH, and sends one consolidated alert email when any server is at
//! or over its threshold. A server that cannot be reached is logged and
//! left out of the report; it never stops the run.
//!
//! The config file path is the first CLI argument when given, otherwise
//! `QUEUEWATCH_CONFIG`, otherwise `config.yaml` in the working directory.
//!
//! # Environment variables
//!
//! | Variable            | Required | Default       | Description                       |
//! |---------------------|----------|---------------|-----------------------------------|
//! | `QUEUEWATCH_CONFIG` | no       | `config.yaml` | Config file path fallback         |
//! | `SSH_AUTH_SOCK`     | no       | --            | Agent socket for passwordless SSH |
//! | `RUST_LOG`          | no       | `info`        | Tracing filter directives         |
//!
//! # Exit codes
//!
//! `0` on a completed run (including runs where some servers failed),
//! `1` when the alert email could not be submitted, `2` on configuration
//! errors.

use queuewatch_checker::dispatch::{self, DispatchOutcome};
use queuewatch_checker::probe::SshProbe;
use queuewatch_checker::runner;
use queuewatch_core::{validate, FleetConfig};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Config file used when neither argv nor the environment names one.
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Environment variable naming the config file.
const CONFIG_PATH_ENV: &str = "QUEUEWATCH_CONFIG";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "queuewatch_checker=info,queuewatch_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let config = match FleetConfig::from_path(&config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(path = %config_path, error = %e, "Cannot load configuration");
            std::process::exit(2);
        }
    };

    if let Err(e) = validate::validate(&config) {
        tracing::error!(path = %config_path, error = %e, "Configuration rejected");
        std::process::exit(2);
    }

    let targets = config.targets();
    tracing::info!(path = %config_path, servers = targets.len(), "Starting fleet check");

    let batch = runner::run_fleet(&SshProbe, &targets).await;

    match dispatch::dispatch(&batch, &config.email).await {
        Ok(DispatchOutcome::Sent) => {
            tracing::info!("Alert email sent");
        }
        Ok(DispatchOutcome::Skipped) => {
            tracing::info!("No thresholds exceeded, no alert sent");
        }
        Err(e) => {
            tracing::error!(error = %e, "Alert email could not be submitted");
            std::process::exit(1);
        }
    }
}
