//! # graphdrive: command-line access to SharePoint document libraries
//!
//! Wires the [`graphdrive_fs::Filesystem`] facade to the SharePoint
//! adapter: layered configuration, logging, and one subcommand per
//! filesystem operation.

pub mod commands;
pub mod config;
pub mod logging;

use anyhow::{Context, Result};
use commands::Cli;
use config::FileConfig;
use graphdrive_fs::Filesystem;
use graphdrive_sharepoint::SharepointAdapter;

/// Resolve settings from file, environment and flags.
pub fn resolve_config(cli: &Cli) -> Result<graphdrive_sharepoint::SharepointConfig> {
    let mut layered = FileConfig::load(cli.config.as_deref())?;
    layered.apply_env(|key| std::env::var(key).ok())?;
    if let Some(drive) = &cli.drive {
        layered.drive_name = Some(drive.clone());
    }
    layered.into_sharepoint()
}

/// Connect and run the parsed command, writing its output to stdout.
pub async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;
    tracing::debug!(
        site = %config.site_id,
        drive = ?config.drive_name,
        "connecting"
    );
    let adapter = SharepointAdapter::connect(config)
        .await
        .context("connecting to SharePoint")?;
    let fs = Filesystem::new(adapter);
    let mut stdout = tokio::io::stdout();
    commands::execute(&fs, cli.command, &mut stdout).await
}
