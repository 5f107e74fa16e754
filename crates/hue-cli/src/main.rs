mod cli;
mod format;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use hue_core::{Action, BlePeripheral, ConnectionConfig, SessionOutcome, Supervisor, SupervisorConfig};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::format::{FormatOptions, Rendered, render_outcome};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout only carries the result
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color)
        .init();

    let opts = FormatOptions::new(cli.no_color, cli.json);
    let outcome = run(&cli).await?;

    match render_outcome(&outcome, opts)? {
        Rendered::Stdout(text) => println!("{}", text),
        Rendered::Stderr(text) => {
            eprintln!("{}", text);
            if matches!(&outcome, SessionOutcome::Failed(e) if e.is_usage_error()) {
                eprintln!("Run 'hue-ble-ctl --help' for the list of actions.");
            }
        }
    }

    let code = u8::try_from(outcome.exit_code()).unwrap_or(1);
    Ok(ExitCode::from(code))
}

/// Validate the action, then locate the bulb and run the session under one bound.
async fn run(cli: &Cli) -> Result<SessionOutcome> {
    // Reject bad input before touching Bluetooth
    let action = match Action::parse(&cli.action, &cli.args) {
        Ok(action) => action,
        Err(e) => return Ok(SessionOutcome::Failed(e)),
    };
    debug!("Parsed action: {}", action);

    let config = SupervisorConfig::new().timeout(Duration::from_secs(cli.timeout));
    config.validate()?;

    let locate = async {
        BlePeripheral::locate(
            &cli.mac_address,
            cli.adapter.as_deref(),
            Duration::from_secs(cli.scan_timeout),
            ConnectionConfig::default(),
        )
        .await
        .map(Arc::new)
    };

    Ok(Supervisor::new(config).locate_and_run(locate, action).await)
}
