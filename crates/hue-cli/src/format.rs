//! Output formatting for text and JSON output.

use anyhow::Result;
use hue_core::{ActionReport, Reading, SessionOutcome};
use owo_colors::OwoColorize;
use serde_json::json;

/// Formatting options for output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Disable colored output.
    pub no_color: bool,
    /// Print JSON instead of text.
    pub json: bool,
}

impl FormatOptions {
    pub fn new(no_color: bool, json: bool) -> Self {
        Self { no_color, json }
    }
}

/// Where a rendered outcome should be printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Stdout(String),
    Stderr(String),
}

/// Render a session outcome.
///
/// Completed reports go to stdout. Failures go to stderr as text, or to
/// stdout as a JSON object when JSON output is requested.
pub fn render_outcome(outcome: &SessionOutcome, opts: FormatOptions) -> Result<Rendered> {
    match outcome {
        SessionOutcome::Completed(report) if opts.json => {
            Ok(Rendered::Stdout(serde_json::to_string_pretty(report)?))
        }
        SessionOutcome::Completed(report) => Ok(Rendered::Stdout(format_report(report, opts))),
        failed if opts.json => {
            let body = json!({
                "state": failed.state(),
                "error": failed.to_string(),
            });
            Ok(Rendered::Stdout(serde_json::to_string_pretty(&body)?))
        }
        failed => Ok(Rendered::Stderr(format_error(&failed.to_string(), opts))),
    }
}

/// Format an error message with an `Error:` label.
#[must_use]
pub fn format_error(message: &str, opts: FormatOptions) -> String {
    if opts.no_color {
        format!("Error: {}", message)
    } else {
        format!("{} {}", "Error:".red().bold(), message)
    }
}

/// Format ON/OFF with color.
#[must_use]
pub fn format_on_off(on: bool, no_color: bool) -> String {
    let label = if on { "ON" } else { "OFF" };
    if no_color {
        label.to_string()
    } else if on {
        label.green().bold().to_string()
    } else {
        label.dimmed().to_string()
    }
}

fn label(text: &str, no_color: bool) -> String {
    if no_color {
        text.to_string()
    } else {
        text.bold().to_string()
    }
}

/// Format a completed action as text.
#[must_use]
pub fn format_report(report: &ActionReport, opts: FormatOptions) -> String {
    match report {
        ActionReport::Switch { was_on, is_on } => format!(
            "Light switched {} (was {})",
            format_on_off(*is_on, opts.no_color),
            format_on_off(*was_on, opts.no_color)
        ),
        ActionReport::State {
            manufacturer,
            model,
            firmware,
            state,
        } => {
            let state = match state {
                Reading::Value(s) => format!(
                    "{} at {}%",
                    format_on_off(s.on, opts.no_color),
                    s.brightness_percent
                ),
                other => other.to_string(),
            };
            format!(
                "{} {}\n{} {}\n{} {}\n{} {}",
                label("Manufacturer:", opts.no_color),
                manufacturer,
                label("Model:", opts.no_color),
                model,
                label("Firmware:", opts.no_color),
                firmware,
                label("State:", opts.no_color),
                state
            )
        }
        other => other.to_string(),
    }
}
