//! CLI argument definitions using clap.

use clap::Parser;
use clap::builder::BoolishValueParser;
use hue_core::scan::DEFAULT_SCAN_DURATION;
use hue_core::supervisor::DEFAULT_SESSION_TIMEOUT;

const ACTIONS_HELP: &str = "\
Actions:
  toggle                  Flip the light on or off
  switch_on               Turn the light on
  switch_off              Turn the light off
  brightness <0-255>      Set the brightness level
  temperature <mired>     Set the color temperature (clamped to 153-454)
  col_xy <x> <y>          Set the color from CIE xy coordinates (0-1)
  color <r> <g> <b>       Set the color from RGB channels (0-255)
  introspect              List every service and characteristic
  state                   Show device information and the current state

Examples:
  hue-ble-ctl toggle AA:BB:CC:DD:EE:FF
  hue-ble-ctl brightness AA:BB:CC:DD:EE:FF 128
  hue-ble-ctl color AA:BB:CC:DD:EE:FF 255 80 0";

#[derive(Debug, Parser)]
#[command(name = "hue-ble-ctl")]
#[command(author, version, about = "Control Philips Hue Bluetooth bulbs", long_about = None)]
#[command(after_help = ACTIONS_HELP)]
pub struct Cli {
    /// Action to perform (see the list below)
    pub action: String,

    /// Bulb address (MAC address, or the peripheral UUID on macOS)
    pub mac_address: String,

    /// Arguments for the action
    #[arg(allow_negative_numbers = true)]
    pub args: Vec<String>,

    /// Bound on the whole command in seconds, finding the bulb included
    #[arg(
        short = 'T',
        long,
        env = "HUE_BLE_TIMEOUT",
        default_value_t = DEFAULT_SESSION_TIMEOUT.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: u64,

    /// Bluetooth adapter to use, by index or name (e.g. hci1)
    #[arg(short, long, env = "HUE_BLE_ADAPTER")]
    pub adapter: Option<String>,

    /// How long to scan for the bulb in seconds, within the overall timeout
    #[arg(
        long,
        default_value_t = DEFAULT_SCAN_DURATION.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub scan_timeout: u64,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR", value_parser = BoolishValueParser::new())]
    pub no_color: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_positional_arguments() {
        let cli = Cli::try_parse_from([
            "hue-ble-ctl",
            "color",
            "AA:BB:CC:DD:EE:FF",
            "255",
            "80",
            "0",
        ])
        .unwrap();
        assert_eq!(cli.action, "color");
        assert_eq!(cli.mac_address, "AA:BB:CC:DD:EE:FF");
        assert_eq!(cli.args, vec!["255", "80", "0"]);
        assert_eq!(cli.timeout, DEFAULT_SESSION_TIMEOUT.as_secs());
        assert_eq!(cli.scan_timeout, DEFAULT_SCAN_DURATION.as_secs());
    }

    #[test]
    fn test_negative_action_argument() {
        let cli =
            Cli::try_parse_from(["hue-ble-ctl", "temperature", "AA:BB:CC:DD:EE:FF", "-5"]).unwrap();
        assert_eq!(cli.args, vec!["-5"]);
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from([
            "hue-ble-ctl",
            "--json",
            "-v",
            "--adapter",
            "hci1",
            "-T",
            "30",
            "state",
            "AA:BB:CC:DD:EE:FF",
        ])
        .unwrap();
        assert!(cli.json);
        assert!(cli.verbose);
        assert_eq!(cli.adapter.as_deref(), Some("hci1"));
        assert_eq!(cli.timeout, 30);
    }

    #[test]
    fn test_rejects_zero_timeout() {
        assert!(
            Cli::try_parse_from(["hue-ble-ctl", "-T", "0", "toggle", "AA:BB:CC:DD:EE:FF"]).is_err()
        );
    }

    #[test]
    fn test_requires_address() {
        assert!(Cli::try_parse_from(["hue-ble-ctl", "toggle"]).is_err());
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(
            Cli::try_parse_from(["hue-ble-ctl", "-v", "-q", "toggle", "AA:BB:CC:DD:EE:FF"]).is_err()
        );
    }
}
