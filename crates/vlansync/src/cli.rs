//! Clap derive structures for the `vlansync` CLI.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// vlansync -- reconcile device VLAN tables against a system-of-record
#[derive(Debug, Parser)]
#[command(
    name = "vlansync",
    version,
    about = "Reconcile VLANs reported by network devices against a system-of-record",
    long_about = "Polls every device in the inventory with a show command, parses the VLAN\n\
        table it reports, and brings the stored per-device records in line with it.\n\
        New VLAN ids are also added to a global catalog.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration file (YAML or TOML)
    #[arg(long, short = 'f', env = "VLANSYNC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "VLANSYNC_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll the inventory and reconcile the store
    #[command(alias = "run")]
    Sync(SyncArgs),

    /// Inspect and edit stored VLAN records
    #[command(alias = "v")]
    Vlans(VlansArgs),

    /// Inspect the device inventory
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Manage the configuration file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Sync ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Inventory file; replaces every configured inventory source
    #[arg(long, short = 'i')]
    pub inventory: Option<PathBuf>,

    /// Repeat the pass on this interval (seconds, or a duration like "5m")
    #[arg(long, short = 'p', value_parser = parse_interval)]
    pub polling_interval: Option<Duration>,

    /// Concurrent device sessions
    #[arg(long, short = 'w')]
    pub workers: Option<usize>,

    /// Show command sent to every device
    #[arg(long, short = 'c')]
    pub command: Option<String>,

    /// Per-device command timeout in seconds
    #[arg(long, short = 't')]
    pub timeout: Option<u64>,
}

/// Bare integers are seconds; anything else goes through humantime.
/// Intervals are whole seconds, and 0 means a single pass.
fn parse_interval(value: &str) -> Result<Duration, String> {
    if let Ok(secs) = value.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    let interval =
        humantime::parse_duration(value).map_err(|e| format!("invalid interval '{value}': {e}"))?;
    if interval.subsec_nanos() != 0 {
        return Err(format!(
            "invalid interval '{value}': must be a whole number of seconds"
        ));
    }
    Ok(interval)
}

// ── Vlans ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct VlansArgs {
    #[command(subcommand)]
    pub command: VlansCommand,
}

#[derive(Debug, Subcommand)]
pub enum VlansCommand {
    /// List the global VLAN catalog
    #[command(alias = "ls")]
    List,

    /// List the VLANs stored for one device
    Device {
        /// Device name as written in the inventory
        name: String,
    },

    /// List devices that have stored VLANs
    Devices,

    /// Replace the description of a stored VLAN
    SetDescription {
        /// VLAN id
        id: String,
        /// New description
        description: String,
        /// Edit the device's record instead of the catalog entry
        #[arg(long, short = 'd')]
        device: Option<String>,
    },

    /// Remove a stored VLAN
    #[command(alias = "rm")]
    Remove {
        /// VLAN id
        id: String,
        /// Remove the device's record instead of the catalog entry
        #[arg(long, short = 'd')]
        device: Option<String>,
    },
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List devices loaded from the inventory
    #[command(alias = "ls")]
    List {
        /// Inventory file; replaces every configured inventory source
        #[arg(long, short = 'i')]
        inventory: Option<PathBuf>,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration after file and env merging
    Show,

    /// Print the config file path in use
    Path,

    /// Write a starter configuration file
    Init {
        /// Destination (defaults to ./vlansync.yml; .toml selects TOML)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn interval_accepts_seconds_and_durations() {
        assert_eq!(parse_interval("90").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_interval("5m").unwrap(), Duration::from_secs(300));
        assert!(parse_interval("soon").is_err());
    }

    #[test]
    fn interval_rejects_fractional_seconds() {
        assert!(parse_interval("500ms").unwrap_err().contains("whole number of seconds"));
        assert!(parse_interval("1500ms").is_err());
        assert_eq!(parse_interval("2000ms").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_interval("0").unwrap(), Duration::ZERO);

        let err = Cli::try_parse_from(["vlansync", "sync", "-p", "500ms"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn sync_flags_parse() {
        let cli = Cli::try_parse_from([
            "vlansync", "-o", "json", "sync", "-i", "hosts.yml", "-p", "30", "-w", "8",
        ])
        .unwrap();
        let Command::Sync(args) = cli.command else {
            panic!("expected sync");
        };
        assert_eq!(args.inventory, Some(PathBuf::from("hosts.yml")));
        assert_eq!(args.polling_interval, Some(Duration::from_secs(30)));
        assert_eq!(args.workers, Some(8));
        assert!(matches!(cli.global.output, OutputFormat::Json));
    }
}
