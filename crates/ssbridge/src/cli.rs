//! Clap derive structures for the `ssbridge` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// ssbridge -- Synology Surveillance Station bridge
#[derive(Debug, Parser)]
#[command(
    name = "ssbridge",
    version,
    about = "Poll and control a Synology Surveillance Station",
    long_about = "Keeps a session with a Synology Surveillance Station, polls\n\
        cameras, home mode and events, and reports every channel update.",
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
    /// Station profile to use
    #[arg(long, short = 'p', env = "SSBRIDGE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "SSBRIDGE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Station URL (overrides profile)
    #[arg(long, short = 'u', env = "SSBRIDGE_URL", global = true)]
    pub url: Option<String>,

    /// DSM user name (overrides profile)
    #[arg(long, env = "SSBRIDGE_USERNAME", global = true, hide_env = true)]
    pub username: Option<String>,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "SSBRIDGE_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "SSBRIDGE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// One identifier per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect and keep polling until interrupted
    Run(RunArgs),

    /// List the cameras known to the station
    #[command(alias = "cams")]
    Cameras,

    /// Save one snapshot from a camera
    Snapshot(SnapshotArgs),

    /// Fire an external event (1-10)
    Trigger(TriggerArgs),

    /// Show or switch home mode
    HomeMode(HomeModeArgs),

    /// Inspect and edit the configuration
    Config(ConfigArgs),
}

// ── Run ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Only report these channels (repeatable, default: all)
    #[arg(long = "channel", value_name = "CHANNEL")]
    pub channels: Vec<String>,

    /// Poll these camera ids in addition to the profile's cameras
    #[arg(long = "camera", value_name = "ID", value_parser = clap::value_parser!(u32).range(1..))]
    pub cameras: Vec<u32>,
}

// ── Snapshot ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    /// Camera id
    #[arg(long, short = 'c', value_parser = clap::value_parser!(u32).range(1..))]
    pub camera: u32,

    /// Output file (default: camera-<id>-<timestamp>.jpg)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Stream profile
    #[arg(long, default_value = "high-quality")]
    pub stream: StreamArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StreamArg {
    HighQuality,
    Balanced,
    LowBandwidth,
}

// ── Trigger ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TriggerArgs {
    /// External event number
    #[arg(long, short = 'e')]
    pub event: i64,
}

// ── Home mode ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct HomeModeArgs {
    /// New state; omit to print the current one
    pub state: Option<Switch>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration (passwords masked)
    Show,

    /// Print the config file location
    Path,

    /// List configured profiles
    Profiles,

    /// Store the profile's password in the system keyring (read from stdin)
    SetPassword,
}
