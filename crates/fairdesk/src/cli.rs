//! Clap derive structures for the `fairdesk` CLI.
//!
//! Defines the command tree, global flags, and shared enums. Kept free of
//! crate-internal imports so `build.rs` can include it for man pages.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// fairdesk -- connectivity and health diagnostics for the data service
#[derive(Debug, Parser)]
#[command(
    name = "fairdesk",
    version,
    about = "Connectivity and health diagnostics for the fairdesk data service",
    long_about = "Probe the hosted data service the way the fairdesk app does.\n\n\
        Quick checks, startup health, per-resource sweeps and a live\n\
        connection monitor, with table, JSON or YAML output.",
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
    /// Configuration profile to use
    #[arg(long, short = 'p', env = "FAIRDESK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Data service URL (overrides profile)
    #[arg(long, env = "FAIRDESK_URL", global = true)]
    pub url: Option<String>,

    /// Service API key (overrides profile and keyring)
    #[arg(long, env = "FAIRDESK_API_KEY", global = true, hide_env = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "FAIRDESK_OUTPUT",
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

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "FAIRDESK_INSECURE", global = true)]
    pub insecure: bool,

    /// Per-probe timeout in milliseconds (overrides profile)
    #[arg(long, env = "FAIRDESK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
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
    /// Probe the canary resource once
    #[command(alias = "ping")]
    Check,

    /// Startup health summary: configuration, connection, session, policies
    Health,

    /// Probe each resource and aggregate a diagnostic report
    Sweep(SweepArgs),

    /// Minimal network check: host presence, configuration, reachability
    Net,

    /// Monitor the connection and print every transition
    Watch(WatchArgs),

    /// Manage configuration profiles
    #[command(alias = "cfg")]
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Diagnostics ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SweepArgs {
    /// Resources to probe; the first is the canary (default: profile list)
    pub resources: Vec<String>,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Seconds between periodic checks (default: profile interval)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Display the resolved profile (secrets redacted)
    Show,

    /// Create or update a profile with guided setup
    Init,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store the API key in the system keyring
    SetKey {
        /// Profile to store the key for (default: active profile)
        #[arg(long)]
        profile: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
