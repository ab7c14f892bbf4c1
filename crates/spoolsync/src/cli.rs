//! Clap derive structures for the `spoolsync` CLI.

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use spoolsync_core::{SpoolId, TraySlot};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// spoolsync: keep AMS tray assignments in step with a Spoolman inventory
#[derive(Debug, Parser)]
#[command(
    name = "spoolsync",
    version,
    about = "Reconcile Bambu AMS tray assignments with a Spoolman inventory",
    long_about = None,
    propagate_version = true,
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
#[allow(clippy::struct_excessive_bools)]
pub struct GlobalOpts {
    /// Bridge profile to use
    #[arg(long, short = 'p', env = "SPOOLSYNC_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Bridge API root, e.g. http://bridge.local:8000/api (overrides profile)
    #[arg(long, short = 'b', env = "SPOOLSYNC_BRIDGE", global = true)]
    pub bridge: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SPOOLSYNC_OUTPUT",
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
    #[arg(long, short = 'k', env = "SPOOLSYNC_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "SPOOLSYNC_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Quiet period before an entered spool id is looked up, in milliseconds
    #[arg(long, env = "SPOOLSYNC_DEBOUNCE_MS", global = true)]
    pub debounce_ms: Option<u64>,
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
    /// Inspect and reconcile AMS tray assignments
    #[command(alias = "t")]
    Trays(TraysArgs),

    /// Browse the spool inventory
    #[command(alias = "s")]
    Spools(SpoolsArgs),

    /// Printer connection and bridge health
    Status,

    /// Parse scanned QR text into a spool id (offline)
    Resolve(ResolveArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Trays ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TraysArgs {
    #[command(subcommand)]
    pub command: TraysCommand,
}

#[derive(Debug, Subcommand)]
pub enum TraysCommand {
    /// List every provisioned tray with its assignment
    #[command(alias = "ls")]
    List,

    /// Show one tray, its RFID tag and the spool bound to that tag
    Show {
        /// Tray index (0-based) or "ext" for the external holder
        tray: TraySlot,
    },

    /// Assign a spool to a tray
    Assign {
        /// Tray index (0-based) or "ext" for the external holder
        tray: TraySlot,

        /// Spool id to assign
        #[arg(required_unless_present = "scan", conflicts_with = "scan")]
        spool: Option<SpoolId>,

        /// Scanned QR text to resolve instead of a spool id
        #[arg(long, value_name = "TEXT")]
        scan: Option<String>,
    },

    /// Remove the spool assignment from a tray
    Clear {
        /// Tray index (0-based) or "ext" for the external holder
        tray: TraySlot,
    },

    /// Bind the tray's RFID tag to a spool
    Bind {
        /// Tray index (0-based) or "ext" for the external holder
        tray: TraySlot,

        /// Spool id (defaults to the tray's current assignment)
        spool: Option<SpoolId>,
    },
}

// ── Spools ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SpoolsArgs {
    #[command(subcommand)]
    pub command: SpoolsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SpoolsCommand {
    /// List spools in the inventory
    #[command(alias = "ls")]
    List {
        /// Include archived spools
        #[arg(long, short = 'a')]
        all: bool,
    },

    /// Show one spool
    Get {
        /// Spool id
        id: SpoolId,
    },
}

// ── Resolve ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Scanned text: a spool URL or a `scheme:s-<id>` reference
    pub text: String,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or extend the config file with a bridge profile
    Init {
        /// Profile name (prompted when omitted on a terminal)
        #[arg(long)]
        name: Option<String>,

        /// Bridge API root (prompted when omitted on a terminal)
        #[arg(long = "url", value_name = "URL")]
        url: Option<String>,
    },

    /// Display current configuration
    Show,

    /// Print the config file location
    Path,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
