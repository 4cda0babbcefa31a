//! CLI argument definitions for Prospect.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `discover` | Run the full pipeline against a recorded snapshot |
//! | `score` | Pre-validation scores for every snapshot record, no external calls |
//! | `rules` | List the disqualifying rule table in effect |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--config` | `$PROSPECT_CONFIG` | TOML pipeline configuration |
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Treat warnings as errors |
//!
//! # Examples
//!
//! ```bash
//! prospect discover --snapshot austin.json --query plumbers --location "Austin, TX"
//! prospect score --snapshot austin.json --format table
//! prospect rules --config prospect.toml --pretty
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Lead discovery and qualification CLI
#[derive(Debug, Parser)]
#[command(
    name = "prospect",
    author,
    version,
    about = "Lead discovery and qualification CLI",
    long_about = "Prospect discovers local businesses from several sources, scores them \
before paying for verification, validates their contact details and exports only \
verified leads.\n\
\n\
Use 'prospect <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Pipeline configuration file. Falls back to $PROSPECT_CONFIG.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat warnings and errors as failures (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text summary for terminal display.
    Table,
    /// Single JSON object output.
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Discover, score, validate and export leads.
    ///
    /// Discovery sources and verification verdicts are replayed from a
    /// snapshot file. The first source in the snapshot is the primary one.
    ///
    /// # Examples
    ///
    ///   prospect discover --snapshot austin.json --query plumbers --location "Austin, TX"
    ///   prospect discover --snapshot austin.json --query plumbers --location "Austin, TX" \
    ///     --target 5 --max-calls 40 --probe-websites
    Discover(DiscoverArgs),

    /// Score every snapshot record without validating it.
    Score(ScoreArgs),

    /// List the disqualifying rules in effect.
    Rules,
}

#[derive(Debug, Args)]
pub struct DiscoverArgs {
    /// Snapshot file with recorded sources and verdicts.
    #[arg(long)]
    pub snapshot: PathBuf,

    /// Business category or keywords.
    #[arg(long)]
    pub query: String,

    /// City and region, e.g. "Austin, TX".
    #[arg(long)]
    pub location: String,

    /// Maximum candidates kept after merging.
    #[arg(long, default_value_t = 20)]
    pub limit: usize,

    /// Number of qualified leads to stop at.
    #[arg(long, default_value_t = 10)]
    pub target: usize,

    /// Ceiling on external calls for the run.
    #[arg(long, default_value_t = 200)]
    pub max_calls: u64,

    /// Ceiling on accrued cost for the run.
    #[arg(long, default_value_t = 5.0)]
    pub cost_ceiling: f64,

    /// Verify websites with live HTTP requests instead of recorded verdicts.
    #[arg(long, default_value_t = false)]
    pub probe_websites: bool,
}

#[derive(Debug, Args)]
pub struct ScoreArgs {
    /// Snapshot file with recorded sources.
    #[arg(long)]
    pub snapshot: PathBuf,

    /// Only print records at or above the threshold.
    #[arg(long, default_value_t = false)]
    pub passing: bool,
}
