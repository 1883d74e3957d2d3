//! CLI argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "sqlgrade")]
#[command(author, version, about = "SQL query-quality gate")]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Score SQL files and fail when the average is below the minimum
    Check(CheckArgs),

    /// List the rules with their penalties
    Rules,

    /// Print the statements found in a SQL file (for debugging)
    Split {
        /// SQL file to split
        file: PathBuf,

        /// SQL dialect
        #[arg(short, long, default_value = "postgresql")]
        dialect: String,
    },
}

#[derive(clap::Args, Default)]
pub struct CheckArgs {
    /// SQL files, directories or glob patterns
    pub files: Vec<String>,

    /// Minimum average score required to pass (0-100)
    #[arg(long = "min-score", value_name = "N", env = "SQLGRADE_MIN_SCORE")]
    pub min_score: Option<i64>,

    /// Penalty at or above which a finding counts as critical
    #[arg(long = "critical-threshold", value_name = "N")]
    pub critical_threshold: Option<i64>,

    /// How statement scores combine into a file score (worst, mean)
    #[arg(long, value_name = "POLICY")]
    pub policy: Option<String>,

    /// SQL dialect (postgresql, mysql)
    #[arg(short, long)]
    pub dialect: Option<String>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Also write the JSON report to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Rule to disable, by name or code (repeatable)
    #[arg(long, value_name = "RULE")]
    pub disable: Vec<String>,

    /// Configuration file (default: nearest sqlgrade.toml)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON report
    Json,
    /// SARIF output (for GitHub Code Scanning)
    Sarif,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true)
    }
}
