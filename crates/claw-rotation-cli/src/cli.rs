//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Clawbernetes credential rotation.
#[derive(Parser, Debug, Clone)]
#[command(name = "claw-rotate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML rotation config. Defaults apply when omitted.
    #[arg(short, long, env = "CLAW_ROTATE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Print one newly generated credential.
    Generate {
        /// Credential length; overrides the config.
        #[arg(short, long)]
        length: Option<usize>,
    },

    /// Run one rotation event against a local state file.
    ///
    /// The state file holds the secret store contents and the live
    /// credential of each target resource. It is rewritten after the
    /// attempt, including when only the target was updated.
    Rotate {
        /// JSON state file.
        #[arg(short, long)]
        state: PathBuf,

        /// Event payload file, or `-` for stdin.
        #[arg(short, long, default_value = "-")]
        event: String,
    },
}
