//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::config::APP_DIR;

/// gpk - signed game pack sync and resolution
#[derive(Parser)]
#[command(
    name = "gpk",
    about = "Sync signed game packs and resolve window titles to prompts",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one sync cycle against the remote index
    Sync,

    /// Sync periodically and hot-reload packs until Ctrl-C
    Watch,

    /// List loaded packs in registration order
    Packs,

    /// Resolve a window title to a pack
    Resolve {
        /// Raw foreground window title
        title: String,
    },

    /// Render the prompt for a title and category
    Prompt {
        title: String,

        /// Category id or legacy label
        category: String,

        /// OCR text captured from the screenshot
        #[arg(long)]
        ocr: Option<String>,
    },

    /// Show the shortcuts offered for a title
    Capabilities {
        title: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Build the secondary query from a saved AI response
    Query {
        title: String,

        category: String,

        /// File holding the AI response text
        response_file: PathBuf,
    },

    /// Read window titles from stdin and print each newly stable title with its pack
    Detect,

    /// Verify an artifact against its detached signature
    Verify {
        artifact: PathBuf,

        /// Signature file (defaults to the artifact with a .sig extension)
        #[arg(long)]
        sig: Option<PathBuf>,
    },
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("logs")
        .join("gamepacks.log")
}

/// Output format for listing commands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}
