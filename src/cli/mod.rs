//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "docseek",
    version,
    author = "neur0map",
    about = "Local document finder with hybrid semantic and filename search",
    long_about = "Docseek indexes your local documents into a vector index and a SQLite metadata \
                  store, then finds files by meaning, by keyword and by fuzzy file name."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/docseek/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index files or directories
    Index {
        /// Files or directories to index
        paths: Vec<PathBuf>,

        /// Re-index everything under the configured scan paths
        #[arg(short, long, conflicts_with = "incremental")]
        full: bool,

        /// Index new or modified files under the configured scan paths
        #[arg(short, long)]
        incremental: bool,

        /// Files extracted and embedded in parallel
        #[arg(short = 'j', long, default_value = "1")]
        concurrency: usize,
    },

    /// Search indexed documents and file names
    Search {
        /// Search query text
        query: String,

        /// Maximum number of results to return
        #[arg(short, long)]
        limit: Option<usize>,

        /// Extra files to consider for file-name matches
        #[arg(long, value_name = "FILE")]
        staged: Vec<PathBuf>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Remove a file from the index
    Remove {
        /// File to remove
        path: PathBuf,
    },

    /// Show index statistics
    Stats {
        /// Show statistics in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Reclaim vector slots left behind by removed or re-indexed files
    Compact,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Show only a specific section
        #[arg(short, long)]
        section: Option<String>,
    },

    /// Set a configuration value
    Set {
        /// Configuration key in dot notation (e.g., "search.max_results")
        key: String,

        /// Value to set
        value: String,
    },

    /// Get a configuration value
    Get {
        /// Configuration key in dot notation
        key: String,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
