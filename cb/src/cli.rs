//! CLI argument parsing for channelbus

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cb")]
#[command(author, version, about = "Manage and exercise named event channels", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the channel kinds that can be created
    Kinds,

    /// List channels in the manifest
    List,

    /// Add a channel to the manifest
    Create {
        /// Channel name
        #[arg(required = true)]
        name: String,

        /// Channel kind (see `cb kinds`)
        #[arg(required = true)]
        kind: String,
    },

    /// Remove a channel from the manifest
    Delete {
        /// Channel name
        #[arg(required = true)]
        name: String,
    },

    /// Show diagnostics for a channel
    Inspect {
        /// Channel name
        #[arg(required = true)]
        name: String,
    },

    /// Raise a channel once with a test value
    Raise {
        /// Channel name
        #[arg(required = true)]
        name: String,

        /// Value to raise (default: the kind's default value)
        value: Option<String>,
    },
}
