//! CLI argument parsing for blockcal.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "bc",
    about = "A time-blocked task calendar with merge and split scheduling",
    version = env!("CARGO_PKG_VERSION"),
    after_help = "Logs are written to: ~/.local/share/blockcal/logs/blockcal.log"
)]
pub struct Cli {
    /// Path to the blockcal store directory (default: current directory)
    #[arg(short = 'd', long, global = true)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize a new blockcal store in the current directory
    Init,

    /// Create a new task
    Create {
        /// Date (YYYY-MM-DD)
        date: String,

        /// Start time (HH:MM)
        start_time: String,

        /// Task title
        title: String,

        /// Duration in minutes
        #[arg(short = 'm', long, default_value = "45")]
        duration: u32,

        /// Location
        #[arg(short, long, default_value = "")]
        location: String,

        /// Description
        #[arg(short = 'D', long, default_value = "")]
        description: String,
    },

    /// List tasks, optionally limited to a date range
    List {
        /// First date to include (YYYY-MM-DD)
        #[arg(short, long, requires = "end")]
        start: Option<String>,

        /// Last date to include (YYYY-MM-DD)
        #[arg(short, long, requires = "start")]
        end: Option<String>,
    },

    /// Get a task by ID
    Get {
        /// Task ID
        id: i64,
    },

    /// Update fields of a task
    Update {
        /// Task ID
        id: i64,

        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        start_time: Option<String>,

        #[arg(short = 'm', long)]
        duration: Option<u32>,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        location: Option<String>,

        #[arg(short = 'D', long)]
        description: Option<String>,
    },

    /// Delete a task
    Delete {
        /// Task ID
        id: i64,
    },

    /// Merge tasks into the earliest one
    Merge {
        /// Task IDs (at least two)
        #[arg(required = true)]
        ids: Vec<i64>,

        /// New title for the merged task
        #[arg(short, long)]
        title: Option<String>,

        /// New location for the merged task
        #[arg(short, long)]
        location: Option<String>,

        /// New description for the merged task
        #[arg(short = 'D', long)]
        description: Option<String>,
    },

    /// Split a task into equal parts separated by 10 minute breaks
    Split {
        /// Task ID
        id: i64,

        /// Number of parts
        #[arg(short, long, default_value = "2")]
        count: u32,
    },

    /// Run the HTTP API server in the foreground
    Serve {
        /// Interface to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Port to bind
        #[arg(short, long, default_value = "5000")]
        port: u16,
    },
}
