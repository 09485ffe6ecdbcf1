//! CLI argument parsing

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "reconforge")]
#[command(author, version, about = "Tool orchestration engine for conversational reconnaissance")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the HTTP API
    Serve {
        /// Bind host (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run a one-shot scan and print the results
    Scan {
        /// Target domain, IP, or URL
        #[arg(long)]
        target: String,

        /// Tool to run (can be repeated)
        #[arg(long, action = ArgAction::Append)]
        tool: Vec<String>,

        /// Named preset instead of an explicit tool list
        #[arg(long)]
        preset: Option<String>,

        /// Maximum concurrent tool subprocesses
        #[arg(long)]
        max_parallel: Option<usize>,

        /// Append results to an existing session
        #[arg(long)]
        session: Option<String>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List known tools and their availability
    Tools,

    /// List stored sessions
    Sessions,
}
