//! CLI argument definitions for Role Chat.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Role Chat -- workflow planning from chat messages.
#[derive(Parser)]
#[command(
    name = "rolechat",
    version,
    about = "Role Chat -- plan and run workflows from chat messages",
    long_about = "Turns chat messages that ask for meetings, emails, or team posts into \
                  dependency-ordered workflows and runs them against an automation backend."
)]
pub struct Cli {
    /// Configuration file (defaults to config/default.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server.
    Serve {
        /// Address to bind the HTTP server to.
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on.
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Plan a request and print the plan as JSON.
    Plan {
        /// The request text.
        text: String,
    },

    /// Plan and execute a request, then print the result.
    Run {
        /// The request text.
        text: String,
    },

    /// Probe the automation backend, then send a marked test request.
    TestConnection,

    /// Probe the automation backend.
    Health,
}
