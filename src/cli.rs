use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_PID_FILE: &str = "/tmp/openai-router.pid";
pub const DEFAULT_LOG_FILE: &str = "/tmp/openai-router.log";

/// Keyword-based router for OpenAI-compatible APIs
#[derive(Parser, Debug)]
#[command(name = "openai-router", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to a .env file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Enable trace logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Include error details and cause chains in 500 responses
    #[arg(long)]
    pub expose_errors: bool,

    /// Run in the background
    #[arg(short, long)]
    pub daemon: bool,

    #[arg(long, default_value = DEFAULT_PID_FILE)]
    pub pid_file: PathBuf,

    /// Daemon stdout/stderr destination
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stop a running daemon
    Stop {
        #[arg(long, default_value = DEFAULT_PID_FILE)]
        pid_file: PathBuf,
    },
    /// Check whether the daemon is running
    Status {
        #[arg(long, default_value = DEFAULT_PID_FILE)]
        pid_file: PathBuf,
    },
}
