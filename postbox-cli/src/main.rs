//! Postbox — publish a blog whose posts live in a repository file.
//!
//! # Usage
//!
//! ```text
//! postbox config init --owner <owner> --repo <repo> [--branch <branch>]
//! postbox config show
//! postbox posts [--search <text>] [--oldest] [--json]
//! postbox digest <text>
//! postbox verify --token <token>
//! postbox admin --username <name> --token <token>
//! ```

mod commands;

use std::future::Future;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{
    admin::AdminArgs, config::ConfigCommand, digest::DigestArgs, posts::PostsArgs,
    verify::VerifyArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "postbox",
    version,
    about = "Read and publish blog posts stored in a GitHub repository",
    long_about = None,
)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create or inspect ~/.postbox/config.yaml.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// List the published posts.
    Posts(PostsArgs),

    /// Print the SHA-256 digest used for the admin login check.
    Digest(DigestArgs),

    /// Check that an access token can publish to the configured repository.
    Verify(VerifyArgs),

    /// Log in and stage, review and publish changes interactively.
    Admin(AdminArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Config { command } => commands::config::run(command),
        Commands::Posts(args) => block_on(args.run()),
        Commands::Digest(args) => args.run(),
        Commands::Verify(args) => block_on(args.run()),
        Commands::Admin(args) => block_on(args.run()),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Drive one async command to completion on a single-threaded runtime.
fn block_on<F: Future<Output = Result<()>>>(future: F) -> Result<()> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?
        .block_on(future)
}
