//! # CLI Behavior
//!
//! This is **one possible client** for forge, not the application itself.
//! The CLI is the only place that knows about terminal I/O, exit codes and
//! output formatting. For the overall architecture, see the `forgeapp` crate
//! documentation.
//!
//! ## Who Am I
//!
//! Every command runs as one user: `--user`, else `FORGE_USER`, else the
//! `user` key of `forge.toml`, else `system`. The system user bypasses access
//! checks, which is how a fresh store gets its first entries and users.
//!
//! ## Output
//!
//! Results go to stdout as plain lines, or as JSON with `--json`.
//! Diagnostics go to stderr; `RUST_LOG` wins over the configured
//! `log_filter`, and `--verbose` forces `debug`.
//!
//! ## Module Structure
//!
//! - `setup`: Argument parsing via clap
//! - `handlers`: Per-command dispatch onto the API
//! - `render`: Plain and JSON output
//! - `styles`: Terminal styling

mod handlers;
mod render;
pub mod setup;
mod styles;

use clap::Parser;
use forgeapp::init::initialize;
use setup::Cli;
use tracing_subscriber::EnvFilter;

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let ctx = initialize(cli.data_dir.clone(), cli.user.clone())
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    init_logging(&ctx.config.log_filter, cli.verbose);

    handlers::dispatch(&ctx, cli.command, cli.json)
}

fn init_logging(configured: &str, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(configured))
    };
    // A second init (tests driving run() twice) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
