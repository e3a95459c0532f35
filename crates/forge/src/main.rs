//! # Forge CLI
//!
//! The binary is intentionally thin: the CLI lives in `src/cli/`, this file
//! only invokes `cli::run()` and handles process termination.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (src/cli/)                                       │
//! │  - clap argument parsing (setup.rs)                         │
//! │  - Dispatch to the API facade (handlers.rs)                 │
//! │  - Plain text or JSON output (render.rs)                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  forgeapp::api::ForgeApi                                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Diagnostics go to stderr through `tracing-subscriber`, so stdout only
//! carries results and stays pipeable.

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
