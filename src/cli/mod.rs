//! cli
//!
//! Command-line interface layer for geojson-relay.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Set up logging
//! - Load configuration and delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to
//! [`commands`], which build the forge and resolver from configuration.

pub mod args;
pub mod commands;

pub use args::Cli;

use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "geojson_relay=info,tower_http=info";

/// Log filter used with `--debug`.
pub const DEBUG_LOG_FILTER: &str = "geojson_relay=debug,tower_http=debug";

/// Global options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Explicit configuration file.
    pub config: Option<PathBuf>,
    /// Debug logging enabled.
    pub debug: bool,
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug);

    let ctx = Context {
        config: cli.config.clone(),
        debug: cli.debug,
    };

    commands::dispatch(cli.command, &ctx)
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `--debug` picks the filter. Logs go
/// to stderr so `get` and `list` output stays clean on stdout.
pub fn init_tracing(debug: bool) {
    let fallback = if debug {
        DEBUG_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
