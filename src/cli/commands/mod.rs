//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads configuration and applies its own flags on top
//! 2. Builds the forge and resolver
//! 3. Formats and displays output
//!
//! # Async Commands
//!
//! Every command does network I/O. Handlers are synchronous entry points
//! that build a Tokio runtime and `block_on` their async body.

mod get;
mod list;
mod serve;

pub use get::get;
pub use list::list;
pub use serve::serve;

use std::sync::Arc;

use anyhow::{Context as _, Result};
use tracing::debug;

use super::args::Command;
use super::Context;
use crate::core::config::{Config, ProcessEnv, RelayConfig};
use crate::forge::github::GitHubForge;
use crate::resolve::Resolver;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Serve { bind, port, mode } => serve::serve(ctx, bind, port, mode),
        Command::Get { path, stream } => get::get(ctx, &path, stream),
        Command::List { path } => list::list(ctx, path.as_deref()),
    }
}

/// Load configuration from the usual locations and the process environment.
pub(crate) fn load_config(ctx: &Context) -> Result<RelayConfig> {
    let loaded =
        Config::load(ctx.config.as_deref(), &ProcessEnv).context("failed to load configuration")?;
    match &loaded.loaded_from {
        Some(path) => debug!(path = %path.display(), "loaded configuration"),
        None => debug!("no configuration file found, using defaults"),
    }
    Ok(loaded.config)
}

/// Resolver backed by the configured GitHub repository.
pub(crate) fn github_resolver(config: &RelayConfig) -> Resolver {
    let forge = GitHubForge::new(&config.upstream);
    Resolver::new(Arc::new(forge), config.resolve)
}

/// Runtime for a single command.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}
