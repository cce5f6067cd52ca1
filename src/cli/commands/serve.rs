//! cli::commands::serve
//!
//! Run the HTTP server.
//!
//! Flags override the configuration file and environment:
//! `--bind` the address, `--port` the port, `--mode` the default delivery
//! mode for requests that do not pass `?stream=`.

use anyhow::Result;

use super::{load_config, runtime};
use crate::cli::Context;
use crate::core::config::DeliveryMode;
use crate::server;

/// Serve until interrupted.
pub fn serve(
    ctx: &Context,
    bind: Option<String>,
    port: Option<u16>,
    mode: Option<DeliveryMode>,
) -> Result<()> {
    let mut config = load_config(ctx)?;
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(mode) = mode {
        config.resolve.mode = mode;
    }

    let rt = runtime()?;
    rt.block_on(server::serve(config))
}
