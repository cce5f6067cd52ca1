//! cli::commands::list
//!
//! Print a directory listing as JSON.

use anyhow::Result;

use super::{github_resolver, load_config, runtime};
use crate::cli::Context;
use crate::core::types::ResourcePath;
use crate::resolve::ResolveError;

/// List `path` (or the repository root) and pretty-print the entries.
pub fn list(ctx: &Context, path: Option<&str>) -> Result<()> {
    let path = ResourcePath::directory(path.unwrap_or("")).map_err(ResolveError::from)?;
    let config = load_config(ctx)?;
    let resolver = github_resolver(&config);

    let rt = runtime()?;
    let entries = rt.block_on(resolver.list(path.as_ref()))?;
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}
