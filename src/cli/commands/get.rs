//! cli::commands::get
//!
//! Resolve one path and write the document to stdout.
//!
//! # Example
//!
//! ```bash
//! # Validate and print
//! geojson-relay get sichuan/sichuan.geojson
//!
//! # Relay without validation
//! geojson-relay get national/rail.geojson --stream > rail.geojson
//! ```

use anyhow::{Context as _, Result};
use futures::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::{github_resolver, load_config, runtime};
use crate::cli::Context;
use crate::core::config::DeliveryMode;
use crate::core::types::{ResourcePath, GEOJSON_ROUTE};
use crate::resolve::{Delivery, ResolveError, Resolver};

/// Resolve `path` and print it.
///
/// A path copied from a relay URL (`/api/geojson/...`) is accepted as well.
pub fn get(ctx: &Context, path: &str, stream: bool) -> Result<()> {
    let path = ResourcePath::strip_route(path, GEOJSON_ROUTE).map_err(ResolveError::from)?;
    let config = load_config(ctx)?;
    let mode = if stream {
        DeliveryMode::Streaming
    } else {
        config.resolve.mode
    };
    let resolver = github_resolver(&config);

    let rt = runtime()?;
    rt.block_on(async {
        let mut stdout = tokio::io::stdout();
        write_document(&resolver, &path, mode, &mut stdout).await
    })
}

/// Resolve `path` and write the bytes to `out`.
pub async fn write_document<W>(
    resolver: &Resolver,
    path: &ResourcePath,
    mode: DeliveryMode,
    out: &mut W,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    match resolver.deliver(path, mode).await? {
        Delivery::Buffered(doc) => out.write_all(&doc.body).await?,
        Delivery::Streaming(mut stream) => {
            while let Some(chunk) = stream.body.next().await {
                let chunk = chunk.with_context(|| format!("while streaming {path}"))?;
                out.write_all(&chunk).await?;
            }
        }
    }
    out.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ResolveOptions;
    use crate::forge::mock::MockForge;
    use std::sync::Arc;

    #[tokio::test]
    async fn writes_buffered_document() {
        let forge = MockForge::new().with_file("a.json", r#"{"a":1}"#);
        let resolver = Resolver::new(Arc::new(forge), ResolveOptions::default());
        let path = ResourcePath::new("a.json").unwrap();

        let mut out = Vec::new();
        write_document(&resolver, &path, DeliveryMode::Buffered, &mut out)
            .await
            .unwrap();
        assert_eq!(out, br#"{"a":1}"#);
    }

    #[tokio::test]
    async fn writes_streamed_chunks() {
        let forge = MockForge::new().with_chunked_file(
            "a.json",
            vec![bytes::Bytes::from_static(b"[1,"), bytes::Bytes::from_static(b"2]")],
        );
        let resolver = Resolver::new(Arc::new(forge), ResolveOptions::default());
        let path = ResourcePath::new("a.json").unwrap();

        let mut out = Vec::new();
        write_document(&resolver, &path, DeliveryMode::Streaming, &mut out)
            .await
            .unwrap();
        assert_eq!(out, b"[1,2]");
    }
}
