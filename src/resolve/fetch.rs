//! resolve::fetch
//!
//! Reading upstream byte streams.
//!
//! Two ways to consume a [`RawContent`]:
//!
//! - [`drain`]: read the whole body into memory under a size limit
//! - [`peek`]: read just enough to make a decision, keeping the rest lazy
//!
//! Neither assumes anything about transport chunk boundaries.

use bytes::{Bytes, BytesMut};
use futures::stream::{self, StreamExt};
use thiserror::Error;

use crate::forge::{ByteStream, ForgeError, RawContent};

/// Errors from reading a body.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The stream itself failed.
    #[error(transparent)]
    Forge(#[from] ForgeError),

    /// More than `limit` bytes arrived.
    #[error("body from {url} exceeds {limit} bytes")]
    TooLarge { url: String, limit: usize },
}

/// Read a body to completion, failing once more than `limit` bytes arrive.
///
/// The limit is checked per chunk, so an oversized body is abandoned
/// without reading the rest of it.
pub async fn drain(content: RawContent, limit: usize) -> Result<Bytes, FetchError> {
    let RawContent { url, mut body } = content;
    let mut buf = BytesMut::new();

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        if buf.len() + chunk.len() > limit {
            return Err(FetchError::TooLarge { url, limit });
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(buf.freeze())
}

/// The start of a body plus whatever has not been read yet.
pub struct Peeked {
    /// URL the body came from
    pub url: String,
    /// Everything read so far (at least the requested length unless the
    /// body ended first)
    pub prefix: Bytes,
    /// Whether the body ended while peeking
    exhausted: bool,
    rest: ByteStream,
}

impl std::fmt::Debug for Peeked {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Peeked")
            .field("url", &self.url)
            .field("prefix_len", &self.prefix.len())
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

impl Peeked {
    /// Reassemble the full body: the prefix followed by the unread rest.
    ///
    /// An exhausted body is replayed from the prefix alone and the finished
    /// upstream stream is released here.
    pub fn into_content(self) -> RawContent {
        let Peeked {
            url,
            prefix,
            exhausted,
            rest,
        } = self;
        let head = if prefix.is_empty() {
            None
        } else {
            Some(Ok(prefix))
        };
        let body: ByteStream = if exhausted {
            drop(rest);
            Box::pin(stream::iter(head))
        } else {
            Box::pin(stream::iter(head).chain(rest))
        };
        RawContent { url, body }
    }
}

/// Read chunks until at least `at_least` bytes are buffered or the body ends.
pub async fn peek(content: RawContent, at_least: usize) -> Result<Peeked, ForgeError> {
    let RawContent { url, mut body } = content;
    let mut buf = BytesMut::new();
    let mut exhausted = false;

    while buf.len() < at_least {
        match body.next().await {
            Some(chunk) => buf.extend_from_slice(&chunk?),
            None => {
                exhausted = true;
                break;
            }
        }
    }

    Ok(Peeked {
        url,
        prefix: buf.freeze(),
        exhausted,
        rest: body,
    })
}
