//! resolve
//!
//! The content-resolution pipeline.
//!
//! # Architecture
//!
//! A request moves through a fixed sequence of stages:
//!
//! ```text
//! Start -> PathResolved -> MetadataFetched -> ContentFetched -> Classifying
//!       -> PointerDetected -> RedirectedContentFetched -> Responded
//!       -> LiteralContent -> Responded
//! ```
//!
//! Any stage may end in `Failed(kind)`. Each stage is a fallible async step
//! that short-circuits with a [`ResolveError`] naming where it failed.
//!
//! # Modules
//!
//! - [`pointer`]: LFS pointer record detection and parsing
//! - [`fetch`]: draining and peeking upstream byte streams
//! - [`pipeline`]: the [`Resolver`] that composes the stages
//!
//! # Example
//!
//! ```ignore
//! use geojson_relay::resolve::Resolver;
//!
//! let resolver = Resolver::new(forge, config.resolve);
//! let document = resolver.resolve(&path).await?;
//! assert!(serde_json::from_slice::<serde_json::Value>(&document.body).is_ok());
//! ```

pub mod fetch;
pub mod pipeline;
pub mod pointer;

pub use pipeline::{
    Delivery, DocumentStream, Origin, ResolvedDocument, ResolvedStream, Resolver, Stage,
};
pub use pointer::{Classification, PointerRecord, POINTER_SIGNATURE};

use thiserror::Error;

use crate::core::types::TypeError;
use crate::forge::ForgeError;

/// Errors from resolving a path to a document.
///
/// Every variant carries enough context (path, URL, status) to diagnose
/// which upstream call failed. None of them carry the credential.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The requested path is empty, escapes the repository, or is malformed.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// The content index answered with a non-success status.
    #[error("metadata lookup for '{path}' failed with status {status}: {body}")]
    UpstreamMetadata {
        path: String,
        status: u16,
        body: String,
    },

    /// The content index answered but the payload was not a usable file entry.
    #[error("unexpected metadata from {url}: {message}")]
    UpstreamFormat { url: String, message: String },

    /// The raw download failed.
    #[error("content fetch from {url} failed with status {status}")]
    UpstreamContent { url: String, status: u16 },

    /// The content looked like a pointer record but could not be parsed.
    #[error("invalid LFS pointer for '{path}': {reason}")]
    InvalidPointerFormat { path: String, reason: String },

    /// The large-object download failed.
    #[error("LFS fetch from {url} failed with status {status}")]
    UpstreamLfs { url: String, status: u16 },

    /// The final bytes are not valid JSON.
    #[error("document from {url} is not valid JSON: {message}")]
    InvalidDocumentFormat { url: String, message: String },

    /// An upstream call or chunk wait exceeded the configured timeout.
    #[error("timed out waiting for {url}")]
    Timeout { url: String },

    /// Connection-level failure talking to the upstream.
    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },

    /// The document exceeded the buffered size limit.
    #[error("document from {url} exceeds the {limit} byte limit")]
    DocumentTooLarge { url: String, limit: usize },

    /// Large-object bytes did not match the pointer record.
    #[error("large object for '{path}' failed verification: expected {expected}, got {actual}")]
    LargeObjectIntegrity {
        path: String,
        expected: String,
        actual: String,
    },
}

impl ResolveError {
    /// Stable name of the error kind, used in logs and the error envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveError::InvalidPath { .. } => "InvalidPath",
            ResolveError::UpstreamMetadata { .. } => "UpstreamMetadata",
            ResolveError::UpstreamFormat { .. } => "UpstreamFormat",
            ResolveError::UpstreamContent { .. } => "UpstreamContent",
            ResolveError::InvalidPointerFormat { .. } => "InvalidPointerFormat",
            ResolveError::UpstreamLfs { .. } => "UpstreamLfs",
            ResolveError::InvalidDocumentFormat { .. } => "InvalidDocumentFormat",
            ResolveError::Timeout { .. } => "Timeout",
            ResolveError::Network { .. } => "Network",
            ResolveError::DocumentTooLarge { .. } => "DocumentTooLarge",
            ResolveError::LargeObjectIntegrity { .. } => "LargeObjectIntegrity",
        }
    }

    /// Short human-readable summary for the `error` field of the envelope.
    pub fn summary(&self) -> &'static str {
        match self {
            ResolveError::InvalidPath { .. } => "Invalid path",
            ResolveError::UpstreamMetadata { .. } => "Failed to fetch file metadata",
            ResolveError::UpstreamFormat { .. } => "Unexpected file metadata",
            ResolveError::UpstreamContent { .. } => "Failed to fetch file content",
            ResolveError::InvalidPointerFormat { .. } => "Invalid LFS pointer format",
            ResolveError::UpstreamLfs { .. } => "Failed to fetch LFS content",
            ResolveError::InvalidDocumentFormat { .. } => "Invalid GeoJSON format",
            ResolveError::Timeout { .. } => "Upstream request timed out",
            ResolveError::Network { .. } => "Upstream request failed",
            ResolveError::DocumentTooLarge { .. } => "Document too large",
            ResolveError::LargeObjectIntegrity { .. } => "LFS content failed verification",
        }
    }
}

impl From<TypeError> for ResolveError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidPath { path, reason } => ResolveError::InvalidPath { path, reason },
            TypeError::InvalidBranchName(name) => ResolveError::InvalidPath {
                path: name,
                reason: "invalid branch name".to_string(),
            },
        }
    }
}

/// Which upstream call a [`ForgeError`] came from.
///
/// The same adapter error means different things depending on the stage:
/// a 404 from the index is a metadata failure, a 404 from the media host is
/// a large-object failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UpstreamStage<'a> {
    Metadata { path: &'a str },
    Content,
    LargeObject,
}

impl UpstreamStage<'_> {
    /// Wrap an adapter error with this stage's context.
    pub(crate) fn wrap(self, err: ForgeError) -> ResolveError {
        match err {
            ForgeError::Timeout { url } => ResolveError::Timeout { url },
            ForgeError::Network { url, message } => ResolveError::Network { url, message },
            ForgeError::Format { url, message } => ResolveError::UpstreamFormat { url, message },
            ForgeError::Status { url, status, body } => match self {
                UpstreamStage::Metadata { path } => ResolveError::UpstreamMetadata {
                    path: path.to_string(),
                    status,
                    body,
                },
                UpstreamStage::Content => ResolveError::UpstreamContent { url, status },
                UpstreamStage::LargeObject => ResolveError::UpstreamLfs { url, status },
            },
        }
    }
}
