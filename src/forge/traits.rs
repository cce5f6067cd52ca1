//! forge::traits
//!
//! Forge trait definition for reading repository content.
//!
//! # Design
//!
//! The `Forge` trait is async because every operation is network I/O.
//! It exposes exactly the primitives the resolver composes:
//!
//! - [`Forge::file_metadata`]: content-index lookup for one file
//! - [`Forge::list_directory`]: content-index lookup for a directory
//! - [`Forge::open`]: one GET against an absolute URL, as a byte stream
//! - [`Forge::large_object_url`]: where materialized LFS bytes are served
//!
//! Errors are reported as [`ForgeError`] without stage context; the
//! resolver decides whether a failing `open` was a raw fetch or a
//! large-object fetch and wraps it accordingly.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::Serialize;
use thiserror::Error;

use crate::core::types::ResourcePath;

/// Errors from forge operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForgeError {
    /// The upstream answered with a non-success status.
    #[error("upstream returned {status} for {url}")]
    Status {
        /// URL that was requested
        url: String,
        /// HTTP status code
        status: u16,
        /// Response body, truncated for diagnostics
        body: String,
    },

    /// The upstream answered successfully but the payload was not understood.
    #[error("unexpected response from {url}: {message}")]
    Format { url: String, message: String },

    /// The call did not complete within the configured timeout.
    #[error("timed out waiting for {url}")]
    Timeout { url: String },

    /// Connection-level failure.
    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },
}

impl ForgeError {
    /// URL the failing call was made against.
    pub fn url(&self) -> &str {
        match self {
            ForgeError::Status { url, .. }
            | ForgeError::Format { url, .. }
            | ForgeError::Timeout { url }
            | ForgeError::Network { url, .. } => url,
        }
    }
}

/// Lazy, single-pass sequence of body chunks.
///
/// Dropping the stream releases the underlying connection.
pub type ByteStream = BoxStream<'static, Result<Bytes, ForgeError>>;

/// Metadata for a single file, as returned by the content index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// Entry name (final path segment)
    pub name: String,
    /// Blob SHA as reported by the index
    pub sha: String,
    /// Size in bytes as stored in the repository (pointer size for LFS files)
    pub size: u64,
    /// Direct download location
    pub download_url: String,
    /// Content type inferred from the file extension
    pub content_type_hint: &'static str,
}

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Submodule,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub size: u64,
    pub download_url: Option<String>,
}

/// An open response body, tagged with the URL that served it.
pub struct RawContent {
    /// URL the body came from
    pub url: String,
    /// Remaining body chunks
    pub body: ByteStream,
}

impl std::fmt::Debug for RawContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawContent").field("url", &self.url).finish()
    }
}

/// Infer a content type from a path's extension.
///
/// ```
/// use geojson_relay::core::types::ResourcePath;
/// use geojson_relay::forge::content_type_for;
///
/// let path = ResourcePath::new("a/roads.geojson").unwrap();
/// assert_eq!(content_type_for(&path), "application/geo+json");
/// ```
pub fn content_type_for(path: &ResourcePath) -> &'static str {
    match path.extension().map(str::to_ascii_lowercase).as_deref() {
        Some("geojson") => "application/geo+json",
        Some("json") | Some("topojson") => "application/json",
        _ => "application/octet-stream",
    }
}

/// The Forge trait for reading content from a hosted repository.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one instance serves every
/// in-flight request.
///
/// # Error Handling
///
/// Implementations never retry. A single failure is returned as-is.
#[async_trait]
pub trait Forge: Send + Sync {
    /// Get the forge name (e.g., "github").
    fn name(&self) -> &'static str;

    /// Branch every lookup resolves against.
    fn branch(&self) -> &str;

    /// Look up file metadata for `path` on the configured branch.
    ///
    /// # Errors
    ///
    /// - `Status` when the index answers with a non-success status
    /// - `Format` when the entry is not a file or has no download location
    async fn file_metadata(&self, path: &ResourcePath) -> Result<FileMetadata, ForgeError>;

    /// List a directory; `None` lists the repository root.
    async fn list_directory(
        &self,
        path: Option<&ResourcePath>,
    ) -> Result<Vec<DirectoryEntry>, ForgeError>;

    /// GET an absolute URL and return the body as a stream.
    ///
    /// The status is checked before the stream is returned, so an `Ok`
    /// always carries a successful response.
    async fn open(&self, url: &str) -> Result<RawContent, ForgeError>;

    /// URL serving the materialized large-object bytes for `path`.
    fn large_object_url(&self, path: &ResourcePath) -> Result<String, ForgeError>;
}
