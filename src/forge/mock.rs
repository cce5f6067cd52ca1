//! forge::mock
//!
//! Mock forge implementation for deterministic testing.
//!
//! # Design
//!
//! The mock forge serves files, bodies and directory listings from memory
//! and records every call, so tests can assert not only on results but on
//! which upstream calls a resolution made (and which it did not).
//!
//! Bodies can be split into explicit chunks to exercise chunk-boundary
//! handling, or made to fail part-way through to exercise mid-stream aborts.
//!
//! # Example
//!
//! ```
//! use geojson_relay::core::types::ResourcePath;
//! use geojson_relay::forge::mock::{MockForge, MockOperation};
//! use geojson_relay::forge::Forge;
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::new().with_file("maps/a.geojson", b"{}".to_vec());
//!
//! let path = ResourcePath::new("maps/a.geojson").unwrap();
//! let meta = forge.file_metadata(&path).await.unwrap();
//! assert_eq!(meta.download_url, "https://raw.mock/main/maps/a.geojson");
//!
//! assert_eq!(forge.operations().len(), 1);
//! # });
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::traits::{
    content_type_for, ByteStream, DirectoryEntry, EntryKind, FileMetadata, Forge, ForgeError,
    RawContent,
};
use crate::core::types::ResourcePath;

/// Base URL for mock raw downloads.
pub const MOCK_RAW_BASE: &str = "https://raw.mock";

/// Base URL for mock large-object downloads.
pub const MOCK_MEDIA_BASE: &str = "https://media.mock";

/// Branch the mock forge resolves against.
pub const MOCK_BRANCH: &str = "main";

/// Mock forge for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping.
#[derive(Debug, Clone)]
pub struct MockForge {
    /// Internal state shared across clones.
    inner: Arc<Mutex<MockForgeInner>>,
}

/// Internal mutable state.
#[derive(Debug)]
struct MockForgeInner {
    /// File metadata by path.
    files: HashMap<String, FileMetadata>,
    /// Bodies by URL.
    bodies: HashMap<String, MockBody>,
    /// Directory listings by path ("" is the root).
    directories: HashMap<String, Vec<DirectoryEntry>>,
    /// Operation to fail (for testing error paths).
    fail_on: Option<FailOn>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
    /// Chunks handed out per URL.
    pulls: HashMap<String, usize>,
    /// Bodies returned by `open` and not yet dropped.
    open_bodies: usize,
}

/// A stored response body.
#[derive(Debug, Clone)]
struct MockBody {
    chunks: Vec<Bytes>,
    /// Error yielded after all chunks, if any.
    trailing_error: Option<ForgeError>,
    /// Chunk repeated forever after `chunks`, if any.
    repeat: Option<Bytes>,
}

/// Held by every open mock body; counts pulls and notices the drop.
struct BodyGuard {
    inner: Arc<Mutex<MockForgeInner>>,
    url: String,
}

impl BodyGuard {
    fn pulled(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner.pulls.entry(self.url.clone()).or_default() += 1;
    }
}

impl Drop for BodyGuard {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.open_bodies -= 1;
        }
    }
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail every file_metadata call with the given error.
    FileMetadata(ForgeError),
    /// Fail list_directory with the given error.
    ListDirectory(ForgeError),
    /// Fail open for one URL with the given error.
    Open { url: String, error: ForgeError },
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    FileMetadata { path: String },
    ListDirectory { path: Option<String> },
    Open { url: String },
}

impl MockForge {
    /// Create a new empty mock forge.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockForgeInner {
                files: HashMap::new(),
                bodies: HashMap::new(),
                directories: HashMap::new(),
                fail_on: None,
                operations: Vec::new(),
                pulls: HashMap::new(),
                open_bodies: 0,
            })),
        }
    }

    /// Register a file whose download URL serves `body` in one chunk.
    ///
    /// The download URL is `{MOCK_RAW_BASE}/{MOCK_BRANCH}/{path}`.
    pub fn with_file(self, path: &str, body: impl Into<Bytes>) -> Self {
        self.with_chunked_file(path, vec![body.into()])
    }

    /// Register a file whose download URL serves `chunks` in order.
    pub fn with_chunked_file(self, path: &str, chunks: Vec<Bytes>) -> Self {
        let url = {
            let mut inner = self.inner.lock().unwrap();
            let url = format!("{MOCK_RAW_BASE}/{MOCK_BRANCH}/{path}");
            let size = chunks.iter().map(|c| c.len() as u64).sum();
            let content_type_hint = ResourcePath::new(path)
                .map(|p| content_type_for(&p))
                .unwrap_or("application/octet-stream");
            let sha = format!("mock-sha-{}", inner.files.len() + 1);
            inner.files.insert(
                path.to_string(),
                FileMetadata {
                    name: path.rsplit('/').next().unwrap_or(path).to_string(),
                    sha,
                    size,
                    download_url: url.clone(),
                    content_type_hint,
                },
            );
            url
        };
        self.with_chunked_body(&url, chunks)
    }

    /// Register metadata without any body behind it.
    pub fn with_metadata(self, path: &str, metadata: FileMetadata) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.files.insert(path.to_string(), metadata);
        }
        self
    }

    /// Serve `body` at `url` in one chunk.
    pub fn with_body(self, url: &str, body: impl Into<Bytes>) -> Self {
        self.with_chunked_body(url, vec![body.into()])
    }

    /// Serve `chunks` at `url` in order.
    pub fn with_chunked_body(self, url: &str, chunks: Vec<Bytes>) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.bodies.insert(
                url.to_string(),
                MockBody {
                    chunks,
                    trailing_error: None,
                    repeat: None,
                },
            );
        }
        self
    }

    /// Serve `chunks` at `url`, then fail the stream with `error`.
    pub fn with_failing_body(self, url: &str, chunks: Vec<Bytes>, error: ForgeError) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.bodies.insert(
                url.to_string(),
                MockBody {
                    chunks,
                    trailing_error: Some(error),
                    repeat: None,
                },
            );
        }
        self
    }

    /// Register a file that serves `head`, then `repeat` forever.
    ///
    /// The body never ends; the consumer has to drop it.
    pub fn with_endless_file(self, path: &str, head: Vec<Bytes>, repeat: impl Into<Bytes>) -> Self {
        let forge = self.with_chunked_file(path, head);
        {
            let mut inner = forge.inner.lock().unwrap();
            let url = inner.files[path].download_url.clone();
            if let Some(body) = inner.bodies.get_mut(&url) {
                body.repeat = Some(repeat.into());
            }
        }
        forge
    }

    /// Serve `body` at the large-object URL for `path`.
    pub fn with_large_object(self, path: &str, body: impl Into<Bytes>) -> Self {
        let url = format!("{MOCK_MEDIA_BASE}/{MOCK_BRANCH}/{path}");
        self.with_body(&url, body)
    }

    /// Register a directory listing; `""` is the repository root.
    pub fn with_directory(self, path: &str, entries: Vec<DirectoryEntry>) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.directories.insert(path.to_string(), entries);
        }
        self
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use geojson_relay::forge::mock::{MockForge, FailOn};
    /// use geojson_relay::forge::ForgeError;
    ///
    /// let forge = MockForge::new().fail_on(FailOn::FileMetadata(ForgeError::Status {
    ///     url: "https://api.mock/contents/a.json".into(),
    ///     status: 404,
    ///     body: "Not Found".into(),
    /// }));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.fail_on = Some(fail_on);
        }
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_on = None;
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        let inner = self.inner.lock().unwrap();
        inner.operations.clone()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.clear();
    }

    /// Number of chunks handed out for `url` so far.
    pub fn pulled_chunks(&self, url: &str) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.pulls.get(url).copied().unwrap_or(0)
    }

    /// Number of bodies returned by `open` that are still alive.
    pub fn open_bodies(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.open_bodies
    }

    /// URLs passed to `open`, in call order.
    pub fn opened_urls(&self) -> Vec<String> {
        self.operations()
            .into_iter()
            .filter_map(|op| match op {
                MockOperation::Open { url } => Some(url),
                _ => None,
            })
            .collect()
    }

    /// Record an operation.
    fn record(&self, op: MockOperation) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.push(op);
    }

    fn not_found(url: String) -> ForgeError {
        ForgeError::Status {
            url,
            status: 404,
            body: "Not Found".to_string(),
        }
    }
}

impl Default for MockForge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Forge for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn branch(&self) -> &str {
        MOCK_BRANCH
    }

    async fn file_metadata(&self, path: &ResourcePath) -> Result<FileMetadata, ForgeError> {
        self.record(MockOperation::FileMetadata {
            path: path.to_string(),
        });

        let inner = self.inner.lock().unwrap();
        if let Some(FailOn::FileMetadata(e)) = &inner.fail_on {
            return Err(e.clone());
        }

        inner
            .files
            .get(path.as_str())
            .cloned()
            .ok_or_else(|| Self::not_found(format!("https://api.mock/contents/{path}")))
    }

    async fn list_directory(
        &self,
        path: Option<&ResourcePath>,
    ) -> Result<Vec<DirectoryEntry>, ForgeError> {
        self.record(MockOperation::ListDirectory {
            path: path.map(ToString::to_string),
        });

        let inner = self.inner.lock().unwrap();
        if let Some(FailOn::ListDirectory(e)) = &inner.fail_on {
            return Err(e.clone());
        }

        let key = path.map(ResourcePath::as_str).unwrap_or("");
        inner
            .directories
            .get(key)
            .cloned()
            .ok_or_else(|| Self::not_found(format!("https://api.mock/contents/{key}")))
    }

    async fn open(&self, url: &str) -> Result<RawContent, ForgeError> {
        self.record(MockOperation::Open {
            url: url.to_string(),
        });

        let mut inner = self.inner.lock().unwrap();
        if let Some(FailOn::Open { url: failing, error }) = &inner.fail_on {
            if failing == url {
                return Err(error.clone());
            }
        }

        let body = inner
            .bodies
            .get(url)
            .cloned()
            .ok_or_else(|| Self::not_found(url.to_string()))?;
        inner.open_bodies += 1;
        drop(inner);

        let finite = body
            .chunks
            .into_iter()
            .map(Ok)
            .chain(body.trailing_error.map(Err));
        let items: Box<dyn Iterator<Item = Result<Bytes, ForgeError>> + Send> = match body.repeat {
            Some(chunk) => Box::new(finite.chain(std::iter::repeat(chunk).map(Ok))),
            None => Box::new(finite),
        };

        let guard = BodyGuard {
            inner: Arc::clone(&self.inner),
            url: url.to_string(),
        };
        let stream: ByteStream = Box::pin(futures::stream::iter(items).map(move |item| {
            guard.pulled();
            item
        }));

        Ok(RawContent {
            url: url.to_string(),
            body: stream,
        })
    }

    fn large_object_url(&self, path: &ResourcePath) -> Result<String, ForgeError> {
        Ok(format!("{MOCK_MEDIA_BASE}/{MOCK_BRANCH}/{path}"))
    }
}

/// Convenience constructor for a file entry in a mock listing.
pub fn file_entry(path: &str, size: u64) -> DirectoryEntry {
    DirectoryEntry {
        name: path.rsplit('/').next().unwrap_or(path).to_string(),
        path: path.to_string(),
        kind: EntryKind::File,
        size,
        download_url: Some(format!("{MOCK_RAW_BASE}/{MOCK_BRANCH}/{path}")),
    }
}
