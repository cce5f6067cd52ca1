//! resolve::pipeline
//!
//! The [`Resolver`]: path in, JSON document (or stream) out.
//!
//! # Delivery modes
//!
//! - **Buffered** ([`Resolver::resolve`]): the whole document is read under
//!   `max_document_bytes`, classified, redirected if it is a pointer, and
//!   validated as JSON before anything is returned. The returned bytes are
//!   exactly what the upstream served, minus a leading UTF-8 BOM.
//! - **Streaming** ([`Resolver::resolve_stream`]): every stage up to and
//!   including the final fetch's status check completes before this returns,
//!   so all of those failures are still ordinary `Err`s. What comes back is a
//!   lazy stream; a failure while it is being relayed surfaces as an error
//!   item and the consumer is expected to abort.
//!
//! Streaming never validates the document and never checks large-object
//! integrity; both need the whole body.
//!
//! # Logging
//!
//! Each resolution runs in a `resolve` span carrying a fresh request id.
//! Stage transitions are logged at `debug`, the outcome at `info` or `warn`.

use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use serde::de::IgnoredAny;
use serde::Serialize;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use super::fetch::{self, FetchError};
use super::pointer::{self, Classification, PointerError, MAX_POINTER_BYTES, POINTER_SIGNATURE};
use super::{ResolveError, UpstreamStage};
use crate::core::config::{DeliveryMode, ResolveOptions};
use crate::core::types::ResourcePath;
use crate::forge::{DirectoryEntry, Forge, RawContent};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Where the delivered bytes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// The raw download was the document itself.
    Literal,
    /// The raw download was a pointer; the bytes came from the media host.
    LargeObject,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Literal => write!(f, "literal"),
            Origin::LargeObject => write!(f, "large_object"),
        }
    }
}

/// A fully buffered, validated document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDocument {
    pub path: ResourcePath,
    pub origin: Origin,
    /// URL that served the final bytes
    pub source_url: String,
    /// Validated JSON bytes
    pub body: Bytes,
}

/// Body of a streamed document.
pub type DocumentStream = BoxStream<'static, Result<Bytes, ResolveError>>;

/// A document whose body is still being relayed.
pub struct ResolvedStream {
    pub path: ResourcePath,
    pub origin: Origin,
    /// URL serving the body
    pub source_url: String,
    pub body: DocumentStream,
}

impl std::fmt::Debug for ResolvedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedStream")
            .field("path", &self.path)
            .field("origin", &self.origin)
            .field("source_url", &self.source_url)
            .finish()
    }
}

/// Either kind of resolved document.
#[derive(Debug)]
pub enum Delivery {
    Buffered(ResolvedDocument),
    Streaming(ResolvedStream),
}

/// Per-request progress through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Start,
    PathResolved,
    MetadataFetched,
    ContentFetched,
    Classifying,
    PointerDetected,
    RedirectedContentFetched,
    LiteralContent,
    Responded,
}

/// Tracks the current stage and logs each transition.
#[derive(Debug)]
struct Progress {
    stage: Stage,
}

impl Progress {
    fn new() -> Self {
        Self {
            stage: Stage::Start,
        }
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(next > self.stage, "{:?} -> {:?}", self.stage, next);
        debug!(from = ?self.stage, to = ?next, "stage");
        self.stage = next;
    }

    fn fail(&self, err: &ResolveError) {
        warn!(stage = ?self.stage, kind = err.kind(), error = %err, "resolution failed");
    }
}

/// Resolves repository paths to JSON documents.
///
/// Cheap to clone; clones share the forge.
#[derive(Clone)]
pub struct Resolver {
    forge: Arc<dyn Forge>,
    options: ResolveOptions,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("forge", &self.forge.name())
            .field("options", &self.options)
            .finish()
    }
}

impl Resolver {
    pub fn new(forge: Arc<dyn Forge>, options: ResolveOptions) -> Self {
        Self { forge, options }
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Resolve in the given mode.
    pub async fn deliver(
        &self,
        path: &ResourcePath,
        mode: DeliveryMode,
    ) -> Result<Delivery, ResolveError> {
        match mode {
            DeliveryMode::Buffered => self.resolve(path).await.map(Delivery::Buffered),
            DeliveryMode::Streaming => self.resolve_stream(path).await.map(Delivery::Streaming),
        }
    }

    /// Resolve `path` to a validated, fully buffered document.
    ///
    /// # Errors
    ///
    /// Any [`ResolveError`] except `InvalidPath`, which is raised when the
    /// `ResourcePath` is built.
    pub async fn resolve(&self, path: &ResourcePath) -> Result<ResolvedDocument, ResolveError> {
        let span = tracing::info_span!(
            "resolve",
            request_id = %Uuid::new_v4(),
            path = %path,
            mode = "buffered"
        );
        async move {
            let mut progress = Progress::new();
            let result = self.buffered(path, &mut progress).await;
            match &result {
                Ok(doc) => info!(
                    origin = %doc.origin,
                    bytes = doc.body.len(),
                    "resolved"
                ),
                Err(err) => progress.fail(err),
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Resolve `path` to a stream, relaying bytes as they arrive.
    ///
    /// # Errors
    ///
    /// Failures up to and including the final fetch's status check are
    /// returned here. Later failures arrive as error items on the stream.
    pub async fn resolve_stream(
        &self,
        path: &ResourcePath,
    ) -> Result<ResolvedStream, ResolveError> {
        let span = tracing::info_span!(
            "resolve",
            request_id = %Uuid::new_v4(),
            path = %path,
            mode = "streaming"
        );
        async move {
            let mut progress = Progress::new();
            let result = self.streamed(path, &mut progress).await;
            match &result {
                Ok(stream) => info!(origin = %stream.origin, "streaming"),
                Err(err) => progress.fail(err),
            }
            result
        }
        .instrument(span)
        .await
    }

    /// List a directory; `None` is the repository root.
    pub async fn list(
        &self,
        path: Option<&ResourcePath>,
    ) -> Result<Vec<DirectoryEntry>, ResolveError> {
        let key = path.map(ResourcePath::as_str).unwrap_or("");
        self.forge
            .list_directory(path)
            .await
            .map_err(|e| UpstreamStage::Metadata { path: key }.wrap(e))
    }

    async fn buffered(
        &self,
        path: &ResourcePath,
        progress: &mut Progress,
    ) -> Result<ResolvedDocument, ResolveError> {
        progress.advance(Stage::PathResolved);
        let raw = self.open_direct(path, progress).await?;
        let raw_url = raw.url.clone();
        let bytes = self.drain(raw, UpstreamStage::Content).await?;

        progress.advance(Stage::Classifying);
        let classification =
            pointer::classify(&bytes).map_err(|e| invalid_pointer(path, e))?;

        let (origin, source_url, bytes) = match classification {
            Classification::Literal => {
                progress.advance(Stage::LiteralContent);
                (Origin::Literal, raw_url, bytes)
            }
            Classification::Pointer(record) => {
                progress.advance(Stage::PointerDetected);
                debug!(oid = %record.oid, size = ?record.size, "pointer record");

                let raw = self.open_large_object(path).await?;
                progress.advance(Stage::RedirectedContentFetched);
                let lfs_url = raw.url.clone();
                let bytes = self.drain(raw, UpstreamStage::LargeObject).await?;

                if self.options.verify_large_objects {
                    record
                        .verify(&bytes)
                        .map_err(|e| ResolveError::LargeObjectIntegrity {
                            path: path.to_string(),
                            expected: e.expected,
                            actual: e.actual,
                        })?;
                    debug!("large object verified");
                }
                (Origin::LargeObject, lfs_url, bytes)
            }
        };

        let body = validate_json(&source_url, bytes)?;
        progress.advance(Stage::Responded);

        Ok(ResolvedDocument {
            path: path.clone(),
            origin,
            source_url,
            body,
        })
    }

    async fn streamed(
        &self,
        path: &ResourcePath,
        progress: &mut Progress,
    ) -> Result<ResolvedStream, ResolveError> {
        progress.advance(Stage::PathResolved);
        let raw = self.open_direct(path, progress).await?;

        progress.advance(Stage::Classifying);
        let peeked = fetch::peek(raw, POINTER_SIGNATURE.len())
            .await
            .map_err(|e| UpstreamStage::Content.wrap(e))?;

        if !pointer::is_pointer_candidate(&peeked.prefix) {
            progress.advance(Stage::LiteralContent);
            let source_url = peeked.url.clone();
            let body = relay(peeked.into_content(), UpstreamStage::Content);
            progress.advance(Stage::Responded);
            return Ok(ResolvedStream {
                path: path.clone(),
                origin: Origin::Literal,
                source_url,
                body,
            });
        }

        let text = fetch::drain(peeked.into_content(), MAX_POINTER_BYTES)
            .await
            .map_err(|e| match e {
                FetchError::Forge(err) => UpstreamStage::Content.wrap(err),
                FetchError::TooLarge { .. } => invalid_pointer(path, PointerError::TooLarge),
            })?;
        let record = pointer::parse_record(&text).map_err(|e| invalid_pointer(path, e))?;
        progress.advance(Stage::PointerDetected);
        debug!(oid = %record.oid, size = ?record.size, "pointer record");

        let raw = self.open_large_object(path).await?;
        progress.advance(Stage::RedirectedContentFetched);
        let source_url = raw.url.clone();
        let body = relay(raw, UpstreamStage::LargeObject);
        progress.advance(Stage::Responded);

        Ok(ResolvedStream {
            path: path.clone(),
            origin: Origin::LargeObject,
            source_url,
            body,
        })
    }

    /// Metadata lookup followed by the raw download.
    async fn open_direct(
        &self,
        path: &ResourcePath,
        progress: &mut Progress,
    ) -> Result<RawContent, ResolveError> {
        let metadata = self
            .forge
            .file_metadata(path)
            .await
            .map_err(|e| UpstreamStage::Metadata { path: path.as_str() }.wrap(e))?;
        debug!(
            download_url = %metadata.download_url,
            size = metadata.size,
            content_type = metadata.content_type_hint,
            "metadata"
        );
        progress.advance(Stage::MetadataFetched);

        let raw = self
            .forge
            .open(&metadata.download_url)
            .await
            .map_err(|e| UpstreamStage::Content.wrap(e))?;
        progress.advance(Stage::ContentFetched);
        Ok(raw)
    }

    async fn open_large_object(&self, path: &ResourcePath) -> Result<RawContent, ResolveError> {
        let url = self
            .forge
            .large_object_url(path)
            .map_err(|e| UpstreamStage::LargeObject.wrap(e))?;
        debug!(url = %url, "redirecting to large object");
        self.forge
            .open(&url)
            .await
            .map_err(|e| UpstreamStage::LargeObject.wrap(e))
    }

    async fn drain(
        &self,
        raw: RawContent,
        stage: UpstreamStage<'_>,
    ) -> Result<Bytes, ResolveError> {
        fetch::drain(raw, self.options.max_document_bytes)
            .await
            .map_err(|e| match e {
                FetchError::Forge(err) => stage.wrap(err),
                FetchError::TooLarge { url, limit } => {
                    ResolveError::DocumentTooLarge { url, limit }
                }
            })
    }
}

fn invalid_pointer(path: &ResourcePath, err: PointerError) -> ResolveError {
    ResolveError::InvalidPointerFormat {
        path: path.to_string(),
        reason: err.to_string(),
    }
}

/// Strip a leading BOM and check the rest parses as JSON.
///
/// The document is not deserialized into a value; `IgnoredAny` only walks
/// the syntax, and the original bytes are returned untouched.
fn validate_json(url: &str, bytes: Bytes) -> Result<Bytes, ResolveError> {
    let body = if bytes.starts_with(UTF8_BOM) {
        bytes.slice(UTF8_BOM.len()..)
    } else {
        bytes
    };

    serde_json::from_slice::<IgnoredAny>(&body).map_err(|e| {
        ResolveError::InvalidDocumentFormat {
            url: url.to_string(),
            message: e.to_string(),
        }
    })?;
    Ok(body)
}

/// Map a raw body into a document stream, logging a mid-stream failure.
fn relay(content: RawContent, stage: UpstreamStage<'static>) -> DocumentStream {
    let RawContent { url, body } = content;
    let span = tracing::Span::current();
    Box::pin(body.map(move |chunk| {
        chunk.map_err(|err| {
            let err = stage.wrap(err);
            span.in_scope(|| {
                tracing::error!(url = %url, error = %err, "stream failed after headers were sent")
            });
            err
        })
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::mock::MockForge;
    use crate::forge::ForgeError;

    const FEATURES: &str = r#"{"type":"FeatureCollection","features":[]}"#;

    fn resolver(forge: MockForge) -> Resolver {
        Resolver::new(Arc::new(forge), ResolveOptions::default())
    }

    fn path(raw: &str) -> ResourcePath {
        ResourcePath::new(raw).unwrap()
    }

    mod validate {
        use super::*;

        #[test]
        fn bom_is_stripped() {
            let mut bytes = UTF8_BOM.to_vec();
            bytes.extend_from_slice(b"[1,2]");
            let body = validate_json("u", Bytes::from(bytes)).unwrap();
            assert_eq!(&body[..], b"[1,2]");
        }

        #[test]
        fn bytes_are_returned_unchanged() {
            let raw = "{ \"b\" : 1,\n  \"a\": [ 2 ] }";
            let body = validate_json("u", Bytes::from(raw)).unwrap();
            assert_eq!(&body[..], raw.as_bytes());
        }

        #[test]
        fn trailing_garbage_rejected() {
            let err = validate_json("u", Bytes::from_static(b"{} x")).unwrap_err();
            assert_eq!(err.kind(), "InvalidDocumentFormat");
        }

        #[test]
        fn empty_body_rejected() {
            assert!(validate_json("u", Bytes::new()).is_err());
        }
    }

    mod stages {
        use super::*;

        #[test]
        fn stages_are_ordered() {
            assert!(Stage::Start < Stage::PathResolved);
            assert!(Stage::Classifying < Stage::PointerDetected);
            assert!(Stage::RedirectedContentFetched < Stage::Responded);
            assert!(Stage::LiteralContent < Stage::Responded);
        }

        #[test]
        fn progress_advances() {
            let mut progress = Progress::new();
            progress.advance(Stage::PathResolved);
            progress.advance(Stage::MetadataFetched);
            assert_eq!(progress.stage, Stage::MetadataFetched);
        }
    }

    #[tokio::test]
    async fn literal_document_resolves() {
        let forge = MockForge::new().with_file("a.geojson", FEATURES);
        let doc = resolver(forge).resolve(&path("a.geojson")).await.unwrap();
        assert_eq!(doc.origin, Origin::Literal);
        assert_eq!(&doc.body[..], FEATURES.as_bytes());
        assert_eq!(doc.source_url, "https://raw.mock/main/a.geojson");
    }

    #[tokio::test]
    async fn list_maps_status_to_metadata_error() {
        let forge = MockForge::new();
        let err = resolver(forge).list(Some(&path("nope"))).await.unwrap_err();
        assert!(matches!(
            err,
            ResolveError::UpstreamMetadata { status: 404, .. }
        ));
    }

    #[tokio::test]
    async fn stream_error_before_headers_is_returned() {
        let forge = MockForge::new()
            .with_file("a.json", FEATURES)
            .fail_on(crate::forge::mock::FailOn::Open {
                url: "https://raw.mock/main/a.json".to_string(),
                error: ForgeError::Status {
                    url: "https://raw.mock/main/a.json".to_string(),
                    status: 403,
                    body: String::new(),
                },
            });
        let err = resolver(forge)
            .resolve_stream(&path("a.json"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ResolveError::UpstreamContent {
                url: "https://raw.mock/main/a.json".to_string(),
                status: 403,
            }
        );
    }

    #[tokio::test]
    async fn deliver_dispatches_on_mode() {
        let forge = MockForge::new().with_file("a.json", FEATURES);
        let resolver = resolver(forge);
        assert!(matches!(
            resolver
                .deliver(&path("a.json"), DeliveryMode::Buffered)
                .await
                .unwrap(),
            Delivery::Buffered(_)
        ));
        assert!(matches!(
            resolver
                .deliver(&path("a.json"), DeliveryMode::Streaming)
                .await
                .unwrap(),
            Delivery::Streaming(_)
        ));
    }
}
