//! forge::github
//!
//! GitHub forge implementation using the REST contents API and the
//! large-object media host.
//!
//! # Endpoints
//!
//! - metadata: `{api_base}/repos/{owner}/{repo}/contents/{path}?ref={branch}`
//! - raw bytes: the `download_url` reported by the metadata call
//! - large objects: `{media_base}/{owner}/{repo}/{branch}/{path}`
//!
//! Path segments are percent-escaped by [`url::Url`], never by string
//! concatenation.
//!
//! # Timeouts
//!
//! Every request is bounded by the configured timeout, and so is the wait
//! for each body chunk. Expiry surfaces as `ForgeError::Timeout`.
//!
//! # Example
//!
//! ```ignore
//! use geojson_relay::forge::github::GitHubForge;
//! use geojson_relay::forge::Forge;
//!
//! let forge = GitHubForge::new(&config.upstream);
//! let path = ResourcePath::new("geojson/province/sichuan.geojson")?;
//! let meta = forge.file_metadata(&path).await?;
//! let raw = forge.open(&meta.download_url).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response};
use serde::Deserialize;
use tokio_stream::StreamExt as _;
use url::Url;

use super::traits::{
    content_type_for, ByteStream, DirectoryEntry, EntryKind, FileMetadata, Forge, ForgeError,
    RawContent,
};
use crate::core::config::UpstreamConfig;
use crate::core::credential::Credential;
use crate::core::types::{BranchName, ResourcePath};

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = concat!("geojson-relay/", env!("CARGO_PKG_VERSION"));

/// Accept header for the contents API.
const CONTENTS_ACCEPT: &str = "application/vnd.github+json";

/// REST API version pinned for the contents endpoint.
const API_VERSION: &str = "2022-11-28";

/// Longest error body kept for diagnostics, in bytes.
const MAX_ERROR_BODY: usize = 2048;

/// GitHub forge implementation.
///
/// Holds only immutable configuration and a pooled [`Client`]; one instance
/// is shared by every request.
#[derive(Debug, Clone)]
pub struct GitHubForge {
    /// HTTP client for making requests
    client: Client,
    /// Repository owner (user or organization)
    owner: String,
    /// Repository name
    repo: String,
    /// Branch every lookup resolves against
    branch: BranchName,
    /// Contents API base URL
    api_base: Url,
    /// Large-object media base URL
    media_base: Url,
    /// Bound on each call and each streamed chunk
    timeout: Duration,
    /// Bearer credential (redacted in `Debug`)
    credential: Credential,
}

impl GitHubForge {
    /// Create a forge from upstream configuration.
    pub fn new(config: &UpstreamConfig) -> Self {
        Self {
            client: Client::new(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            branch: config.branch.clone(),
            api_base: config.api_base.clone(),
            media_base: config.media_base.clone(),
            timeout: config.timeout,
            credential: config.credential.clone(),
        }
    }

    /// Get the repository owner.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Get the repository name.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Build headers for a request.
    fn headers(&self, url: &str, accept: &'static str) -> Result<HeaderMap, ForgeError> {
        let mut authorization =
            HeaderValue::from_str(&self.credential.bearer()).map_err(|_| ForgeError::Format {
                url: url.to_string(),
                message: "credential is not a valid header value".to_string(),
            })?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));
        Ok(headers)
    }

    /// Append path segments to a base URL.
    fn join_segments<'a>(
        base: &Url,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url, ForgeError> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| ForgeError::Format {
                url: base.to_string(),
                message: "base URL cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Build the contents API URL for a path (root when `None`).
    fn contents_url(&self, path: Option<&ResourcePath>) -> Result<Url, ForgeError> {
        let prefix = ["repos", self.owner.as_str(), self.repo.as_str(), "contents"];
        let mut url = Self::join_segments(
            &self.api_base,
            prefix
                .into_iter()
                .chain(path.into_iter().flat_map(|p| p.segments())),
        )?;
        url.query_pairs_mut().append_pair("ref", self.branch.as_str());
        Ok(url)
    }

    /// Send a GET, bounded by the timeout, and reject non-success statuses.
    async fn get(&self, url: &str, accept: &'static str) -> Result<Response, ForgeError> {
        let request = self.client.get(url).headers(self.headers(url, accept)?);

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| ForgeError::Timeout {
                url: url.to_string(),
            })?
            .map_err(|e| map_transport_error(url, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // The body is diagnostics only; a failure reading it must not hide the status.
        let body = match tokio::time::timeout(self.timeout, response.text()).await {
            Ok(Ok(text)) => truncate(text, MAX_ERROR_BODY),
            _ => String::new(),
        };
        tracing::debug!(%url, status = status.as_u16(), "upstream returned error status");

        Err(ForgeError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    /// GET a contents API URL and parse the JSON body.
    async fn get_contents(&self, url: &Url) -> Result<serde_json::Value, ForgeError> {
        let url = url.as_str();
        let response = self.get(url, CONTENTS_ACCEPT).await?;
        let bytes = tokio::time::timeout(self.timeout, response.bytes())
            .await
            .map_err(|_| ForgeError::Timeout {
                url: url.to_string(),
            })?
            .map_err(|e| map_transport_error(url, e))?;

        serde_json::from_slice(&bytes).map_err(|e| ForgeError::Format {
            url: url.to_string(),
            message: format!("response is not JSON: {e}"),
        })
    }
}

#[async_trait]
impl Forge for GitHubForge {
    fn name(&self) -> &'static str {
        "github"
    }

    fn branch(&self) -> &str {
        self.branch.as_str()
    }

    async fn file_metadata(&self, path: &ResourcePath) -> Result<FileMetadata, ForgeError> {
        let url = self.contents_url(Some(path))?;
        let value = self.get_contents(&url).await?;

        if value.is_array() {
            return Err(ForgeError::Format {
                url: url.to_string(),
                message: format!("'{path}' is a directory, not a file"),
            });
        }

        let entry: GitHubContentEntry =
            serde_json::from_value(value).map_err(|e| ForgeError::Format {
                url: url.to_string(),
                message: format!("unrecognized metadata: {e}"),
            })?;

        let download_url = entry.download_url.ok_or_else(|| ForgeError::Format {
            url: url.to_string(),
            message: format!("metadata for '{path}' has no download_url"),
        })?;

        Ok(FileMetadata {
            name: entry.name,
            sha: entry.sha,
            size: entry.size,
            download_url,
            content_type_hint: content_type_for(path),
        })
    }

    async fn list_directory(
        &self,
        path: Option<&ResourcePath>,
    ) -> Result<Vec<DirectoryEntry>, ForgeError> {
        let url = self.contents_url(path)?;
        let value = self.get_contents(&url).await?;

        if !value.is_array() {
            return Err(ForgeError::Format {
                url: url.to_string(),
                message: "path is a file, not a directory".to_string(),
            });
        }

        let entries: Vec<GitHubContentEntry> =
            serde_json::from_value(value).map_err(|e| ForgeError::Format {
                url: url.to_string(),
                message: format!("unrecognized directory listing: {e}"),
            })?;

        Ok(entries.into_iter().map(DirectoryEntry::from).collect())
    }

    async fn open(&self, url: &str) -> Result<RawContent, ForgeError> {
        let response = self.get(url, "*/*").await?;

        let source = url.to_string();
        let body = response
            .bytes_stream()
            .timeout(self.timeout)
            .map(move |item| match item {
                Ok(Ok(chunk)) => Ok(chunk),
                Ok(Err(e)) => Err(map_transport_error(&source, e)),
                Err(_) => Err(ForgeError::Timeout {
                    url: source.clone(),
                }),
            });
        let body: ByteStream = Box::pin(body);

        Ok(RawContent {
            url: url.to_string(),
            body,
        })
    }

    fn large_object_url(&self, path: &ResourcePath) -> Result<String, ForgeError> {
        let segments = [self.owner.as_str(), self.repo.as_str()]
            .into_iter()
            .chain(self.branch.as_str().split('/'))
            .chain(path.segments());
        Ok(Self::join_segments(&self.media_base, segments)?.into())
    }
}

/// Map a reqwest error, keeping timeouts distinguishable.
fn map_transport_error(url: &str, err: reqwest::Error) -> ForgeError {
    if err.is_timeout() {
        ForgeError::Timeout {
            url: url.to_string(),
        }
    } else {
        ForgeError::Network {
            url: url.to_string(),
            message: err.without_url().to_string(),
        }
    }
}

/// Cut a string to at most `max` bytes on a char boundary.
fn truncate(mut text: String, max: usize) -> String {
    if text.len() > max {
        let mut end = max;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    text
}

// --------------------------------------------------------------------------
// GitHub API response types
// --------------------------------------------------------------------------

/// One entry from the contents API (file object or directory array item).
#[derive(Debug, Deserialize)]
struct GitHubContentEntry {
    #[serde(rename = "type")]
    kind: String,
    name: String,
    path: String,
    #[serde(default)]
    sha: String,
    #[serde(default)]
    size: u64,
    download_url: Option<String>,
}

impl From<GitHubContentEntry> for DirectoryEntry {
    fn from(entry: GitHubContentEntry) -> Self {
        let kind = match entry.kind.as_str() {
            "dir" => EntryKind::Dir,
            "symlink" => EntryKind::Symlink,
            "submodule" => EntryKind::Submodule,
            _ => EntryKind::File,
        };

        DirectoryEntry {
            name: entry.name,
            path: entry.path,
            kind,
            size: entry.size,
            download_url: entry.download_url,
        }
    }
}
