//! core::types
//!
//! Strong types for the values that flow through a resolution request.
//!
//! # Types
//!
//! - [`ResourcePath`] - Normalized, repository-relative file path
//! - [`BranchName`] - Validated Git branch name used as the lookup ref
//!
//! # Validation
//!
//! These types enforce validity at construction time. A `ResourcePath` that
//! exists is always non-empty, relative, and free of `..` segments, so the
//! upstream adapters never have to re-check it.
//!
//! # Examples
//!
//! ```
//! use geojson_relay::core::types::{BranchName, ResourcePath};
//!
//! let path = ResourcePath::new("geojson//province/./sichuan.geojson").unwrap();
//! assert_eq!(path.as_str(), "geojson/province/sichuan.geojson");
//!
//! assert!(ResourcePath::new("").is_err());
//! assert!(ResourcePath::new("geojson/../secrets.json").is_err());
//! assert!(BranchName::new("main").is_ok());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Route under which documents are served; stripped by [`ResourcePath::strip_route`].
pub const GEOJSON_ROUTE: &str = "/api/geojson/";

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),
}

impl TypeError {
    fn path(path: &str, reason: impl Into<String>) -> Self {
        TypeError::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// A normalized, slash-separated, repository-relative path.
///
/// Normalization:
/// - leading and repeated slashes are collapsed
/// - `.` segments and a trailing slash are dropped
///
/// Rejected inputs:
/// - empty (after normalization)
/// - any `..` segment
/// - backslashes or control characters
///
/// # Example
///
/// ```
/// use geojson_relay::core::types::ResourcePath;
///
/// let path = ResourcePath::new("/geojson/china.geojson/").unwrap();
/// assert_eq!(path.as_str(), "geojson/china.geojson");
/// assert_eq!(path.file_name(), "china.geojson");
/// assert_eq!(path.extension(), Some("geojson"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourcePath(String);

impl ResourcePath {
    /// Normalize a captured path suffix.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidPath` if the path is empty or escapes the
    /// repository root.
    pub fn new(raw: &str) -> Result<Self, TypeError> {
        match Self::normalize(raw)? {
            Some(path) => Ok(path),
            None => Err(TypeError::path(raw, "path cannot be empty")),
        }
    }

    /// Normalize a full request path, removing `route` when it is a prefix.
    ///
    /// ```
    /// use geojson_relay::core::types::{ResourcePath, GEOJSON_ROUTE};
    ///
    /// let path = ResourcePath::strip_route("/api/geojson/a/b.json", GEOJSON_ROUTE).unwrap();
    /// assert_eq!(path.as_str(), "a/b.json");
    /// ```
    pub fn strip_route(raw: &str, route: &str) -> Result<Self, TypeError> {
        let relative = route.trim_start_matches('/');
        let rest = raw
            .strip_prefix(route)
            .or_else(|| raw.strip_prefix(relative))
            .unwrap_or(raw);
        Self::new(rest)
    }

    /// Normalize a directory path for listings.
    ///
    /// Unlike [`ResourcePath::new`], an empty path is accepted and means the
    /// repository root (`None`).
    pub fn directory(raw: &str) -> Result<Option<Self>, TypeError> {
        Self::normalize(raw)
    }

    fn normalize(raw: &str) -> Result<Option<Self>, TypeError> {
        if raw.chars().any(|c| c.is_control()) {
            return Err(TypeError::path(raw, "path cannot contain control characters"));
        }
        if raw.contains('\\') {
            return Err(TypeError::path(raw, "path cannot contain '\\'"));
        }

        let mut segments = Vec::new();
        for segment in raw.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    return Err(TypeError::path(raw, "path cannot contain '..' segments"));
                }
                s => segments.push(s),
            }
        }

        if segments.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self(segments.join("/"))))
    }

    /// Get the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// The final path segment.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Extension of the final segment, if any.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
            _ => None,
        }
    }
}

impl TryFrom<String> for ResourcePath {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<ResourcePath> for String {
    fn from(path: ResourcePath) -> Self {
        path.0
    }
}

impl std::fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourcePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A validated Git branch name.
///
/// Follows the subset of `git check-ref-format` rules that matter for a
/// value interpolated into API query strings and media URLs:
/// - Cannot be empty or exactly `@`
/// - Cannot start with `.`, `-` or `/`, nor end with `/` or `.lock`
/// - Cannot contain `..`, `@{`, `//`, whitespace, control characters,
///   or any of `~ ^ : \ ? * [`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` describing the first violated rule.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if let Some(reason) = Self::violation(&name) {
            return Err(TypeError::InvalidBranchName(format!("'{name}' {reason}")));
        }
        Ok(Self(name))
    }

    fn violation(name: &str) -> Option<&'static str> {
        const FORBIDDEN: [char; 7] = ['~', '^', ':', '\\', '?', '*', '['];

        if name.is_empty() {
            return Some("cannot be empty");
        }
        if name == "@" {
            return Some("cannot be '@'");
        }
        if name.starts_with(['.', '-', '/']) {
            return Some("cannot start with '.', '-' or '/'");
        }
        if name.ends_with('/') || name.ends_with(".lock") {
            return Some("cannot end with '/' or '.lock'");
        }
        if name.contains("..") || name.contains("@{") || name.contains("//") {
            return Some("cannot contain '..', '@{' or '//'");
        }
        if name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || FORBIDDEN.contains(&c))
        {
            return Some("contains a forbidden character");
        }
        if name.split('/').any(|component| component.starts_with('.')) {
            return Some("has a component starting with '.'");
        }
        None
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod resource_path {
        use super::*;

        #[test]
        fn keeps_canonical_path() {
            let path = ResourcePath::new("geojson/province/sichuan.geojson").unwrap();
            assert_eq!(path.as_str(), "geojson/province/sichuan.geojson");
        }

        #[test]
        fn collapses_slashes_and_dots() {
            let path = ResourcePath::new("//geojson/./province//sichuan.geojson/").unwrap();
            assert_eq!(path.as_str(), "geojson/province/sichuan.geojson");
        }

        #[test]
        fn rejects_empty() {
            assert!(matches!(
                ResourcePath::new(""),
                Err(TypeError::InvalidPath { .. })
            ));
            assert!(ResourcePath::new("/").is_err());
            assert!(ResourcePath::new("./.").is_err());
        }

        #[test]
        fn rejects_traversal() {
            let err = ResourcePath::new("geojson/../../etc/passwd").unwrap_err();
            assert!(err.to_string().contains(".."));
            assert!(ResourcePath::new("..").is_err());
        }

        #[test]
        fn allows_dots_inside_names() {
            let path = ResourcePath::new("data/v1..2/file..json").unwrap();
            assert_eq!(path.as_str(), "data/v1..2/file..json");
        }

        #[test]
        fn rejects_backslash_and_control() {
            assert!(ResourcePath::new("geojson\\..\\x.json").is_err());
            assert!(ResourcePath::new("geojson/\u{0}x.json").is_err());
            assert!(ResourcePath::new("geojson/x\n.json").is_err());
        }

        #[test]
        fn strip_route_removes_prefix_only_when_present() {
            let stripped = ResourcePath::strip_route("/api/geojson/china.json", GEOJSON_ROUTE);
            assert_eq!(stripped.unwrap().as_str(), "china.json");

            let relative = ResourcePath::strip_route("api/geojson/china.json", GEOJSON_ROUTE);
            assert_eq!(relative.unwrap().as_str(), "china.json");

            let untouched = ResourcePath::strip_route("geojson/china.json", GEOJSON_ROUTE);
            assert_eq!(untouched.unwrap().as_str(), "geojson/china.json");

            assert!(ResourcePath::strip_route("/api/geojson/", GEOJSON_ROUTE).is_err());
        }

        #[test]
        fn directory_allows_root() {
            assert_eq!(ResourcePath::directory("").unwrap(), None);
            assert_eq!(ResourcePath::directory("/").unwrap(), None);
            assert_eq!(
                ResourcePath::directory("geojson/").unwrap(),
                Some(ResourcePath::new("geojson").unwrap())
            );
            assert!(ResourcePath::directory("../x").is_err());
        }

        #[test]
        fn file_name_and_extension() {
            let path = ResourcePath::new("a/b/roads.geojson").unwrap();
            assert_eq!(path.file_name(), "roads.geojson");
            assert_eq!(path.extension(), Some("geojson"));

            let hidden = ResourcePath::new("a/.gitattributes").unwrap();
            assert_eq!(hidden.extension(), None);

            let bare = ResourcePath::new("README").unwrap();
            assert_eq!(bare.file_name(), "README");
            assert_eq!(bare.extension(), None);
        }

        #[test]
        fn segments_iterate_in_order() {
            let path = ResourcePath::new("a/b/c.json").unwrap();
            assert_eq!(path.segments().collect::<Vec<_>>(), vec!["a", "b", "c.json"]);
        }

        #[test]
        fn serde_validates() {
            let ok: ResourcePath = serde_json::from_str("\"a/./b.json\"").unwrap();
            assert_eq!(ok.as_str(), "a/b.json");
            assert!(serde_json::from_str::<ResourcePath>("\"../b.json\"").is_err());
        }
    }

    mod branch_name {
        use super::*;

        #[test]
        fn valid_names() {
            for name in ["main", "master", "release/2024-01", "user@feature", "v1.2"] {
                assert!(BranchName::new(name).is_ok(), "{name} should be valid");
            }
        }

        #[test]
        fn invalid_names() {
            for name in [
                "",
                "@",
                ".hidden",
                "-flag",
                "trailing/",
                "branch.lock",
                "a..b",
                "a//b",
                "has space",
                "what?",
                "a/.b",
                "x@{y",
            ] {
                assert!(BranchName::new(name).is_err(), "{name:?} should be invalid");
            }
        }

        #[test]
        fn display_matches_input() {
            let name = BranchName::new("main").unwrap();
            assert_eq!(name.to_string(), "main");
            assert_eq!(name.as_str(), "main");
        }
    }
}
