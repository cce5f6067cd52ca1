//! resolve::pointer
//!
//! Git LFS pointer record detection.
//!
//! A pointer record is a short text file standing in for a large object:
//!
//! ```text
//! version https://git-lfs.github.com/spec/v1
//! oid sha256:4d7a214614ab2935c943f9e0ff69d22eadbb8f32b1258daaa5e2ca24d17e2393
//! size 12345
//! ```
//!
//! Classification is decided by the signature line alone. Once content is
//! known to be a pointer candidate, a missing or malformed `oid` line is an
//! error rather than a fallback to literal content.

use std::sync::OnceLock;

use regex::Regex;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// First line of every LFS pointer record.
pub const POINTER_SIGNATURE: &str = "version https://git-lfs.github.com/spec/v1";

/// Largest body still considered a pointer record.
pub const MAX_POINTER_BYTES: usize = 1024;

/// Errors from parsing a pointer candidate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PointerError {
    #[error("no 'oid sha256:<hex>' line found")]
    MissingOid,

    #[error("pointer record is not valid UTF-8")]
    NotUtf8,

    #[error("pointer record exceeds {MAX_POINTER_BYTES} bytes")]
    TooLarge,
}

/// Parsed LFS pointer record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerRecord {
    /// Lowercase hex digest following `sha256:`
    pub oid: String,
    /// Declared object size, when the record has a `size` line
    pub size: Option<u64>,
}

/// Result of classifying fetched bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Real content; deliver as-is.
    Literal,
    /// A pointer record; the real bytes live on the large-object host.
    Pointer(PointerRecord),
}

/// Integrity mismatch between a pointer record and fetched bytes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("expected {expected}, got {actual}")]
pub struct IntegrityMismatch {
    pub expected: String,
    pub actual: String,
}

fn oid_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?m)^oid sha256:([0-9a-fA-F]+)").expect("oid pattern compiles")
    })
}

fn size_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?m)^size ([0-9]+)").expect("size pattern compiles"))
}

/// Whether `bytes` begin with the pointer signature.
///
/// Only meaningful once at least `POINTER_SIGNATURE.len()` bytes are
/// available or the body has ended; a shorter prefix is never a candidate.
pub fn is_pointer_candidate(bytes: &[u8]) -> bool {
    bytes.starts_with(POINTER_SIGNATURE.as_bytes())
}

/// Classify a complete body.
///
/// # Errors
///
/// Returns a `PointerError` when the body starts with the signature but is
/// not a well-formed pointer record.
pub fn classify(bytes: &[u8]) -> Result<Classification, PointerError> {
    if !is_pointer_candidate(bytes) {
        return Ok(Classification::Literal);
    }
    parse_record(bytes).map(Classification::Pointer)
}

/// Parse a pointer candidate into its record.
///
/// The caller has already established that `bytes` start with the
/// signature; this only extracts the `oid` and `size` fields.
pub fn parse_record(bytes: &[u8]) -> Result<PointerRecord, PointerError> {
    if bytes.len() > MAX_POINTER_BYTES {
        return Err(PointerError::TooLarge);
    }
    let text = std::str::from_utf8(bytes).map_err(|_| PointerError::NotUtf8)?;

    let oid = oid_pattern()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
        .ok_or(PointerError::MissingOid)?;

    let size = size_pattern()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok());

    Ok(PointerRecord { oid, size })
}

impl PointerRecord {
    /// Check fetched large-object bytes against this record.
    ///
    /// The declared size is checked first (when present), then the SHA-256
    /// digest.
    pub fn verify(&self, bytes: &[u8]) -> Result<(), IntegrityMismatch> {
        if let Some(size) = self.size {
            let actual = bytes.len() as u64;
            if actual != size {
                return Err(IntegrityMismatch {
                    expected: format!("size {size}"),
                    actual: format!("size {actual}"),
                });
            }
        }

        let digest = hex::encode(Sha256::digest(bytes));
        if digest != self.oid {
            return Err(IntegrityMismatch {
                expected: format!("sha256:{}", self.oid),
                actual: format!("sha256:{digest}"),
            });
        }
        Ok(())
    }
}
