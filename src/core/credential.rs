//! core::credential
//!
//! Opaque bearer credential for upstream calls.
//!
//! The token value is only reachable through [`Credential::expose`], which
//! the forge calls when building the `Authorization` header. `Debug` and
//! `Display` never print it, so a credential can sit inside config structs
//! that are logged at start-up.
//!
//! # Example
//!
//! ```
//! use geojson_relay::core::credential::Credential;
//!
//! let credential = Credential::new("ghp_secret").unwrap();
//! assert!(!format!("{:?}", credential).contains("ghp_secret"));
//! assert_eq!(credential.expose(), "ghp_secret");
//! ```

use thiserror::Error;

/// Errors from credential construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("credential is empty")]
    Empty,

    #[error("credential contains characters not allowed in an HTTP header")]
    InvalidCharacters,
}

/// A bearer token with redacted formatting.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a token, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Fails when the token is empty or could not be sent as a header value.
    pub fn new(token: impl AsRef<str>) -> Result<Self, CredentialError> {
        let token = token.as_ref().trim();
        if token.is_empty() {
            return Err(CredentialError::Empty);
        }
        if !token.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(CredentialError::InvalidCharacters);
        }
        Ok(Self(token.to_string()))
    }

    /// The raw token.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

impl std::fmt::Display for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<redacted>")
    }
}
