//! Architecture enforcement tests.
//!
//! The layering rules below keep the credential confined to the forge and
//! keep the resolution pipeline independent of any particular transport or
//! HTTP framework. These tests ensure violations are caught in CI.
//!
//! # Test Categories
//!
//! 1. **Credential Confinement** - Only the credential wrapper and the GitHub
//!    forge may read the raw token
//! 2. **Pipeline Isolation** - `resolve/` talks to upstream only through the
//!    `Forge` trait and knows nothing about axum
//! 3. **Logging Hygiene** - No tracing call site records a credential

use std::fs;
use std::path::{Path, PathBuf};

/// Files allowed to call `Credential::expose` or `Credential::bearer`.
const CREDENTIAL_READERS: &[&str] = &["src/core/credential.rs", "src/forge/github.rs"];

/// Crates the pipeline must not depend on directly.
const PIPELINE_FORBIDDEN: &[&str] = &["reqwest", "axum", "tower_http", "crate::server"];

/// Every `.rs` file under `dir`, recursively.
fn rust_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).unwrap_or_else(|_| panic!("Failed to read {}", dir.display())) {
        let path = entry.expect("Failed to read entry").path();
        if path.is_dir() {
            files.extend(rust_files(&path));
        } else if path.extension().map(|e| e == "rs").unwrap_or(false) {
            files.push(path);
        }
    }
    files.sort();
    files
}

/// Source text before the first `#[cfg(test)]`, so unit tests are exempt.
fn production_source(path: &Path) -> String {
    let content =
        fs::read_to_string(path).unwrap_or_else(|_| panic!("Failed to read {}", path.display()));
    match content.find("#[cfg(test)]") {
        Some(idx) => content[..idx].to_string(),
        None => content,
    }
}

fn normalized(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

// =============================================================================
// Credential Confinement
// =============================================================================

#[test]
fn only_the_forge_reads_the_raw_credential() {
    let mut violations = Vec::new();

    for path in rust_files(Path::new("src")) {
        let name = normalized(&path);
        if CREDENTIAL_READERS.contains(&name.as_str()) {
            continue;
        }
        let source = production_source(&path);
        for (lineno, line) in source.lines().enumerate() {
            let code = line.trim_start();
            if code.starts_with("//") {
                continue;
            }
            if code.contains(".expose()") || code.contains(".bearer()") {
                violations.push(format!("{}:{}: {}", name, lineno + 1, code));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Raw credential read outside the forge:\n{}",
        violations.join("\n")
    );
}

#[test]
fn credential_readers_exist() {
    // Guards against the allowlist silently going stale after a move.
    for file in CREDENTIAL_READERS {
        assert!(Path::new(file).exists(), "{} no longer exists", file);
    }
}

// =============================================================================
// Pipeline Isolation
// =============================================================================

#[test]
fn pipeline_does_not_depend_on_transport_or_framework() {
    let mut violations = Vec::new();

    for path in rust_files(Path::new("src/resolve")) {
        let source = production_source(&path);
        for forbidden in PIPELINE_FORBIDDEN {
            if source.contains(&format!("use {forbidden}"))
                || source.contains(&format!("{forbidden}::"))
            {
                violations.push(format!("{}: references {}", normalized(&path), forbidden));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "resolve/ must go through the Forge trait:\n{}",
        violations.join("\n")
    );
}

#[test]
fn forge_does_not_depend_on_server() {
    let mut violations = Vec::new();

    for path in rust_files(Path::new("src/forge")) {
        let source = production_source(&path);
        if source.contains("crate::server") || source.contains("use axum") {
            violations.push(normalized(&path));
        }
    }

    assert!(
        violations.is_empty(),
        "forge/ must not know about the HTTP surface:\n{}",
        violations.join("\n")
    );
}

// =============================================================================
// Logging Hygiene
// =============================================================================

#[test]
fn tracing_fields_never_name_the_credential() {
    let mut violations = Vec::new();

    for path in rust_files(Path::new("src")) {
        let source = production_source(&path);
        for (lineno, line) in source.lines().enumerate() {
            let code = line.trim();
            let is_log = ["debug!(", "info!(", "warn!(", "error!(", "trace!(", "_span!("]
                .iter()
                .any(|m| code.contains(m));
            if is_log && (code.contains("credential") || code.contains("token")) {
                violations.push(format!("{}:{}: {}", normalized(&path), lineno + 1, code));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Log call sites mention the credential:\n{}",
        violations.join("\n")
    );
}
