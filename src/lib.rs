//! geojson-relay - Serve GeoJSON from a GitHub repository, following Git LFS pointers
//!
//! The relay turns a repository path into a materialized JSON document. It
//! hides three storage quirks from its caller: files sit behind the GitHub
//! contents API rather than being fetched directly, large files may be Git
//! LFS pointer records, and the final bytes must be JSON no matter which
//! upstream served them.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, runs commands)
//! - [`server`] - HTTP routes, error envelope and server lifecycle
//! - [`resolve`] - The resolution pipeline: fetch, classify, redirect, validate
//! - [`forge`] - Abstraction over the upstream repository host (GitHub)
//! - [`core`] - Domain types, credential handling and configuration
//!
//! # Invariants
//!
//! 1. A pointer record is never delivered as the document
//! 2. A pointer triggers exactly one large-object fetch
//! 3. A failed metadata lookup triggers no content fetch
//! 4. Buffered responses are always syntactically valid JSON
//! 5. The bearer credential never appears in logs or error payloads

pub mod cli;
pub mod core;
pub mod forge;
pub mod resolve;
pub mod server;
