//! core
//!
//! Core domain types and configuration for geojson-relay.
//!
//! # Modules
//!
//! - [`types`] - Strong types: ResourcePath, BranchName
//! - [`credential`] - The redacting bearer credential wrapper
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing
//! - Nothing here performs I/O except config file loading

pub mod config;
pub mod credential;
pub mod types;
