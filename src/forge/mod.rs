//! forge
//!
//! Abstraction for the hosted repository the relay reads from.
//!
//! # Architecture
//!
//! The `Forge` trait covers the three upstream endpoints the resolver talks
//! to: the content index (metadata and listings), raw downloads, and the
//! large-object media host. The resolver only ever sees `dyn Forge`, so
//! tests swap in [`mock::MockForge`] and the binary wires up
//! [`github::GitHubForge`].
//!
//! # Modules
//!
//! - `traits`: Core `Forge` trait, `ForgeError`, and the metadata types
//! - [`github`]: GitHub contents API + media host implementation
//! - [`mock`]: Mock implementation for deterministic testing
//!
//! # Example
//!
//! ```ignore
//! use geojson_relay::forge::{github::GitHubForge, Forge};
//!
//! let forge = GitHubForge::new(&config.upstream);
//! let entries = forge.list_directory(None).await?;
//! for entry in entries {
//!     println!("{} ({:?})", entry.path, entry.kind);
//! }
//! ```

pub mod github;
pub mod mock;
mod traits;

pub use traits::*;
