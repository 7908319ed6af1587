//! SG Weather common library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, artifact identity derivation, content hashing and logging
//! used by every crate in the workspace.
//!
//! # Overview
//!
//! - **Types**: [`Identity`], [`DataKind`], [`MetadataEntry`], [`BatchResult`]
//! - **Identity**: parsing of `<YYYYMMDD>_<parameter>.<ext>` artifact names
//! - **Checksums**: streaming SHA-256 content hashes of raw source bytes
//! - **Logging**: `tracing` subscriber setup shared by the binaries
//!
//! # Example
//!
//! ```no_run
//! use sgw_common::{checksum::ContentHash, types::{DataKind, Identity}};
//!
//! fn describe(path: &str) -> sgw_common::Result<()> {
//!     let identity = Identity::from_source(path, DataKind::Reading, "temperature")?;
//!     let hash = ContentHash::from_file(path)?;
//!     tracing::info!(%identity, %hash, "Derived artifact identity");
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod identity;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{Result, SgwError};
pub use types::{BatchResult, DataKind, FailedRecord, Identity, MetadataEntry};
