//! Keyward Core Library
//!
//! Core types, configuration, and errors shared by the Keyward
//! authentication crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::{AuthMode, ConfigProvider, KeywardConfig, SharedConfig};
pub use error::{ConnectionFailure, Error, Result};
pub use types::{canonical_username, Credentials, DirectoryConfig, Identity, IdentitySource, SearchScope};

/// Keyward version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Username always authenticated against the local store
pub const RESERVED_ADMIN: &str = "admin";
