//! Identity repository trait
//!
//! Defines the interface for durable identity storage.
//! The SQLite implementation lives in `repository`.

use async_trait::async_trait;
use keyward_core::types::Identity;
use keyward_core::Result;
use keyward_crypto::PasswordHash;

/// Identity repository trait
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    // ============= Identity Operations =============

    /// Look up an identity by its exact username
    async fn get_by_username(&self, username: &str) -> Result<Option<Identity>>;

    /// Insert a new identity atomically.
    ///
    /// Fails with `Error::Conflict` when the username already exists; any
    /// other failure is `Error::StoreUnavailable`.
    async fn insert_if_absent(&self, identity: &Identity) -> Result<Identity>;

    /// All stored identities ordered by username
    async fn list_identities(&self) -> Result<Vec<Identity>>;

    // ============= Password Operations =============

    /// Stored password material for local accounts
    async fn get_password(&self, username: &str) -> Result<Option<PasswordHash>>;

    /// Insert a new identity together with its password material as one
    /// atomic write. Same conflict rules as `insert_if_absent`.
    async fn insert_with_password(
        &self,
        identity: &Identity,
        password: &PasswordHash,
    ) -> Result<Identity>;
}
