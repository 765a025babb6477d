//! Local database authentication

use crate::provider::AuthProvider;
use async_trait::async_trait;
use keyward_core::{canonical_username, Credentials, Error, Identity, IdentitySource, Result};
use keyward_crypto::{HashAlgorithm, PasswordHash, Pbkdf2Verifier, SecretVerifier};
use keyward_metadata::IdentityRepository;
use std::sync::Arc;
use tracing::{debug, info};

/// Authenticates against identities kept in the local store
pub struct DbAuthProvider {
    store: Arc<dyn IdentityRepository>,
    verifier: Arc<dyn SecretVerifier>,
}

impl DbAuthProvider {
    pub fn new(store: Arc<dyn IdentityRepository>, verifier: Arc<dyn SecretVerifier>) -> Self {
        Self { store, verifier }
    }

    /// Provider using the PBKDF2 verifier
    pub fn with_store(store: Arc<dyn IdentityRepository>) -> Self {
        Self::new(store, Arc::new(Pbkdf2Verifier))
    }

    /// Create a local account with a freshly salted password.
    ///
    /// The record and its password are written together, so a failed
    /// registration leaves nothing behind. Fails with `Error::Conflict` if
    /// the username is taken.
    pub async fn register(&self, identity: &Identity, secret: &str) -> Result<Identity> {
        let username = canonical_username(&identity.username)
            .ok_or_else(|| Error::ConfigInvalid("username cannot be blank".to_string()))?;
        let identity = Identity {
            username: username.to_string(),
            source: IdentitySource::Db,
            external_uid: None,
            ..identity.clone()
        };

        let password = PasswordHash::new(secret, HashAlgorithm::default());
        let created = self.store.insert_with_password(&identity, &password).await?;

        info!("Registered local user: {}", created.username);
        Ok(created)
    }
}

#[async_trait]
impl AuthProvider for DbAuthProvider {
    fn source(&self) -> IdentitySource {
        IdentitySource::Db
    }

    async fn search_user(&self, username: &str) -> Result<Identity> {
        let key = canonical_username(username)
            .ok_or_else(|| Error::NotFound(username.to_string()))?;
        self.store
            .get_by_username(key)
            .await?
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<Identity> {
        let username = credentials.principal().ok_or(Error::AuthFailed)?;

        let identity = match self.store.get_by_username(username).await? {
            Some(identity) => identity,
            None => {
                debug!("Local login for unknown user: {}", username);
                return Err(Error::AuthFailed);
            }
        };

        let stored = match self.store.get_password(username).await? {
            Some(stored) => stored,
            None => {
                debug!("No local password for: {}", username);
                return Err(Error::AuthFailed);
            }
        };

        if !self.verifier.verify(&credentials.secret, &stored) {
            debug!("Local password mismatch for: {}", username);
            return Err(Error::AuthFailed);
        }

        Ok(identity)
    }
}
