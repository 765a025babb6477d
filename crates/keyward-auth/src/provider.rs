//! Authentication provider contract and mode dispatch

use async_trait::async_trait;
use keyward_core::{AuthMode, Credentials, Error, Identity, IdentitySource, Result};
use std::sync::Arc;
use tracing::debug;

/// Uniform identity lookup and authentication over one backend
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Backend this provider answers for
    fn source(&self) -> IdentitySource;

    /// Find a user by username. `Error::NotFound` when absent.
    async fn search_user(&self, username: &str) -> Result<Identity>;

    /// Verify credentials. `Error::AuthFailed` on a wrong secret.
    async fn authenticate(&self, credentials: &Credentials) -> Result<Identity>;
}

/// Chooses the provider for an authentication mode.
///
/// Providers are registered explicitly; resolving a mode with no provider
/// is a configuration error rather than a fallback to some default.
#[derive(Clone, Default)]
pub struct ProviderSelector {
    db: Option<Arc<dyn AuthProvider>>,
    ldap: Option<Arc<dyn AuthProvider>>,
}

impl ProviderSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_db(mut self, provider: Arc<dyn AuthProvider>) -> Self {
        self.db = Some(provider);
        self
    }

    pub fn with_ldap(mut self, provider: Arc<dyn AuthProvider>) -> Self {
        self.ldap = Some(provider);
        self
    }

    pub fn resolve(&self, mode: AuthMode) -> Result<Arc<dyn AuthProvider>> {
        let provider = match mode {
            AuthMode::Db => self.db.as_ref(),
            AuthMode::Ldap => self.ldap.as_ref(),
        };

        debug!("Resolved auth mode {}", mode);

        provider
            .cloned()
            .ok_or_else(|| Error::ConfigInvalid(format!("no provider configured for {}", mode)))
    }

    /// Resolve a mode given by name, e.g. `"ldap_auth"`
    pub fn resolve_named(&self, mode: &str) -> Result<Arc<dyn AuthProvider>> {
        self.resolve(mode.parse()?)
    }
}
