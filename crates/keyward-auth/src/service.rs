//! Authentication service
//!
//! Entry point used by callers: dispatches to the provider for the active
//! mode, onboards identities and runs connection tests.

use crate::db::DbAuthProvider;
use crate::ldap::{ConnectionReport, ConnectionTester, DirectoryClient, LdapAuthProvider};
use crate::onboard::OnboardingReconciler;
use crate::provider::{AuthProvider, ProviderSelector};
use keyward_core::{
    ConfigProvider, Credentials, DirectoryConfig, Error, Identity, IdentitySource, Result,
    RESERVED_ADMIN,
};
use keyward_metadata::IdentityRepository;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct AuthService {
    config: Arc<dyn ConfigProvider>,
    selector: ProviderSelector,
    db: Arc<DbAuthProvider>,
    store: Arc<dyn IdentityRepository>,
    reconciler: OnboardingReconciler,
    tester: ConnectionTester,
}

impl AuthService {
    /// Wire up both providers over the given collaborators
    pub fn build(
        config: Arc<dyn ConfigProvider>,
        store: Arc<dyn IdentityRepository>,
        client: DirectoryClient,
    ) -> Self {
        let db = Arc::new(DbAuthProvider::with_store(store.clone()));
        let ldap = Arc::new(LdapAuthProvider::new(client.clone(), config.clone()));

        let selector = ProviderSelector::new()
            .with_db(db.clone())
            .with_ldap(ldap);

        Self {
            config,
            selector,
            db,
            reconciler: OnboardingReconciler::new(store.clone()),
            store,
            tester: ConnectionTester::new(client),
        }
    }

    /// Provider for the currently configured mode
    pub fn active_provider(&self) -> Result<Arc<dyn AuthProvider>> {
        self.selector.resolve(self.config.auth_mode()?)
    }

    pub async fn search_user(&self, username: &str) -> Result<Identity> {
        self.active_provider()?.search_user(username).await
    }

    /// Verify credentials. The reserved administrator always goes to the
    /// local store whatever the mode.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<Identity> {
        let username = credentials.principal().ok_or(Error::AuthFailed)?;

        if username == RESERVED_ADMIN {
            debug!("Reserved user, authenticating locally");
            return self.db.authenticate(credentials).await;
        }

        let identity = self.active_provider()?.authenticate(credentials).await?;
        if is_foreign_admin(&identity) {
            warn!("Refusing {} identity named {}", identity.source, RESERVED_ADMIN);
            return Err(Error::AuthFailed);
        }
        Ok(identity)
    }

    /// Make `identity` durable. A non-local identity can never take the
    /// reserved administrator's name.
    pub async fn on_board_user(&self, identity: &Identity) -> Result<Identity> {
        if is_foreign_admin(identity) {
            warn!("Refusing to onboard {} identity named {}", identity.source, RESERVED_ADMIN);
            return Err(Error::Conflict(format!("{} is reserved", RESERVED_ADMIN)));
        }
        self.reconciler.on_board_user(identity).await
    }

    /// Authenticate, then return the durable local record
    pub async fn login(&self, credentials: &Credentials) -> Result<Identity> {
        let identity = self.authenticate(credentials).await?;
        let durable = self.on_board_user(&identity).await?;
        info!("User logged in: {} ({})", durable.username, durable.source);
        Ok(durable)
    }

    pub async fn test_connection(&self, candidate: &DirectoryConfig) -> Result<ConnectionReport> {
        self.tester.test_connection(candidate).await
    }

    /// Create a local account
    pub async fn register(&self, identity: &Identity, secret: &str) -> Result<Identity> {
        self.db.register(identity, secret).await
    }

    pub async fn list_users(&self) -> Result<Vec<Identity>> {
        self.store.list_identities().await
    }
}

fn is_foreign_admin(identity: &Identity) -> bool {
    identity.source != IdentitySource::Db && identity.username == RESERVED_ADMIN
}
