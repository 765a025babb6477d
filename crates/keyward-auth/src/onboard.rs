//! Onboarding of provider identities into the local store

use keyward_core::{Error, Identity, Result};
use keyward_metadata::IdentityRepository;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Makes an identity durable in the local store, idempotently.
///
/// Relies on the store's atomic insert: a conflicting insert means another
/// caller got there first, and the stored record wins. No in-process lock
/// is taken, so concurrent callers in different processes sharing one store
/// behave the same as concurrent tasks in this one.
#[derive(Clone)]
pub struct OnboardingReconciler {
    store: Arc<dyn IdentityRepository>,
}

impl OnboardingReconciler {
    pub fn new(store: Arc<dyn IdentityRepository>) -> Self {
        Self { store }
    }

    /// Return the durable record for `identity.username`, inserting it if absent.
    ///
    /// An existing record is returned unchanged; its `source` and
    /// `external_uid` are never overwritten.
    pub async fn on_board_user(&self, identity: &Identity) -> Result<Identity> {
        match self.store.insert_if_absent(identity).await {
            Ok(created) => {
                info!(
                    "Onboarded user {} from {}",
                    created.username, created.source
                );
                Ok(created)
            }
            Err(Error::Conflict(_)) => {
                debug!("User {} already onboarded", identity.username);
                self.existing(&identity.username).await
            }
            Err(e) => Err(e),
        }
    }

    async fn existing(&self, username: &str) -> Result<Identity> {
        match self.store.get_by_username(username).await? {
            Some(identity) => Ok(identity),
            None => {
                // Conflict reported but the row is gone; the store is not
                // behaving as a unique-keyed table.
                warn!("Conflict on {} but no record found", username);
                Err(Error::StoreUnavailable(format!(
                    "record for {} vanished after conflict",
                    username
                )))
            }
        }
    }
}
