//! Authentication for Keyward
//!
//! Local (database) and LDAP directory providers behind one contract,
//! onboarding of provider identities into the local store, and
//! connection tests for candidate directory configurations.

pub mod db;
pub mod ldap;
pub mod onboard;
pub mod provider;
pub mod service;

#[cfg(test)]
mod testing;

pub use db::DbAuthProvider;
pub use ldap::{
    ConnectionReport, ConnectionTester, DirectoryClient, DirectoryEntry, LdapAuthProvider,
    LdapTransport,
};
pub use onboard::OnboardingReconciler;
pub use provider::{AuthProvider, ProviderSelector};
pub use service::AuthService;
