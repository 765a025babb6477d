//! LDAP directory authentication
//!
//! Provides:
//! - Directory client with deadline enforcement and error classification
//! - Directory-backed auth provider (service bind, search, user bind)
//! - Connection tests for candidate configurations
//! - TLS (LDAPS) and STARTTLS support through `ldap3`

mod client;
mod provider;
mod tester;
pub mod transport;
mod types;

pub use client::{DirectoryClient, DirectoryConnection};
pub use provider::LdapAuthProvider;
pub use tester::ConnectionTester;
pub use transport::{DirectorySession, DirectoryTransport, LdapTransport, TransportError};
pub use types::*;
