//! Directory transport
//!
//! The protocol seam under `DirectoryClient`. A transport opens one
//! session per call; sessions are never pooled or reused. The default
//! implementation speaks LDAP through `ldap3` (plain, LDAPS and STARTTLS).

use crate::ldap::types::DirectoryEntry;
use async_trait::async_trait;
use keyward_core::{DirectoryConfig, SearchScope};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, Scope, SearchEntry, SearchOptions, SearchResult};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// LDAP result code: sizeLimitExceeded
pub const RC_SIZE_LIMIT_EXCEEDED: u32 = 4;

/// LDAP result code: invalidCredentials
pub const RC_INVALID_CREDENTIALS: u32 = 49;

/// Raw transport failure, classified by `DirectoryClient`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("{0}")]
    Unreachable(String),

    #[error("TLS failure: {0}")]
    Tls(String),

    #[error("operation timed out")]
    Timeout,

    #[error("rejected with code {rc}: {message}")]
    Rejected { rc: u32, message: String },
}

/// A single search as sent on the wire
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub base_dn: String,
    pub scope: SearchScope,
    pub filter: String,
    pub attributes: Vec<String>,
    /// 0 means no client side limit
    pub size_limit: i32,
}

/// Entries returned by a search
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub entries: Vec<DirectoryEntry>,
    /// The directory stopped at the size limit
    pub truncated: bool,
}

/// Opens directory sessions
#[async_trait]
pub trait DirectoryTransport: Send + Sync {
    async fn connect(
        &self,
        config: &DirectoryConfig,
        timeout: Duration,
    ) -> Result<Box<dyn DirectorySession>, TransportError>;
}

/// One open directory connection
#[async_trait]
pub trait DirectorySession: Send {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<(), TransportError>;

    async fn search(&mut self, request: &SearchRequest) -> Result<SearchOutcome, TransportError>;

    async fn unbind(&mut self);
}

// ============================================================================
// ldap3 implementation
// ============================================================================

/// Transport backed by `ldap3`
#[derive(Debug, Clone, Copy, Default)]
pub struct LdapTransport;

#[async_trait]
impl DirectoryTransport for LdapTransport {
    async fn connect(
        &self,
        config: &DirectoryConfig,
        timeout: Duration,
    ) -> Result<Box<dyn DirectorySession>, TransportError> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(timeout)
            .set_starttls(config.start_tls)
            .set_no_tls_verify(!config.verify_cert);

        debug!("Connecting to directory server: {}", config.url);

        let (conn, ldap) = LdapConnAsync::with_settings(settings, &config.url)
            .await
            .map_err(classify_ldap_error)?;

        ldap3::drive!(conn);

        Ok(Box::new(LdapSession { ldap }))
    }
}

struct LdapSession {
    ldap: Ldap,
}

#[async_trait]
impl DirectorySession for LdapSession {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<(), TransportError> {
        let result = self
            .ldap
            .simple_bind(dn, password)
            .await
            .map_err(classify_ldap_error)?;

        if result.rc != 0 {
            return Err(TransportError::Rejected {
                rc: result.rc,
                message: result.text,
            });
        }

        Ok(())
    }

    async fn search(&mut self, request: &SearchRequest) -> Result<SearchOutcome, TransportError> {
        let scope = match request.scope {
            SearchScope::Base => Scope::Base,
            SearchScope::OneLevel => Scope::OneLevel,
            SearchScope::Subtree => Scope::Subtree,
        };

        if request.size_limit > 0 {
            self.ldap
                .with_search_options(SearchOptions::new().sizelimit(request.size_limit));
        }

        let SearchResult(rs, result) = self
            .ldap
            .search(
                &request.base_dn,
                scope,
                &request.filter,
                request.attributes.clone(),
            )
            .await
            .map_err(classify_ldap_error)?;

        let truncated = result.rc == RC_SIZE_LIMIT_EXCEEDED;
        if result.rc != 0 && !truncated {
            return Err(TransportError::Rejected {
                rc: result.rc,
                message: result.text,
            });
        }

        let entries = rs
            .into_iter()
            .map(|entry| {
                let entry = SearchEntry::construct(entry);
                DirectoryEntry {
                    dn: entry.dn,
                    attributes: entry.attrs,
                }
            })
            .collect();

        Ok(SearchOutcome { entries, truncated })
    }

    async fn unbind(&mut self) {
        if let Err(e) = self.ldap.unbind().await {
            debug!("Directory unbind failed: {}", e);
        }
    }
}

fn classify_ldap_error(e: LdapError) -> TransportError {
    if matches!(e, LdapError::Timeout { .. }) {
        return TransportError::Timeout;
    }

    let message = e.to_string();
    if is_certificate_error(&message) {
        TransportError::Tls(message)
    } else {
        TransportError::Unreachable(message)
    }
}

fn is_certificate_error(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("certificate") || lower.contains("unknownissuer") || lower.contains("cert verif")
}
