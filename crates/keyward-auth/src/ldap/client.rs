//! Directory client
//!
//! Policy layer over a `DirectoryTransport`: validates configuration before
//! any I/O, enforces the combined bind + search deadline, and classifies
//! transport failures into the Keyward error taxonomy.

use crate::ldap::transport::{
    DirectorySession, DirectoryTransport, LdapTransport, TransportError,
    RC_INVALID_CREDENTIALS,
};
use crate::ldap::types::{DirectoryEntry, UserQuery};
use keyward_core::{ConnectionFailure, DirectoryConfig, Error, Result};
use std::sync::Arc;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

/// LDAP result codes that mean the search parameters themselves are wrong
const RC_NO_SUCH_OBJECT: u32 = 32;
const RC_INVALID_DN_SYNTAX: u32 = 34;
const RC_FILTER_ERROR: u32 = 87;

/// Stateless directory client. Every bind opens a fresh connection.
#[derive(Clone)]
pub struct DirectoryClient {
    transport: Arc<dyn DirectoryTransport>,
}

/// A bound directory connection and the deadline it must finish by
pub struct DirectoryConnection {
    session: Box<dyn DirectorySession>,
    deadline: Instant,
    timeout_seconds: u64,
    bound_as: Option<String>,
}

impl DirectoryConnection {
    /// DN this connection is bound as, `None` when anonymous
    pub fn bound_as(&self) -> Option<&str> {
        self.bound_as.as_deref()
    }

    /// Unbind and close
    pub async fn release(mut self) {
        if timeout_at(self.deadline, self.session.unbind()).await.is_err() {
            debug!("Deadline passed before unbind, dropping connection");
        }
    }
}

impl Default for DirectoryClient {
    fn default() -> Self {
        Self::new(Arc::new(LdapTransport))
    }
}

impl DirectoryClient {
    pub fn new(transport: Arc<dyn DirectoryTransport>) -> Self {
        Self { transport }
    }

    /// Connect and bind with the configured service identity.
    ///
    /// An empty search DN yields an anonymous connection with no bind.
    pub async fn bind(&self, config: &DirectoryConfig) -> Result<DirectoryConnection> {
        config.validate()?;

        if config.is_anonymous() {
            self.open(config, None).await
        } else {
            let credentials = (config.search_dn.as_str(), config.search_password.as_str());
            self.open(config, Some(credentials)).await
        }
    }

    /// Connect and bind as `dn` with `secret`
    pub async fn bind_as(
        &self,
        config: &DirectoryConfig,
        dn: &str,
        secret: &str,
    ) -> Result<DirectoryConnection> {
        config.validate()?;

        // An empty password turns a simple bind into an unauthenticated
        // bind, which most servers accept.
        if secret.is_empty() {
            return Err(Error::BindFailed {
                rc: RC_INVALID_CREDENTIALS,
                message: "empty password".to_string(),
            });
        }

        self.open(config, Some((dn, secret))).await
    }

    /// Run a user search on a bound connection
    pub async fn search(
        &self,
        conn: &mut DirectoryConnection,
        query: &UserQuery<'_>,
    ) -> Result<Vec<DirectoryEntry>> {
        let request = query.to_request()?;
        let seconds = conn.timeout_seconds;

        debug!(
            "Searching {} (scope {:?}) with filter: {}",
            request.base_dn, request.scope, request.filter
        );

        let outcome = match timeout_at(conn.deadline, conn.session.search(&request)).await {
            Err(_) => return Err(Error::timeout(seconds)),
            Ok(result) => result.map_err(|e| classify_search(e, seconds))?,
        };

        if outcome.truncated {
            debug!("Search stopped at size limit {}", request.size_limit);
        }

        debug!("Search returned {} entries", outcome.entries.len());
        Ok(outcome.entries)
    }

    async fn open(
        &self,
        config: &DirectoryConfig,
        credentials: Option<(&str, &str)>,
    ) -> Result<DirectoryConnection> {
        let timeout = config.timeout()?;
        let seconds = timeout.as_secs();
        let deadline = Instant::now() + timeout;

        let mut session = match timeout_at(deadline, self.transport.connect(config, timeout)).await {
            Err(_) => return Err(Error::timeout(seconds)),
            Ok(result) => result.map_err(|e| classify_connect(config, e, seconds))?,
        };

        let bound_as = match credentials {
            Some((dn, secret)) => {
                match timeout_at(deadline, session.simple_bind(dn, secret)).await {
                    Err(_) => return Err(Error::timeout(seconds)),
                    Ok(Err(e)) => {
                        let _ = timeout_at(deadline, session.unbind()).await;
                        return Err(classify_bind(config, e, seconds));
                    }
                    Ok(Ok(())) => {}
                }
                debug!("Bound to {} as {}", config.url, dn);
                Some(dn.to_string())
            }
            None => {
                debug!("Using anonymous connection to {}", config.url);
                None
            }
        };

        Ok(DirectoryConnection {
            session,
            deadline,
            timeout_seconds: seconds,
            bound_as,
        })
    }
}

fn classify_connect(config: &DirectoryConfig, e: TransportError, seconds: u64) -> Error {
    match e {
        TransportError::Timeout => Error::timeout(seconds),
        TransportError::Tls(message) if config.is_secure() && config.verify_cert => {
            warn!("Certificate verification failed for {}: {}", config.url, message);
            Error::CertVerificationFailed(message)
        }
        TransportError::Tls(message) | TransportError::Unreachable(message) => {
            Error::unreachable(message)
        }
        TransportError::Rejected { rc, message } => Error::ConnectionFailed(
            ConnectionFailure::Protocol(format!("code {}: {}", rc, message)),
        ),
    }
}

fn classify_bind(config: &DirectoryConfig, e: TransportError, seconds: u64) -> Error {
    match e {
        TransportError::Rejected { rc, message } => Error::BindFailed { rc, message },
        other => classify_connect(config, other, seconds),
    }
}

fn classify_search(e: TransportError, seconds: u64) -> Error {
    match e {
        TransportError::Timeout => Error::timeout(seconds),
        TransportError::Rejected { rc, message }
            if matches!(rc, RC_NO_SUCH_OBJECT | RC_INVALID_DN_SYNTAX | RC_FILTER_ERROR) =>
        {
            Error::ConfigInvalid(format!("search rejected (code {}): {}", rc, message))
        }
        TransportError::Rejected { rc, message } => Error::ConnectionFailed(
            ConnectionFailure::Protocol(format!("search failed with code {}: {}", rc, message)),
        ),
        TransportError::Tls(message) | TransportError::Unreachable(message) => {
            Error::unreachable(message)
        }
    }
}
