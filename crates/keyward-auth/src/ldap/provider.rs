//! Directory-backed authentication provider

use crate::ldap::client::DirectoryClient;
use crate::ldap::types::{DirectoryEntry, UserQuery};
use crate::provider::AuthProvider;
use async_trait::async_trait;
use keyward_core::{
    canonical_username, ConfigProvider, ConnectionFailure, Credentials, DirectoryConfig, Error,
    Identity, IdentitySource, Result,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Domain used for directory users that carry no email attribute
const PLACEHOLDER_EMAIL_DOMAIN: &str = "placeholder.com";

/// Looks users up in the directory with the service identity and verifies
/// secrets with a second bind as the resolved entry.
///
/// The directory configuration is read from the config provider on every
/// call, so a replaced configuration takes effect on the next request.
pub struct LdapAuthProvider {
    client: DirectoryClient,
    config: Arc<dyn ConfigProvider>,
}

impl LdapAuthProvider {
    pub fn new(client: DirectoryClient, config: Arc<dyn ConfigProvider>) -> Self {
        Self { client, config }
    }

    /// Resolve `username` to exactly one directory entry
    async fn lookup(&self, config: &DirectoryConfig, username: &str) -> Result<DirectoryEntry> {
        let mut conn = self.client.bind(config).await.map_err(service_bind_failure)?;
        let result = self
            .client
            .search(&mut conn, &UserQuery::user(config, username))
            .await;
        conn.release().await;

        let mut entries = result?;
        match entries.len() {
            0 => Err(Error::NotFound(username.to_string())),
            1 => {
                let entry = entries.remove(0);
                if !holds_username(config, &entry, username) {
                    // Matched only through the server's case folding
                    debug!("Entry {} does not carry uid {} exactly", entry.dn, username);
                    return Err(Error::NotFound(username.to_string()));
                }
                Ok(entry)
            }
            n => {
                warn!("Directory returned {} entries for {}", n, username);
                Err(Error::SearchAmbiguous {
                    username: username.to_string(),
                    matches: n,
                })
            }
        }
    }
}

#[async_trait]
impl AuthProvider for LdapAuthProvider {
    fn source(&self) -> IdentitySource {
        IdentitySource::Directory
    }

    #[instrument(skip(self))]
    async fn search_user(&self, username: &str) -> Result<Identity> {
        let username = canonical_username(username)
            .ok_or_else(|| Error::NotFound(username.to_string()))?;
        let config = self.config.directory_config()?;
        let entry = self.lookup(&config, username).await?;
        Ok(map_entry(&config, &entry, username))
    }

    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    async fn authenticate(&self, credentials: &Credentials) -> Result<Identity> {
        let username = credentials.principal().ok_or(Error::AuthFailed)?;
        let config = self.config.directory_config()?;

        let entry = match self.lookup(&config, username).await {
            Ok(entry) => entry,
            Err(Error::NotFound(_)) => {
                debug!("Directory login for unknown user: {}", username);
                return Err(Error::AuthFailed);
            }
            Err(e) => return Err(e),
        };

        match self.client.bind_as(&config, &entry.dn, &credentials.secret).await {
            Ok(conn) => conn.release().await,
            Err(Error::BindFailed { rc, .. }) => {
                debug!("User bind rejected for {} (code {})", entry.dn, rc);
                return Err(Error::AuthFailed);
            }
            Err(e) => return Err(e),
        }

        info!("Directory user authenticated: {}", username);
        Ok(map_entry(&config, &entry, username))
    }
}

/// A rejected service-account bind is a connection problem, not a user one
fn service_bind_failure(e: Error) -> Error {
    match e {
        Error::BindFailed { rc, message } => Error::ConnectionFailed(ConnectionFailure::ServiceBind(
            format!("code {}: {}", rc, message),
        )),
        other => other,
    }
}

/// The entry must carry `username` exactly among its uid values. Entries
/// without the uid attribute are accepted as the search itself matched.
fn holds_username(config: &DirectoryConfig, entry: &DirectoryEntry, username: &str) -> bool {
    let values = entry.values(&config.uid_attribute);
    values.is_empty() || values.iter().any(|v| v == username)
}

/// Build an identity from a directory entry. The username is always the
/// one that was searched, never another uid value of the entry.
fn map_entry(config: &DirectoryConfig, entry: &DirectoryEntry, username: &str) -> Identity {
    let mappings = &config.attribute_mappings;

    let realname = entry
        .first(&mappings.display_name)
        .or_else(|| entry.first("cn"))
        .unwrap_or(username)
        .to_string();

    let email = match entry.first(&mappings.email) {
        Some(email) => email.to_string(),
        None => placeholder_email(username),
    };

    Identity::new(username, email, realname, IdentitySource::Directory)
        .with_external_uid(entry.dn.clone())
}

fn placeholder_email(username: &str) -> String {
    if username.contains('@') {
        username.to_string()
    } else {
        format!("{}@{}", username, PLACEHOLDER_EMAIL_DOMAIN)
    }
}
