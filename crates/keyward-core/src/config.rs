//! Configuration for Keyward

use crate::types::DirectoryConfig;
use crate::{Error, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeywardConfig {
    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub ldap: DirectoryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl KeywardConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigInvalid(format!("Failed to read config {}: {}", path, e)))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::ConfigInvalid(format!("Failed to parse config: {}", e)))
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from `KEYWARD_*` variables supplied by `lookup`.
    ///
    /// Numeric and boolean values that do not parse are `ConfigInvalid`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(mode) = lookup("KEYWARD_AUTH_MODE") {
            config.auth.mode = mode;
        }
        if let Some(url) = lookup("KEYWARD_DATABASE_URL") {
            config.database.url = url;
        }
        if let Some(level) = lookup("KEYWARD_LOG_LEVEL") {
            config.logging.level = level;
        }

        // Directory from environment
        if let Some(url) = lookup("KEYWARD_LDAP_URL") {
            config.ldap.url = url;
        }
        if let Some(dn) = lookup("KEYWARD_LDAP_SEARCH_DN") {
            config.ldap.search_dn = dn;
        }
        if let Some(password) = lookup("KEYWARD_LDAP_SEARCH_PASSWORD") {
            config.ldap.search_password = password;
        }
        if let Some(base) = lookup("KEYWARD_LDAP_BASE_DN") {
            config.ldap.base_dn = base;
        }
        if let Some(uid) = lookup("KEYWARD_LDAP_UID") {
            config.ldap.uid_attribute = uid;
        }
        if let Some(filter) = lookup("KEYWARD_LDAP_FILTER") {
            config.ldap.filter = filter;
        }
        if let Some(scope) = lookup("KEYWARD_LDAP_SCOPE") {
            config.ldap.scope = parse_var("KEYWARD_LDAP_SCOPE", &scope)?;
        }
        if let Some(timeout) = lookup("KEYWARD_LDAP_TIMEOUT") {
            config.ldap.connection_timeout_seconds = parse_var("KEYWARD_LDAP_TIMEOUT", &timeout)?;
        }
        if let Some(verify) = lookup("KEYWARD_LDAP_VERIFY_CERT") {
            config.ldap.verify_cert = parse_var("KEYWARD_LDAP_VERIFY_CERT", &verify)?;
        }

        Ok(config)
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::ConfigInvalid(format!("{} has invalid value '{}'", key, value)))
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// `db_auth` or `ldap_auth`
    #[serde(default = "default_auth_mode")]
    pub mode: String,
}

fn default_auth_mode() -> String {
    AuthMode::Db.as_str().to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: default_auth_mode(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://keyward.db?mode=rwc".to_string(),
            max_connections: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

// ============================================================================
// Authentication Mode
// ============================================================================

/// Which backend answers identity lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMode {
    /// Local relational store
    Db,
    /// External directory service
    Ldap,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::Db => "db_auth",
            AuthMode::Ldap => "ldap_auth",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "db_auth" => Ok(AuthMode::Db),
            "ldap_auth" => Ok(AuthMode::Ldap),
            other => Err(Error::ConfigInvalid(format!("unknown auth mode '{}'", other))),
        }
    }
}

// ============================================================================
// Config Provider
// ============================================================================

/// Source of the active mode and directory settings.
///
/// Providers ask for these on every call and never keep them.
pub trait ConfigProvider: Send + Sync {
    fn auth_mode(&self) -> Result<AuthMode>;

    fn directory_config(&self) -> Result<DirectoryConfig>;
}

impl ConfigProvider for KeywardConfig {
    fn auth_mode(&self) -> Result<AuthMode> {
        self.auth.mode.parse()
    }

    fn directory_config(&self) -> Result<DirectoryConfig> {
        Ok(self.ldap.clone())
    }
}

/// Configuration that can be swapped while the process runs
#[derive(Debug, Clone)]
pub struct SharedConfig {
    inner: Arc<RwLock<KeywardConfig>>,
}

impl SharedConfig {
    pub fn new(config: KeywardConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    pub fn replace(&self, config: KeywardConfig) {
        *self.inner.write() = config;
    }

    pub fn snapshot(&self) -> KeywardConfig {
        self.inner.read().clone()
    }
}

impl ConfigProvider for SharedConfig {
    fn auth_mode(&self) -> Result<AuthMode> {
        self.inner.read().auth_mode()
    }

    fn directory_config(&self) -> Result<DirectoryConfig> {
        self.inner.read().directory_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_mode_parsing() {
        assert_eq!("db_auth".parse::<AuthMode>().unwrap(), AuthMode::Db);
        assert_eq!("ldap_auth".parse::<AuthMode>().unwrap(), AuthMode::Ldap);
        assert!(matches!(
            "uaa_auth".parse::<AuthMode>(),
            Err(Error::ConfigInvalid(_))
        ));
    }

    #[test]
    fn test_from_toml() {
        let config = KeywardConfig::from_toml(
            r#"
            [auth]
            mode = "ldap_auth"

            [ldap]
            url = "ldap://127.0.0.1"
            search_dn = "cn=admin,dc=example,dc=com"
            search_password = "admin"
            base_dn = "dc=example,dc=com"
            uid_attribute = "cn"
            scope = 2
            connection_timeout_seconds = 10
            verify_cert = false
            "#,
        )
        .unwrap();

        assert_eq!(config.auth_mode().unwrap(), AuthMode::Ldap);
        let ldap = config.directory_config().unwrap();
        assert_eq!(ldap.uid_attribute, "cn");
        assert!(ldap.validate().is_ok());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_shared_config_replace() {
        let shared = SharedConfig::new(KeywardConfig::default());
        assert_eq!(shared.auth_mode().unwrap(), AuthMode::Db);

        let mut updated = shared.snapshot();
        updated.auth.mode = "ldap_auth".to_string();
        shared.replace(updated);

        assert_eq!(shared.auth_mode().unwrap(), AuthMode::Ldap);
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: std::collections::HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_env_values() {
        let config = KeywardConfig::from_lookup(vars(&[
            ("KEYWARD_AUTH_MODE", "ldap_auth"),
            ("KEYWARD_LDAP_URL", "ldaps://ldap.example.com"),
            ("KEYWARD_LDAP_BASE_DN", "dc=example,dc=com"),
            ("KEYWARD_LDAP_SCOPE", "1"),
            ("KEYWARD_LDAP_TIMEOUT", "10"),
            ("KEYWARD_LDAP_VERIFY_CERT", "false"),
        ]))
        .unwrap();

        assert_eq!(config.auth_mode().unwrap(), AuthMode::Ldap);
        assert_eq!(config.ldap.scope, 1);
        assert_eq!(config.ldap.connection_timeout_seconds, 10);
        assert!(!config.ldap.verify_cert);
    }

    #[test]
    fn test_from_env_rejects_unparsable_values() {
        for (key, value) in [
            ("KEYWARD_LDAP_SCOPE", "subtree-ish"),
            ("KEYWARD_LDAP_TIMEOUT", "ten"),
            ("KEYWARD_LDAP_VERIFY_CERT", "nope"),
        ] {
            let result = KeywardConfig::from_lookup(vars(&[(key, value)]));
            assert!(
                matches!(result, Err(Error::ConfigInvalid(ref msg)) if msg.contains(key)),
                "{} = {} should be rejected",
                key,
                value
            );
        }
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            KeywardConfig::from_toml("[auth\nmode ="),
            Err(Error::ConfigInvalid(_))
        ));
    }
}
