//! Directory (LDAP) configuration types
//!
//! A `DirectoryConfig` is handed in per call by the configuration
//! collaborator. It is validated before any connection is attempted.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Search Scope
// ============================================================================

/// Breadth of a directory search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    /// Only the base entry
    Base,
    /// Entries one level below the base
    OneLevel,
    /// The base entry and everything below it
    Subtree,
}

impl SearchScope {
    pub fn as_i64(&self) -> i64 {
        match self {
            SearchScope::Base => 0,
            SearchScope::OneLevel => 1,
            SearchScope::Subtree => 2,
        }
    }
}

impl TryFrom<i64> for SearchScope {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            0 => Ok(SearchScope::Base),
            1 => Ok(SearchScope::OneLevel),
            2 => Ok(SearchScope::Subtree),
            other => Err(Error::ConfigInvalid(format!(
                "search scope must be 0 (base), 1 (one level) or 2 (subtree), got {}",
                other
            ))),
        }
    }
}

// ============================================================================
// Directory Configuration
// ============================================================================

/// Directory server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DirectoryConfig {
    /// Directory URL (ldap:// or ldaps://)
    /// Example: "ldap://ldap.example.com:389" or "ldaps://ldap.example.com:636"
    pub url: String,

    /// Service account DN used for searches. Empty means anonymous.
    /// Example: "cn=admin,dc=example,dc=com"
    #[serde(default)]
    pub search_dn: String,

    /// Service account password
    #[serde(default)]
    pub search_password: String,

    /// Base DN for user searches
    /// Example: "dc=example,dc=com"
    pub base_dn: String,

    /// Attribute holding the username
    #[serde(default = "default_uid_attribute")]
    pub uid_attribute: String,

    /// Extra filter ANDed with the uid match. May be empty.
    /// Example: "(objectClass=person)"
    #[serde(default)]
    pub filter: String,

    /// 0 = base, 1 = one level, 2 = subtree
    #[serde(default = "default_scope")]
    pub scope: i64,

    /// Deadline for bind and search together, in seconds
    #[serde(default = "default_timeout")]
    pub connection_timeout_seconds: i64,

    /// Verify the server certificate on secure connections
    #[serde(default = "default_verify_cert")]
    pub verify_cert: bool,

    /// Upgrade a plain ldap:// connection with STARTTLS
    #[serde(default)]
    pub start_tls: bool,

    /// Attribute mappings for building identities
    #[serde(default)]
    pub attribute_mappings: AttributeMappings,
}

fn default_uid_attribute() -> String {
    "uid".to_string()
}

fn default_scope() -> i64 {
    SearchScope::Subtree.as_i64()
}

fn default_timeout() -> i64 {
    5
}

fn default_verify_cert() -> bool {
    true
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            url: "ldap://localhost:389".to_string(),
            search_dn: String::new(),
            search_password: String::new(),
            base_dn: String::new(),
            uid_attribute: default_uid_attribute(),
            filter: String::new(),
            scope: default_scope(),
            connection_timeout_seconds: default_timeout(),
            verify_cert: default_verify_cert(),
            start_tls: false,
            attribute_mappings: AttributeMappings::default(),
        }
    }
}

/// Directory attribute mappings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AttributeMappings {
    /// Email attribute
    #[serde(default = "default_email_attr")]
    pub email: String,

    /// Display name attribute, `cn` is used when absent
    #[serde(default = "default_display_name_attr")]
    pub display_name: String,
}

fn default_email_attr() -> String {
    "mail".to_string()
}

fn default_display_name_attr() -> String {
    "displayName".to_string()
}

impl Default for AttributeMappings {
    fn default() -> Self {
        Self {
            email: default_email_attr(),
            display_name: default_display_name_attr(),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

impl DirectoryConfig {
    /// Validate configuration. Performs no I/O.
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.url)
            .map_err(|e| Error::ConfigInvalid(format!("invalid directory URL '{}': {}", self.url, e)))?;

        if url.scheme() != "ldap" && url.scheme() != "ldaps" {
            return Err(Error::ConfigInvalid(format!(
                "directory URL must use ldap:// or ldaps://, got {}://",
                url.scheme()
            )));
        }

        if url.host_str().map_or(true, str::is_empty) {
            return Err(Error::ConfigInvalid("directory URL has no host".to_string()));
        }

        if self.start_tls && url.scheme() == "ldaps" {
            return Err(Error::ConfigInvalid(
                "STARTTLS cannot be combined with ldaps://".to_string(),
            ));
        }

        self.search_scope()?;
        self.timeout()?;

        if self.base_dn.trim().is_empty() {
            return Err(Error::ConfigInvalid("base DN is required".to_string()));
        }

        if self.uid_attribute.trim().is_empty() {
            return Err(Error::ConfigInvalid("uid attribute is required".to_string()));
        }

        if let Some(filter) = self.normalized_filter() {
            check_balanced(&filter)?;
        }

        Ok(())
    }

    /// Typed search scope
    pub fn search_scope(&self) -> Result<SearchScope> {
        SearchScope::try_from(self.scope)
    }

    /// Combined bind + search deadline
    pub fn timeout(&self) -> Result<Duration> {
        if self.connection_timeout_seconds <= 0 {
            return Err(Error::ConfigInvalid(format!(
                "connection timeout must be positive, got {}",
                self.connection_timeout_seconds
            )));
        }
        Ok(Duration::from_secs(self.connection_timeout_seconds as u64))
    }

    /// Whether the connection is TLS protected
    pub fn is_secure(&self) -> bool {
        self.start_tls || self.url.to_ascii_lowercase().starts_with("ldaps://")
    }

    /// Whether an anonymous search should be used
    pub fn is_anonymous(&self) -> bool {
        self.search_dn.trim().is_empty()
    }

    /// Configured filter wrapped in parentheses, `None` when empty
    pub fn normalized_filter(&self) -> Option<String> {
        let filter = self.filter.trim();
        if filter.is_empty() {
            None
        } else if filter.starts_with('(') {
            Some(filter.to_string())
        } else {
            Some(format!("({})", filter))
        }
    }

    /// Build the effective search filter.
    ///
    /// `value` is inserted as-is; callers escape untrusted input first.
    pub fn build_user_filter(&self, value: &str) -> String {
        let uid_match = format!("({}={})", self.uid_attribute, value);
        match self.normalized_filter() {
            Some(filter) => format!("(&{}{})", filter, uid_match),
            None => uid_match,
        }
    }
}

fn check_balanced(filter: &str) -> Result<()> {
    let mut depth: i32 = 0;
    for c in filter.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    break;
                }
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(Error::ConfigInvalid(format!(
            "filter has unbalanced parentheses: {}",
            filter
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> DirectoryConfig {
        DirectoryConfig {
            url: "ldap://127.0.0.1".to_string(),
            search_dn: "cn=admin,dc=example,dc=com".to_string(),
            search_password: "admin".to_string(),
            base_dn: "dc=example,dc=com".to_string(),
            uid_attribute: "cn".to_string(),
            connection_timeout_seconds: 10,
            verify_cert: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_user_filter_building() {
        let mut config = valid_config();
        assert_eq!(config.build_user_filter("john"), "(cn=john)");

        config.filter = "(objectClass=person)".to_string();
        assert_eq!(
            config.build_user_filter("john"),
            "(&(objectClass=person)(cn=john))"
        );

        config.filter = "objectClass=person".to_string();
        assert_eq!(
            config.build_user_filter("john"),
            "(&(objectClass=person)(cn=john))"
        );
    }

    #[test]
    fn test_scope_mapping() {
        assert_eq!(SearchScope::try_from(0).unwrap(), SearchScope::Base);
        assert_eq!(SearchScope::try_from(1).unwrap(), SearchScope::OneLevel);
        assert_eq!(SearchScope::try_from(2).unwrap(), SearchScope::Subtree);
        assert!(matches!(SearchScope::try_from(3), Err(Error::ConfigInvalid(_))));
        assert!(matches!(SearchScope::try_from(-1), Err(Error::ConfigInvalid(_))));
    }

    #[test]
    fn test_config_validation() {
        assert!(valid_config().validate().is_ok());

        let mut config = valid_config();
        config.scope = 3;
        assert!(matches!(config.validate(), Err(Error::ConfigInvalid(_))));

        let mut config = valid_config();
        config.connection_timeout_seconds = 0;
        assert!(matches!(config.validate(), Err(Error::ConfigInvalid(_))));

        let mut config = valid_config();
        config.url = "http://127.0.0.1".to_string();
        assert!(matches!(config.validate(), Err(Error::ConfigInvalid(_))));

        let mut config = valid_config();
        config.url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(Error::ConfigInvalid(_))));

        let mut config = valid_config();
        config.filter = "(&(objectClass=person)".to_string();
        assert!(matches!(config.validate(), Err(Error::ConfigInvalid(_))));

        let mut config = valid_config();
        config.uid_attribute = String::new();
        assert!(matches!(config.validate(), Err(Error::ConfigInvalid(_))));
    }

    #[test]
    fn test_secure_detection() {
        let mut config = valid_config();
        assert!(!config.is_secure());

        config.url = "ldaps://ldap.example.com:636".to_string();
        assert!(config.is_secure());

        config.url = "ldap://ldap.example.com".to_string();
        config.start_tls = true;
        assert!(config.is_secure());
    }

    #[test]
    fn test_deserialize_defaults() {
        let config: DirectoryConfig = toml::from_str(
            r#"
            url = "ldap://127.0.0.1"
            base_dn = "dc=example,dc=com"
            "#,
        )
        .unwrap();

        assert_eq!(config.uid_attribute, "uid");
        assert_eq!(config.search_scope().unwrap(), SearchScope::Subtree);
        assert!(config.verify_cert);
        assert!(config.is_anonymous());
        assert_eq!(config.attribute_mappings.email, "mail");
    }
}
