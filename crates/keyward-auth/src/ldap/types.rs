//! Directory search and result types

use crate::ldap::transport::SearchRequest;
use keyward_core::{DirectoryConfig, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Directory Entry
// ============================================================================

/// A directory entry returned by a search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Entry DN (Distinguished Name)
    pub dn: String,

    /// Raw attributes
    #[serde(default)]
    pub attributes: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    /// First value of an attribute. Attribute names are matched
    /// case-insensitively.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name)
            .first()
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
    }

    /// All values of an attribute, empty when absent
    pub fn values(&self, name: &str) -> &[String] {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }
}

// ============================================================================
// User Query
// ============================================================================

/// Value matched against the uid attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchValue<'a> {
    /// Exact match, escaped before use
    Exact(&'a str),
    /// Presence match (`uid=*`)
    Present,
}

/// Search for users under a directory configuration
#[derive(Debug, Clone)]
pub struct UserQuery<'a> {
    pub config: &'a DirectoryConfig,
    pub value: MatchValue<'a>,
    /// 0 means unlimited
    pub size_limit: i32,
}

impl<'a> UserQuery<'a> {
    /// Look up a single username
    pub fn user(config: &'a DirectoryConfig, username: &'a str) -> Self {
        Self {
            config,
            value: MatchValue::Exact(username),
            size_limit: 0,
        }
    }

    /// Bounded presence search confirming the search parameters are usable
    pub fn sample(config: &'a DirectoryConfig) -> Self {
        Self {
            config,
            value: MatchValue::Present,
            size_limit: 1,
        }
    }

    /// Effective filter: the configured filter ANDed with the uid match
    pub fn filter(&self) -> String {
        match self.value {
            MatchValue::Exact(value) => self.config.build_user_filter(&ldap3::ldap_escape(value)),
            MatchValue::Present => self.config.build_user_filter("*"),
        }
    }

    /// Attributes needed to build an identity
    pub fn attributes(&self) -> Vec<String> {
        let mappings = &self.config.attribute_mappings;
        let mut attrs: Vec<String> = Vec::with_capacity(4);
        for attr in [
            self.config.uid_attribute.as_str(),
            mappings.email.as_str(),
            mappings.display_name.as_str(),
            "cn",
        ] {
            if !attrs.iter().any(|a| a.eq_ignore_ascii_case(attr)) {
                attrs.push(attr.to_string());
            }
        }
        attrs
    }

    pub(crate) fn to_request(&self) -> Result<SearchRequest> {
        Ok(SearchRequest {
            base_dn: self.config.base_dn.clone(),
            scope: self.config.search_scope()?,
            filter: self.filter(),
            attributes: self.attributes(),
            size_limit: self.size_limit,
        })
    }
}

// ============================================================================
// Connection Test
// ============================================================================

/// Result of a successful connection test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionReport {
    pub url: String,
    /// DN used for the bind, `None` for anonymous access
    pub bound_as: Option<String>,
    /// Effective filter used for the sample search
    pub filter: String,
    /// Entries seen by the sample search (at most one)
    pub entries_sampled: usize,
}
