//! Identity types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend an identity was first found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    Db,
    Directory,
}

impl IdentitySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentitySource::Db => "db",
            IdentitySource::Directory => "directory",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "db" => Some(IdentitySource::Db),
            "directory" => Some(IdentitySource::Directory),
            _ => None,
        }
    }
}

impl fmt::Display for IdentitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical local representation of a user.
///
/// `username` is the only key in the local store and is compared
/// case-sensitively. Once onboarded, `username` and `source` never change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub email: String,
    pub realname: String,
    pub source: IdentitySource,
    /// Directory entry DN for directory-sourced identities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_uid: Option<String>,
}

impl Identity {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        realname: impl Into<String>,
        source: IdentitySource,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            realname: realname.into(),
            source,
            external_uid: None,
        }
    }

    pub fn local(
        username: impl Into<String>,
        email: impl Into<String>,
        realname: impl Into<String>,
    ) -> Self {
        Self::new(username, email, realname, IdentitySource::Db)
    }

    pub fn with_external_uid(mut self, uid: impl Into<String>) -> Self {
        self.external_uid = Some(uid.into());
        self
    }
}

/// Username and secret presented for a single authentication attempt.
/// Never persisted.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    /// Canonical username, `None` when blank
    pub fn principal(&self) -> Option<&str> {
        canonical_username(&self.username)
    }
}

/// Key form of a username: surrounding whitespace removed, case kept.
/// `None` when nothing is left.
pub fn canonical_username(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}
