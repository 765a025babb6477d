//! In-process collaborators for unit tests

use crate::ldap::transport::{
    DirectorySession, DirectoryTransport, SearchOutcome, SearchRequest, TransportError,
};
use crate::ldap::DirectoryEntry;
use async_trait::async_trait;
use keyward_core::{DirectoryConfig, Error, Identity, Result};
use keyward_crypto::PasswordHash;
use keyward_metadata::IdentityRepository;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub(crate) const SERVICE_DN: &str = "cn=admin,dc=example,dc=com";
pub(crate) const SERVICE_PASSWORD: &str = "admin";

pub(crate) fn directory_config() -> DirectoryConfig {
    DirectoryConfig {
        url: "ldap://127.0.0.1".to_string(),
        search_dn: SERVICE_DN.to_string(),
        search_password: SERVICE_PASSWORD.to_string(),
        base_dn: "dc=example,dc=com".to_string(),
        uid_attribute: "uid".to_string(),
        filter: String::new(),
        scope: 2,
        connection_timeout_seconds: 10,
        verify_cert: false,
        ..Default::default()
    }
}

// ============================================================================
// Fake directory
// ============================================================================

#[derive(Clone, Default)]
pub(crate) struct FakeDirectory {
    state: Arc<Mutex<FakeState>>,
}

#[derive(Default)]
struct FakeState {
    suffix: String,
    entries: Vec<(DirectoryEntry, String)>,
    connects: usize,
    binds: Vec<String>,
    searches: Vec<SearchRequest>,
    unbinds: usize,
    connect_error: Option<TransportError>,
    hang_on_connect: bool,
    hang_on_search: bool,
}

impl FakeDirectory {
    /// dc=example,dc=com with a service account and a few people
    pub(crate) fn example() -> Self {
        let directory = Self::default();
        directory.state.lock().suffix = "dc=example,dc=com".to_string();

        directory.add_entry(
            SERVICE_DN,
            &[("cn", "admin"), ("objectClass", "organizationalRole")],
            SERVICE_PASSWORD,
        );
        directory.add_entry(
            "uid=mike,ou=people,dc=example,dc=com",
            &[
                ("objectClass", "person"),
                ("uid", "mike"),
                ("cn", "mike"),
                ("displayName", "Mike Jones"),
                ("mail", "mike@example.com"),
            ],
            "mike123",
        );
        directory.add_entry(
            "uid=nomail,ou=people,dc=example,dc=com",
            &[("objectClass", "person"), ("uid", "nomail"), ("cn", "No Mail")],
            "nomail123",
        );
        directory.add_entry(
            "uid=twin,ou=people,dc=example,dc=com",
            &[("objectClass", "person"), ("uid", "twin"), ("cn", "Twin One")],
            "twin123",
        );
        directory.add_entry(
            "uid=twin,ou=staff,dc=example,dc=com",
            &[("objectClass", "person"), ("uid", "twin"), ("cn", "Twin Two")],
            "twin123",
        );
        directory
    }

    pub(crate) fn add_entry(&self, dn: &str, attrs: &[(&str, &str)], password: &str) {
        let mut attributes: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in attrs {
            attributes
                .entry(name.to_string())
                .or_default()
                .push(value.to_string());
        }
        let entry = DirectoryEntry {
            dn: dn.to_string(),
            attributes,
        };
        self.state.lock().entries.push((entry, password.to_string()));
    }

    pub(crate) fn hang_on_connect(&self) {
        self.state.lock().hang_on_connect = true;
    }

    pub(crate) fn hang_on_search(&self) {
        self.state.lock().hang_on_search = true;
    }

    pub(crate) fn fail_connect(&self, error: TransportError) {
        self.state.lock().connect_error = Some(error);
    }

    pub(crate) fn connects(&self) -> usize {
        self.state.lock().connects
    }

    pub(crate) fn binds(&self) -> Vec<String> {
        self.state.lock().binds.clone()
    }

    pub(crate) fn searches(&self) -> Vec<SearchRequest> {
        self.state.lock().searches.clone()
    }

    pub(crate) fn unbinds(&self) -> usize {
        self.state.lock().unbinds
    }
}

#[async_trait]
impl DirectoryTransport for FakeDirectory {
    async fn connect(
        &self,
        _config: &DirectoryConfig,
        _timeout: Duration,
    ) -> std::result::Result<Box<dyn DirectorySession>, TransportError> {
        let (hang, error) = {
            let mut state = self.state.lock();
            state.connects += 1;
            (state.hang_on_connect, state.connect_error.clone())
        };

        if hang {
            std::future::pending::<()>().await;
        }
        if let Some(error) = error {
            return Err(error);
        }

        Ok(Box::new(FakeSession {
            state: self.state.clone(),
        }))
    }
}

struct FakeSession {
    state: Arc<Mutex<FakeState>>,
}

#[async_trait]
impl DirectorySession for FakeSession {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> std::result::Result<(), TransportError> {
        let mut state = self.state.lock();
        state.binds.push(dn.to_string());

        let accepted = state
            .entries
            .iter()
            .any(|(entry, secret)| entry.dn == dn && secret == password);
        if accepted {
            Ok(())
        } else {
            Err(TransportError::Rejected {
                rc: 49,
                message: "Invalid credentials".to_string(),
            })
        }
    }

    async fn search(&mut self, request: &SearchRequest) -> std::result::Result<SearchOutcome, TransportError> {
        let hang = self.state.lock().hang_on_search;
        if hang {
            std::future::pending::<()>().await;
        }

        let mut state = self.state.lock();
        state.searches.push(request.clone());

        if !request.base_dn.ends_with(&state.suffix) {
            return Err(TransportError::Rejected {
                rc: 32,
                message: "No such object".to_string(),
            });
        }

        let mut entries: Vec<DirectoryEntry> = state
            .entries
            .iter()
            .map(|(entry, _)| entry)
            .filter(|entry| entry.dn.ends_with(&request.base_dn))
            .filter(|entry| matches_filter(&request.filter, entry))
            .cloned()
            .collect();

        let mut truncated = false;
        if request.size_limit > 0 && entries.len() > request.size_limit as usize {
            entries.truncate(request.size_limit as usize);
            truncated = true;
        }

        Ok(SearchOutcome { entries, truncated })
    }

    async fn unbind(&mut self) {
        self.state.lock().unbinds += 1;
    }
}

/// Evaluates `(&..)`, `(|..)`, `(!..)`, equality and presence filters.
/// Values compare case-insensitively, like `uid` and `cn` on a real server.
fn matches_filter(filter: &str, entry: &DirectoryEntry) -> bool {
    let Some(inner) = filter.strip_prefix('(').and_then(|f| f.strip_suffix(')')) else {
        return false;
    };

    if let Some(rest) = inner.strip_prefix('&') {
        return components(rest).iter().all(|c| matches_filter(c, entry));
    }
    if let Some(rest) = inner.strip_prefix('|') {
        return components(rest).iter().any(|c| matches_filter(c, entry));
    }
    if let Some(rest) = inner.strip_prefix('!') {
        return !matches_filter(rest, entry);
    }

    let Some((attr, value)) = inner.split_once('=') else {
        return false;
    };
    let values = entry.values(attr);
    if value == "*" {
        !values.is_empty()
    } else {
        values.iter().any(|v| v.eq_ignore_ascii_case(value))
    }
}

/// Split `(a)(b)(c)` into its top-level parenthesized parts
fn components(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in list.char_indices() {
        match c {
            '(' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    parts.push(&list[start..=i]);
                }
            }
            _ => {}
        }
    }
    parts
}

// ============================================================================
// In-memory identity repository
// ============================================================================

#[derive(Default)]
pub(crate) struct MemoryRepository {
    records: Mutex<HashMap<String, (Identity, Option<PasswordHash>)>>,
    race_winner: Mutex<Option<Identity>>,
    unavailable: AtomicBool,
    inserts: AtomicUsize,
}

impl MemoryRepository {
    /// The next insert loses a race against `winner`, which lands first
    pub(crate) fn racing(winner: Identity) -> Self {
        let repo = Self::default();
        *repo.race_winner.lock() = Some(winner);
        repo
    }

    pub(crate) fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub(crate) fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub(crate) fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::StoreUnavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityRepository for MemoryRepository {
    async fn get_by_username(&self, username: &str) -> Result<Option<Identity>> {
        self.check()?;
        Ok(self
            .records
            .lock()
            .get(username)
            .map(|(identity, _)| identity.clone()))
    }

    async fn insert_if_absent(&self, identity: &Identity) -> Result<Identity> {
        self.check()?;
        self.inserts.fetch_add(1, Ordering::SeqCst);

        let mut records = self.records.lock();
        if let Some(winner) = self.race_winner.lock().take() {
            records.insert(winner.username.clone(), (winner, None));
        }

        if records.contains_key(&identity.username) {
            return Err(Error::Conflict(identity.username.clone()));
        }
        records.insert(identity.username.clone(), (identity.clone(), None));
        Ok(identity.clone())
    }

    async fn list_identities(&self) -> Result<Vec<Identity>> {
        self.check()?;
        let mut identities: Vec<Identity> = self
            .records
            .lock()
            .values()
            .map(|(identity, _)| identity.clone())
            .collect();
        identities.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(identities)
    }

    async fn get_password(&self, username: &str) -> Result<Option<PasswordHash>> {
        self.check()?;
        Ok(self
            .records
            .lock()
            .get(username)
            .and_then(|(_, password)| password.clone()))
    }

    async fn insert_with_password(
        &self,
        identity: &Identity,
        password: &PasswordHash,
    ) -> Result<Identity> {
        self.check()?;
        self.inserts.fetch_add(1, Ordering::SeqCst);

        let mut records = self.records.lock();
        if records.contains_key(&identity.username) {
            return Err(Error::Conflict(identity.username.clone()));
        }
        records.insert(
            identity.username.clone(),
            (identity.clone(), Some(password.clone())),
        );
        Ok(identity.clone())
    }
}
