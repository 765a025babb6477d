//! Identity repository backed by SQLite

use chrono::Utc;
use keyward_core::types::{Identity, IdentitySource};
use keyward_core::{Error, Result};
use keyward_crypto::{HashAlgorithm, PasswordHash};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

pub struct IdentityStore {
    pool: SqlitePool,
}

type IdentityRow = (String, String, String, String, Option<String>);

impl IdentityStore {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(store_error)?;

        let store = Self { pool };
        store.init().await?;

        Ok(store)
    }

    /// Private in-memory database. A single connection is kept open for the
    /// lifetime of the pool since every new SQLite memory connection starts
    /// empty.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(store_error)?;

        let store = Self { pool };
        store.init().await?;

        Ok(store)
    }

    async fn init(&self) -> Result<()> {
        // username uses the default BINARY collation, so lookups are
        // case-sensitive
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS identities (
                username TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                realname TEXT NOT NULL,
                source TEXT NOT NULL,
                external_uid TEXT,
                password_hash TEXT,
                password_salt TEXT,
                password_algorithm TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        info!("Identity store initialized");
        Ok(())
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<Identity>> {
        let row: Option<IdentityRow> = sqlx::query_as(
            r#"
            SELECT username, email, realname, source, external_uid
            FROM identities WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        row.map(identity_from_row).transpose()
    }

    pub async fn insert_if_absent(&self, identity: &Identity) -> Result<Identity> {
        self.insert(identity, None).await
    }

    /// Insert a local account and its password in a single statement
    pub async fn insert_with_password(
        &self,
        identity: &Identity,
        password: &PasswordHash,
    ) -> Result<Identity> {
        self.insert(identity, Some(password)).await
    }

    async fn insert(&self, identity: &Identity, password: Option<&PasswordHash>) -> Result<Identity> {
        sqlx::query(
            r#"
            INSERT INTO identities (
                username, email, realname, source, external_uid,
                password_hash, password_salt, password_algorithm, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&identity.username)
        .bind(&identity.email)
        .bind(&identity.realname)
        .bind(identity.source.as_str())
        .bind(&identity.external_uid)
        .bind(password.map(|p| p.hash.as_str()))
        .bind(password.map(|p| p.salt.as_str()))
        .bind(password.map(|p| p.algorithm.as_str()))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let unique = e
                .as_database_error()
                .map(|db| db.is_unique_violation())
                .unwrap_or(false);
            if unique {
                Error::Conflict(identity.username.clone())
            } else {
                store_error(e)
            }
        })?;

        debug!("Inserted identity: {} ({})", identity.username, identity.source);
        Ok(identity.clone())
    }

    pub async fn list_identities(&self) -> Result<Vec<Identity>> {
        let rows: Vec<IdentityRow> = sqlx::query_as(
            r#"
            SELECT username, email, realname, source, external_uid
            FROM identities
            ORDER BY username
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        rows.into_iter().map(identity_from_row).collect()
    }

    pub async fn get_password(&self, username: &str) -> Result<Option<PasswordHash>> {
        let row: Option<(Option<String>, Option<String>, Option<String>)> = sqlx::query_as(
            r#"
            SELECT password_hash, password_salt, password_algorithm
            FROM identities WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        match row {
            Some((Some(hash), Some(salt), Some(algorithm))) => {
                let algorithm = HashAlgorithm::parse(&algorithm).ok_or_else(|| {
                    Error::StoreUnavailable(format!(
                        "unknown password algorithm '{}' for {}",
                        algorithm, username
                    ))
                })?;
                Ok(Some(PasswordHash {
                    hash,
                    salt,
                    algorithm,
                }))
            }
            _ => Ok(None),
        }
    }
}

fn identity_from_row(r: IdentityRow) -> Result<Identity> {
    let source = IdentitySource::parse(&r.3).ok_or_else(|| {
        Error::StoreUnavailable(format!("unknown identity source '{}' for {}", r.3, r.0))
    })?;

    Ok(Identity {
        username: r.0,
        email: r.1,
        realname: r.2,
        source,
        external_uid: r.4,
    })
}

fn store_error(e: sqlx::Error) -> Error {
    Error::StoreUnavailable(e.to_string())
}

// ============= IdentityRepository Trait Implementation =============

use crate::traits::IdentityRepository;
use async_trait::async_trait;

#[async_trait]
impl IdentityRepository for IdentityStore {
    async fn get_by_username(&self, username: &str) -> Result<Option<Identity>> {
        IdentityStore::get_by_username(self, username).await
    }

    async fn insert_if_absent(&self, identity: &Identity) -> Result<Identity> {
        IdentityStore::insert_if_absent(self, identity).await
    }

    async fn list_identities(&self) -> Result<Vec<Identity>> {
        IdentityStore::list_identities(self).await
    }

    async fn get_password(&self, username: &str) -> Result<Option<PasswordHash>> {
        IdentityStore::get_password(self, username).await
    }

    async fn insert_with_password(
        &self,
        identity: &Identity,
        password: &PasswordHash,
    ) -> Result<Identity> {
        IdentityStore::insert_with_password(self, identity, password).await
    }
}
