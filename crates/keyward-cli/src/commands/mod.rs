//! CLI command implementations

pub mod ldap;
pub mod login;
pub mod user;

use crate::OutputFormat;
use anyhow::Result;
use colored::Colorize;
use keyward_auth::{AuthService, DirectoryClient};
use keyward_core::{ConfigProvider, Identity, KeywardConfig};
use keyward_metadata::IdentityStore;
use serde::Serialize;
use std::sync::Arc;

/// Context passed to all commands
pub struct CommandContext {
    pub config: KeywardConfig,
    pub output_format: OutputFormat,
    pub quiet: bool,
}

impl CommandContext {
    /// Open the identity store and wire the service over it. Only commands
    /// that read or write identities call this.
    pub async fn service(&self) -> Result<AuthService> {
        let database = &self.config.database;
        let store = IdentityStore::new(&database.url, database.max_connections).await?;
        let provider: Arc<dyn ConfigProvider> = Arc::new(self.config.clone());
        Ok(AuthService::build(
            provider,
            Arc::new(store),
            DirectoryClient::default(),
        ))
    }

    /// Check if output should be JSON
    pub fn is_json(&self) -> bool {
        matches!(self.output_format, OutputFormat::Json)
    }

    /// Print info message if not quiet
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg);
        }
    }

    pub fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    pub fn print_identity(&self, identity: &Identity) -> Result<()> {
        if self.is_json() {
            return self.print_json(identity);
        }

        println!("{:<10} {}", "username:".bold(), identity.username);
        println!("{:<10} {}", "email:".bold(), identity.email);
        println!("{:<10} {}", "realname:".bold(), identity.realname);
        println!("{:<10} {}", "source:".bold(), identity.source);
        if let Some(uid) = &identity.external_uid {
            println!("{:<10} {}", "dn:".bold(), uid);
        }
        Ok(())
    }
}
