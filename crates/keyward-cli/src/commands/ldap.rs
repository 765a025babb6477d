//! test-connection command - check LDAP settings before using them

use super::CommandContext;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use keyward_auth::ConnectionTester;
use keyward_core::DirectoryConfig;

/// Overrides applied on top of the configured `[ldap]` section
#[derive(Args, Debug, Default)]
pub struct CandidateArgs {
    #[arg(long)]
    pub url: Option<String>,

    #[arg(long)]
    pub search_dn: Option<String>,

    #[arg(long, env = "KEYWARD_LDAP_SEARCH_PASSWORD", hide_env_values = true)]
    pub search_password: Option<String>,

    #[arg(long)]
    pub base_dn: Option<String>,

    /// Attribute holding the username
    #[arg(long)]
    pub uid: Option<String>,

    #[arg(long)]
    pub filter: Option<String>,

    /// 0 = base, 1 = one level, 2 = subtree
    #[arg(long, allow_negative_numbers = true)]
    pub scope: Option<i64>,

    /// Connection timeout in seconds
    #[arg(long, allow_negative_numbers = true)]
    pub timeout: Option<i64>,

    #[arg(long)]
    pub verify_cert: Option<bool>,

    #[arg(long)]
    pub start_tls: bool,
}

impl CandidateArgs {
    fn apply(self, mut config: DirectoryConfig) -> DirectoryConfig {
        if let Some(url) = self.url {
            config.url = url;
        }
        if let Some(dn) = self.search_dn {
            config.search_dn = dn;
        }
        if let Some(password) = self.search_password {
            config.search_password = password;
        }
        if let Some(base) = self.base_dn {
            config.base_dn = base;
        }
        if let Some(uid) = self.uid {
            config.uid_attribute = uid;
        }
        if let Some(filter) = self.filter {
            config.filter = filter;
        }
        if let Some(scope) = self.scope {
            config.scope = scope;
        }
        if let Some(timeout) = self.timeout {
            config.connection_timeout_seconds = timeout;
        }
        if let Some(verify) = self.verify_cert {
            config.verify_cert = verify;
        }
        if self.start_tls {
            config.start_tls = true;
        }
        config
    }
}

pub async fn test_connection(ctx: &CommandContext, args: CandidateArgs) -> Result<()> {
    let candidate = args.apply(ctx.config.ldap.clone());
    let report = ConnectionTester::default().test_connection(&candidate).await?;

    if ctx.is_json() {
        return ctx.print_json(&report);
    }

    println!("{}: {}", "connected".green(), report.url);
    println!(
        "  bound as: {}",
        report.bound_as.as_deref().unwrap_or("(anonymous)")
    );
    println!("  filter:   {}", report.filter);
    println!("  sampled:  {}", report.entries_sampled);
    Ok(())
}
