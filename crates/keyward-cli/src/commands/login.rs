//! authenticate and login commands

use super::CommandContext;
use anyhow::Result;
use colored::Colorize;
use keyward_core::Credentials;

pub async fn authenticate(ctx: &CommandContext, username: &str, password: &str) -> Result<()> {
    let identity = ctx
        .service()
        .await?
        .authenticate(&Credentials::new(username, password))
        .await?;

    ctx.info(&format!("{}: {}", "authenticated".green(), identity.username));
    ctx.print_identity(&identity)
}

/// Authenticate and onboard in one step
pub async fn login(ctx: &CommandContext, username: &str, password: &str) -> Result<()> {
    let identity = ctx
        .service()
        .await?
        .login(&Credentials::new(username, password))
        .await?;

    ctx.info(&format!("{}: {}", "logged in".green(), identity.username));
    ctx.print_identity(&identity)
}
