//! User commands - search-user, onboard, useradd, list-users

use super::CommandContext;
use anyhow::{Context, Result};
use colored::Colorize;
use keyward_core::Identity;

pub async fn search(ctx: &CommandContext, username: &str) -> Result<()> {
    let identity = ctx.service().await?.search_user(username).await?;
    ctx.print_identity(&identity)
}

/// Look the user up with the active provider, then make it durable
pub async fn onboard(ctx: &CommandContext, username: &str) -> Result<()> {
    let service = ctx.service().await?;
    let found = service
        .search_user(username)
        .await
        .with_context(|| format!("Failed to look up {}", username))?;
    let identity = service.on_board_user(&found).await?;

    ctx.info(&format!("{}: {}", "onboarded".green(), identity.username));
    ctx.print_identity(&identity)
}

pub async fn add(
    ctx: &CommandContext,
    username: &str,
    email: &str,
    realname: Option<String>,
    password: &str,
) -> Result<()> {
    if password.is_empty() {
        anyhow::bail!("Password cannot be empty");
    }

    let realname = realname.unwrap_or_else(|| username.to_string());
    let identity = ctx
        .service()
        .await?
        .register(&Identity::local(username, email, realname), password)
        .await?;

    ctx.info(&format!("{}: {}", "created".green(), identity.username));
    Ok(())
}

pub async fn list(ctx: &CommandContext) -> Result<()> {
    let users = ctx.service().await?.list_users().await?;

    if ctx.is_json() {
        return ctx.print_json(&users);
    }

    for user in &users {
        println!(
            "{:<24} {:<10} {}",
            user.username,
            user.source.as_str().cyan(),
            user.email
        );
    }
    ctx.info(&format!("\n{} user(s)", users.len()));
    Ok(())
}
