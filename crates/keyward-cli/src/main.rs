//! Keyward - pluggable authentication against a local store or an LDAP directory

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use commands::CommandContext;
use keyward_core::KeywardConfig;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "keyward")]
#[command(author = "Keyward Team")]
#[command(version = keyward_core::VERSION)]
#[command(about = "Authenticate and onboard users from a database or LDAP directory", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, env = "KEYWARD_CONFIG")]
    config: Option<String>,

    /// Authentication mode override (db_auth, ldap_auth)
    #[arg(long, global = true, env = "KEYWARD_AUTH_MODE")]
    mode: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "KEYWARD_LOG_LEVEL")]
    log_level: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Suppress informational output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up a user with the active provider
    SearchUser {
        username: String,
    },

    /// Verify a username and password with the active provider
    Authenticate {
        username: String,

        #[arg(long, env = "KEYWARD_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Authenticate, then onboard the user into the local store
    Login {
        username: String,

        #[arg(long, env = "KEYWARD_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Look a user up with the active provider and store it locally
    Onboard {
        username: String,
    },

    /// Create a local user
    Useradd {
        username: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        realname: Option<String>,

        #[arg(long, env = "KEYWARD_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// List users in the local store
    ListUsers,

    /// Check LDAP settings without activating them
    TestConnection(commands::ldap::CandidateArgs),
}

#[tokio::main]
async fn main() {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        let code = e
            .downcast_ref::<keyward_core::Error>()
            .map(|e| e.code())
            .unwrap_or("Error");
        eprintln!("{} [{}]: {:#}", "error".red().bold(), code, e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => KeywardConfig::from_file(path)?,
        None => KeywardConfig::from_env()?,
    };
    if let Some(mode) = &cli.mode {
        config.auth.mode = mode.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    init_logging(&config);
    debug!("Auth mode: {}", config.auth.mode);

    let ctx = CommandContext {
        config,
        output_format: cli.output,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::SearchUser { username } => commands::user::search(&ctx, &username).await,
        Commands::Authenticate { username, password } => {
            commands::login::authenticate(&ctx, &username, &password).await
        }
        Commands::Login { username, password } => {
            commands::login::login(&ctx, &username, &password).await
        }
        Commands::Onboard { username } => commands::user::onboard(&ctx, &username).await,
        Commands::Useradd {
            username,
            email,
            realname,
            password,
        } => commands::user::add(&ctx, &username, &email, realname, &password).await,
        Commands::ListUsers => commands::user::list(&ctx).await,
        Commands::TestConnection(args) => commands::ldap::test_connection(&ctx, args).await,
    }
}

fn init_logging(config: &KeywardConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    // Logs go to stderr so command output stays parseable
    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(filter)
            .init();
    }
}
