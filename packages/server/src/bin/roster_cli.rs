//! Operator CLI for the roster core
//!
//! Every command prints a single JSON document to stdout.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use roster_core::config::Config;
use roster_core::domains::events::{Event, WindowPolicy};
use roster_core::domains::member::{
    register_member, CommunityId, Member, RegistrationInput, RegistrationPolicy,
};
use serde::Serialize;
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "roster_cli")]
#[command(about = "Member registration and event check-in tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply database migrations
    Migrate,

    /// Register a member from a JSON registration form
    Register {
        /// Path to a JSON file with the registration form
        input: PathBuf,
    },

    /// Look up a member by community identifier
    Lookup { community_id: String },

    /// Evaluate check-in eligibility for one event
    CheckIn {
        event_id: Uuid,
        /// Evaluate at this instant (RFC 3339) instead of now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// List all events in check-in order
    Events {
        /// Evaluate at this instant (RFC 3339) instead of now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
}

fn output(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,roster_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    let pool = connect(&config).await?;

    match cli.command {
        Commands::Migrate => cmd_migrate(&pool).await,
        Commands::Register { input } => cmd_register(&input, &config, &pool).await,
        Commands::Lookup { community_id } => cmd_lookup(&community_id, &pool).await,
        Commands::CheckIn { event_id, at } => cmd_check_in(event_id, at, &pool).await,
        Commands::Events { at } => cmd_events(at, &pool).await,
    }
}

async fn connect(config: &Config) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")
}

// ============================================================================
// Commands
// ============================================================================

async fn cmd_migrate(pool: &PgPool) -> Result<()> {
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    output(&json!({ "success": true }))
}

async fn cmd_register(path: &Path, config: &Config, pool: &PgPool) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let input: RegistrationInput =
        serde_json::from_str(&raw).context("Registration form is not valid JSON")?;

    match register_member(&input, &RegistrationPolicy::from(config), pool).await {
        Ok(registration) => output(&json!({ "success": true, "registration": registration })),
        Err(e) => output(&json!({
            "success": false,
            "error": e.kind(),
            "message": e.to_string(),
        })),
    }
}

async fn cmd_lookup(raw: &str, pool: &PgPool) -> Result<()> {
    let community_id = match CommunityId::parse(raw) {
        Ok(id) => id,
        Err(e) => {
            return output(&json!({
                "success": false,
                "error": "invalid_community_id",
                "message": e.to_string(),
            }))
        }
    };

    let member = Member::find_by_community_id(&community_id, pool).await?;
    output(&json!({ "success": member.is_some(), "member": member }))
}

async fn cmd_check_in(event_id: Uuid, at: Option<DateTime<Utc>>, pool: &PgPool) -> Result<()> {
    let event = Event::find_by_id(event_id, pool)
        .await
        .with_context(|| format!("Event {event_id} not found"))?;
    let now = at.unwrap_or_else(Utc::now);

    let schedule = event.schedule();
    output(&WindowPolicy::default().evaluate(event, &schedule, now))
}

async fn cmd_events(at: Option<DateTime<Utc>>, pool: &PgPool) -> Result<()> {
    let now = at.unwrap_or_else(Utc::now);
    let listed = Event::list_for_check_in(&WindowPolicy::default(), now, pool).await?;
    output(&listed)
}
