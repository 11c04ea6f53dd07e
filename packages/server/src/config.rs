use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Registration attempts before a sequence collision surfaces as a conflict
pub const DEFAULT_REGISTRATION_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    /// Emails / phone numbers that are always granted the super admin tier
    pub super_admin_identifiers: Vec<String>,
    /// Upper bound on registration attempts when sequence allocation collides
    pub registration_max_attempts: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_max_connections: match env::var("DATABASE_MAX_CONNECTIONS") {
                Ok(v) => v
                    .parse()
                    .context("DATABASE_MAX_CONNECTIONS must be a valid number")?,
                Err(_) => DEFAULT_DATABASE_MAX_CONNECTIONS,
            },
            super_admin_identifiers: env::var("SUPER_ADMIN_IDENTIFIERS")
                .map(|v| parse_identifier_list(&v))
                .unwrap_or_default(),
            registration_max_attempts: match env::var("REGISTRATION_MAX_ATTEMPTS") {
                Ok(v) => parse_max_attempts(&v)?,
                Err(_) => DEFAULT_REGISTRATION_MAX_ATTEMPTS,
            },
        })
    }
}

fn parse_identifier_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_max_attempts(raw: &str) -> Result<u32> {
    let attempts: u32 = raw
        .trim()
        .parse()
        .context("REGISTRATION_MAX_ATTEMPTS must be a valid number")?;
    anyhow::ensure!(attempts >= 1, "REGISTRATION_MAX_ATTEMPTS must be at least 1");
    Ok(attempts)
}
