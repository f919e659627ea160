use anyhow::{Context, Result, anyhow};
use chrono::FixedOffset;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,

    // Rate limiting
    pub rate_protected_per_min: u32,
    pub rate_generate_per_min: u32,

    pub api_prefix: String,

    /// Offset used to cut check-in timestamps into calendar days
    pub reporting_offset: FixedOffset,
    /// Employees aggregated at once during batch generation
    pub batch_concurrency: usize,
    pub assignment_cache_ttl_secs: u64,

    pub log_dir: String,
    pub log_level: tracing::Level,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn optional<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse::<T>()
        .map_err(|e| anyhow!("{key} has an invalid value {raw:?}: {e}"))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let offset_minutes: i32 = optional("REPORTING_UTC_OFFSET_MINUTES", "0")?;
        let reporting_offset = FixedOffset::east_opt(offset_minutes * 60)
            .ok_or_else(|| anyhow!("REPORTING_UTC_OFFSET_MINUTES out of range: {offset_minutes}"))?;

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,

            rate_protected_per_min: optional("RATE_PROTECTED_PER_MIN", "1000")?,
            rate_generate_per_min: optional("RATE_GENERATE_PER_MIN", "10")?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            reporting_offset,
            batch_concurrency: optional::<usize>("BATCH_CONCURRENCY", "4")?.max(1),
            assignment_cache_ttl_secs: optional("ASSIGNMENT_CACHE_TTL_SECS", "300")?,

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: optional("LOG_LEVEL", "debug")?,
        })
    }
}
