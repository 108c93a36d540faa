//! Process configuration read from the environment.
//!
//! `.env` is loaded by the binary before [`AppConfig::from_env`] runs.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono_tz::Tz;

use crate::cache::DEFAULT_TTL;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://gtfs_rt_archive.db?mode=rwc";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_TIMEZONE: Tz = Tz::America__New_York;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `DATABASE_URL`
    pub database_url: String,
    /// `BIND_ADDR`
    pub bind_addr: SocketAddr,
    /// `CACHE_TTL_SECS`
    pub cache_ttl: Duration,
    /// `FETCH_TIMEOUT_SECS`
    pub fetch_timeout: Duration,
    /// `FEED_TIMEZONE`, used to render arrival wall-clock times.
    pub timezone: Tz,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; unset or empty keys
    /// take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("BIND_ADDR must be a socket address such as 0.0.0.0:8080")?;

        let cache_ttl = match get("CACHE_TTL_SECS") {
            Some(v) => parse_secs("CACHE_TTL_SECS", &v)?,
            None => DEFAULT_TTL,
        };

        let fetch_timeout = match get("FETCH_TIMEOUT_SECS") {
            Some(v) => parse_secs("FETCH_TIMEOUT_SECS", &v)?,
            None => DEFAULT_FETCH_TIMEOUT,
        };

        let timezone = match get("FEED_TIMEZONE") {
            Some(v) => v
                .parse::<Tz>()
                .map_err(|e| anyhow::anyhow!("FEED_TIMEZONE {v:?} is not an IANA time zone: {e}"))?,
            None => DEFAULT_TIMEZONE,
        };

        Ok(Self {
            database_url,
            bind_addr,
            cache_ttl,
            fetch_timeout,
            timezone,
        })
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    let secs: u64 = value
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a whole number of seconds, got {value:?}"))?;
    Ok(Duration::from_secs(secs))
}
