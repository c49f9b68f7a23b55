//! Configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `BOOKSTORE_DATABASE_PATH` - SQLite database file (default: bookstore.db)
//! - `BOOKSTORE_HOST` - Bind address (default: 127.0.0.1)
//! - `BOOKSTORE_PORT` - Listen port (default: 5000)
//! - `BOOKSTORE_CORS_ORIGIN` - Allowed storefront origin (default: http://localhost:3000)
//! - `BOOKSTORE_DEFAULT_PAGE_SIZE` - Page size when a request omits it (default: 5)
//! - `BOOKSTORE_SESSION_IDLE_HOURS` - Session carts idle this long are discarded (default: 24)
//!
//! A `.env` file in the working directory is loaded first if present.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use chrono::Duration;

use crate::catalog::DEFAULT_PAGE_SIZE;
use crate::error::ConfigError;

const DEFAULT_DATABASE_PATH: &str = "bookstore.db";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_SESSION_IDLE_HOURS: u32 = 24;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_path: PathBuf,
    pub host: IpAddr,
    pub port: u16,
    pub cors_origin: String,
    pub default_page_size: usize,
    pub session_idle_hours: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            cors_origin: DEFAULT_CORS_ORIGIN.to_string(),
            default_page_size: DEFAULT_PAGE_SIZE,
            session_idle_hours: DEFAULT_SESSION_IDLE_HOURS,
        }
    }
}

impl Config {
    /// Load from the process environment (and `.env`, if any)
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env is normal
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let default_page_size = parse_or("BOOKSTORE_DEFAULT_PAGE_SIZE", &lookup, defaults.default_page_size)?;
        if default_page_size == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "BOOKSTORE_DEFAULT_PAGE_SIZE".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let session_idle_hours = parse_or("BOOKSTORE_SESSION_IDLE_HOURS", &lookup, defaults.session_idle_hours)?;
        if session_idle_hours == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "BOOKSTORE_SESSION_IDLE_HOURS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Config {
            database_path: lookup("BOOKSTORE_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            host: parse_or("BOOKSTORE_HOST", &lookup, defaults.host)?,
            port: parse_or("BOOKSTORE_PORT", &lookup, defaults.port)?,
            cors_origin: lookup("BOOKSTORE_CORS_ORIGIN").unwrap_or(defaults.cors_origin),
            default_page_size,
            session_idle_hours,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn session_idle(&self) -> Duration {
        Duration::hours(i64::from(self.session_idle_hours))
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}
