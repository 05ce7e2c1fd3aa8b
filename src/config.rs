// src/config.rs
use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Connection settings for the chat history database
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Full connection string; when present it overrides the individual DB_* parts
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub encrypt: bool,
    pub trust_server_certificate: bool,
    pub max_connections: u32,
    pub idle_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini: GeminiConfig,
    pub database: DatabaseConfig,
    pub port: u16,
}

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

impl Config {
    /// Read the whole configuration from the process environment.
    ///
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`Config::from_env`] but with a pluggable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = non_empty(&lookup, "GEMINI_API_KEY").ok_or(ConfigError::Missing("GEMINI_API_KEY"))?;

        let gemini = GeminiConfig {
            api_key,
            model: non_empty(&lookup, "GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: non_empty(&lookup, "GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            timeout: parse_opt::<u64, _>(&lookup, "GEMINI_TIMEOUT_SECS")?.map(Duration::from_secs),
        };

        let database = DatabaseConfig::from_lookup(&lookup)?;
        let port = parse_opt(&lookup, "PORT")?.unwrap_or(5000);

        Ok(Self { gemini, database, port })
    }
}

impl DatabaseConfig {
    /// Database settings alone, for tools that never talk to Gemini.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|name: &str| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            url: non_empty(lookup, "DATABASE_URL"),
            host: non_empty(lookup, "DB_HOST").unwrap_or_else(|| "localhost".to_string()),
            port: parse_opt(lookup, "DB_PORT")?.unwrap_or(5432),
            user: non_empty(lookup, "DB_USER"),
            password: non_empty(lookup, "DB_PASSWORD"),
            database: non_empty(lookup, "DB_NAME").or_else(|| non_empty(lookup, "DB_DATABASE")),
            encrypt: flag(non_empty(lookup, "DB_ENCRYPT")),
            trust_server_certificate: flag(non_empty(lookup, "DB_TRUST_SERVER_CERTIFICATE")),
            max_connections: parse_opt(lookup, "DB_MAX_CONNECTIONS")?.unwrap_or(10),
            idle_timeout: Duration::from_secs(parse_opt(lookup, "DB_IDLE_TIMEOUT_SECS")?.unwrap_or(30)),
        })
    }
}

fn non_empty<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|v| !v.trim().is_empty())
}

// Only the literal "true" turns a flag on
fn flag(value: Option<String>) -> bool {
    value.as_deref() == Some("true")
}

fn parse_opt<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup, name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}
