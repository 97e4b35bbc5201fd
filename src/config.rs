use std::env;
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub secret: String,
    pub bind_addr: String,
    pub token_ttl_hours: i64,
    pub seed_demo_data: bool,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

impl Config {
    /// Reads `.env` (if present) and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let token_ttl_hours = match env::var("TOKEN_TTL_HOURS") {
            Ok(value) => value.parse::<i64>().ok().filter(|h| *h > 0).ok_or(
                ConfigError::Invalid {
                    name: "TOKEN_TTL_HOURS",
                    value,
                },
            )?,
            Err(_) => 24,
        };

        let seed_demo_data = match env::var("SEED_DEMO_DATA") {
            Ok(value) => parse_flag(&value).ok_or(ConfigError::Invalid {
                name: "SEED_DEMO_DATA",
                value,
            })?,
            Err(_) => false,
        };

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            secret: required("SECRET")?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_owned()),
            token_ttl_hours,
            seed_demo_data,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
