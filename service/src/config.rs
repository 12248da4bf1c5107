// basket_service/src/config.rs

use crate::errors::{AppError, Result}; // Use AppError specific Result
use basket::RetryPolicy;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub nats_url: String,
  pub db_max_connections: u32,

  // Bounded retry around store and broker connection at startup
  pub startup_connect_attempts: u32,
  pub startup_connect_delay: Duration,

  // Deliveries before an unpersistable intent is dead-lettered
  pub consumer_max_deliver: u32,
  pub redelivery_base_delay: Duration,
}

/// Upper bound for the redelivery backoff.
const MAX_REDELIVERY_DELAY: Duration = Duration::from_secs(30);

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the config from any variable lookup. `from_env` passes the process
  /// environment; tests pass a map.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let required = |var_name: &str| {
      lookup(var_name)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", var_name)))
    };
    let raw_or = |var_name: &str, default: &str| lookup(var_name).unwrap_or_else(|| default.to_string());

    let server_host = lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = parse_var::<u16>("SERVER_PORT", &raw_or("SERVER_PORT", "8080"))?;
    let database_url = required("DATABASE_URL")?;
    let nats_url = required("NATS_URL")?;

    let db_max_connections = parse_var::<u32>("DB_MAX_CONNECTIONS", &raw_or("DB_MAX_CONNECTIONS", "10"))?;
    let startup_connect_attempts =
      parse_var::<u32>("STARTUP_CONNECT_ATTEMPTS", &raw_or("STARTUP_CONNECT_ATTEMPTS", "5"))?;
    let startup_connect_delay = Duration::from_secs(parse_var::<u64>(
      "STARTUP_CONNECT_DELAY_SECS",
      &raw_or("STARTUP_CONNECT_DELAY_SECS", "2"),
    )?);
    let consumer_max_deliver = parse_var::<u32>("CONSUMER_MAX_DELIVER", &raw_or("CONSUMER_MAX_DELIVER", "5"))?;
    let redelivery_base_delay = Duration::from_millis(parse_var::<u64>(
      "REDELIVERY_BASE_DELAY_MS",
      &raw_or("REDELIVERY_BASE_DELAY_MS", "500"),
    )?);

    if startup_connect_attempts == 0 || consumer_max_deliver == 0 {
      return Err(AppError::Config(
        "STARTUP_CONNECT_ATTEMPTS and CONSUMER_MAX_DELIVER must be at least 1".to_string(),
      ));
    }

    tracing::info!("Application configuration loaded successfully.");
    // Connection URLs may carry credentials; they are never logged.

    Ok(Self {
      server_host,
      server_port,
      database_url,
      nats_url,
      db_max_connections,
      startup_connect_attempts,
      startup_connect_delay,
      consumer_max_deliver,
      redelivery_base_delay,
    })
  }

  pub fn server_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }

  pub fn startup_retry_policy(&self) -> RetryPolicy {
    RetryPolicy::fixed(self.startup_connect_attempts, self.startup_connect_delay)
  }

  pub fn redelivery_policy(&self) -> RetryPolicy {
    RetryPolicy::exponential(
      self.consumer_max_deliver,
      self.redelivery_base_delay,
      MAX_REDELIVERY_DELAY.max(self.redelivery_base_delay),
    )
  }
}

fn parse_var<T>(var_name: &str, raw: &str) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  raw
    .trim()
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {}: {}", var_name, e)))
}
