// storefront/src/config.rs

use crate::errors::{AppError, Result};
use chrono::Duration;
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_CORS_ORIGINS: &str =
  "http://localhost:5173,http://127.0.0.1:5173,http://localhost:5174,http://127.0.0.1:5174";

/// Which `Store` implementation backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
  Postgres,
  Memory,
}

impl FromStr for StorageBackend {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
      "memory" => Ok(StorageBackend::Memory),
      other => Err(AppError::Config(format!("Unknown STORAGE_BACKEND '{}'", other))),
    }
  }
}

/// Staff account created or reset at startup.
#[derive(Debug, Clone)]
pub struct AdminBootstrap {
  pub username: String,
  pub email: String,
  pub password: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub storage_backend: StorageBackend,
  pub database_url: Option<String>,

  pub jwt_secret: String,
  pub access_token_ttl: Duration,
  pub refresh_token_ttl: Duration,

  pub cors_allowed_origins: Vec<String>,

  pub media_root: PathBuf,
  pub media_url: String,

  pub admin_bootstrap: Option<AdminBootstrap>,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the configuration from any variable source. `from_env` passes the
  /// process environment; tests pass a map.
  pub fn from_lookup<F>(lookup: F) -> Result<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    let get_env = |var_name: &str| {
      lookup(var_name)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", var_name)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = parse_var("SERVER_PORT", get_env("SERVER_PORT").ok(), 8080u16)?;

    let storage_backend = get_env("STORAGE_BACKEND")
      .unwrap_or_else(|_| "postgres".to_string())
      .parse::<StorageBackend>()?;
    let database_url = match storage_backend {
      StorageBackend::Postgres => Some(get_env("DATABASE_URL")?),
      StorageBackend::Memory => get_env("DATABASE_URL").ok(),
    };

    let jwt_secret = get_env("JWT_SECRET")?;
    let access_minutes = parse_var("ACCESS_TOKEN_TTL_MINUTES", get_env("ACCESS_TOKEN_TTL_MINUTES").ok(), 24 * 60i64)?;
    let refresh_days = parse_var("REFRESH_TOKEN_TTL_DAYS", get_env("REFRESH_TOKEN_TTL_DAYS").ok(), 7i64)?;
    if access_minutes <= 0 || refresh_days <= 0 {
      return Err(AppError::Config("Token lifetimes must be positive".to_string()));
    }

    let cors_allowed_origins = get_env("CORS_ALLOWED_ORIGINS")
      .unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.to_string())
      .split(',')
      .map(|origin| origin.trim().trim_end_matches('/').to_string())
      .filter(|origin| !origin.is_empty())
      .collect();

    let media_root = PathBuf::from(get_env("MEDIA_ROOT").unwrap_or_else(|_| "./media".to_string()));
    let media_url = get_env("MEDIA_URL").unwrap_or_else(|_| "/media".to_string());
    let media_url = format!("/{}", media_url.trim_matches('/'));

    let admin_bootstrap = match (get_env("ADMIN_USERNAME"), get_env("ADMIN_PASSWORD")) {
      (Ok(username), Ok(password)) => {
        let email = get_env("ADMIN_EMAIL").unwrap_or_else(|_| format!("{}@localhost", username));
        Some(AdminBootstrap { username, email, password })
      }
      (Ok(_), Err(_)) => {
        return Err(AppError::Config(
          "ADMIN_USERNAME is set but ADMIN_PASSWORD is missing".to_string(),
        ))
      }
      _ => None,
    };

    tracing::info!(
      backend = ?storage_backend,
      host = %server_host,
      port = server_port,
      "Application configuration loaded successfully."
    );

    Ok(Self {
      server_host,
      server_port,
      storage_backend,
      database_url,
      jwt_secret,
      access_token_ttl: Duration::minutes(access_minutes),
      refresh_token_ttl: Duration::days(refresh_days),
      cors_allowed_origins,
      media_root,
      media_url,
      admin_bootstrap,
    })
  }
}

fn parse_var<T>(name: &str, raw: Option<String>, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match raw {
    None => Ok(default),
    Some(value) => value
      .trim()
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {}: {}", name, e))),
  }
}
