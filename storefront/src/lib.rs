// storefront/src/lib.rs

//! Storefront backend: catalog, orders, banners, contact inbox and a keyword
//! shop assistant behind a JSON HTTP API.

pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod services;
pub mod state;
pub mod web;

use std::sync::Arc;

use crate::config::{AppConfig, StorageBackend};
use crate::db::{MemoryStore, PgStore, Store};
use crate::errors::{AppError, Result};
use crate::services::auth_service;

/// Builds the configured store. Postgres connections are migrated before use.
pub async fn build_store(config: &AppConfig) -> Result<Arc<dyn Store>> {
  match config.storage_backend {
    StorageBackend::Memory => {
      tracing::warn!("Using the in-memory store; data is lost on restart.");
      Ok(Arc::new(MemoryStore::new()))
    }
    StorageBackend::Postgres => {
      let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| AppError::Config("DATABASE_URL is required for the postgres backend".to_string()))?;
      let store = PgStore::connect(url).await?;
      tracing::info!("Successfully connected to the database.");
      store.migrate().await?;
      tracing::info!("Database migrations applied.");
      Ok(Arc::new(store))
    }
  }
}

/// Creates or resets the staff account named in the configuration, if any.
pub async fn bootstrap(store: &dyn Store, config: &AppConfig) -> Result<()> {
  if let Some(admin) = &config.admin_bootstrap {
    auth_service::bootstrap_admin(store, admin).await?;
  }
  Ok(())
}
