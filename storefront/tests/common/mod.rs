// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use actix_web::body::MessageBody;
use actix_web::dev::ServiceResponse;
use actix_web::http::StatusCode;
use chrono::Utc;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::Level;
use uuid::Uuid;

use storefront::config::AppConfig;
use storefront::db::{MemoryStore, Store};
use storefront::models::{Product, User};
use storefront::services::auth_service::hash_password;
use storefront::services::token_service::TokenKind;
use storefront::state::AppState;

pub const PASSWORD: &str = "harbour-pass-1";

// Hashing is slow in debug builds, so every seeded account shares one hash.
static PASSWORD_HASH: Lazy<String> = Lazy::new(|| hash_password(PASSWORD).expect("hash test password"));

// --- Helper for Tracing Setup (call once per test run if needed) ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

pub fn test_config() -> AppConfig {
  let media_root = std::env::temp_dir().join(format!("storefront-test-media-{}", Uuid::new_v4()));
  let vars: HashMap<&str, String> = [
    ("STORAGE_BACKEND", "memory".to_string()),
    ("JWT_SECRET", "integration-test-secret".to_string()),
    ("MEDIA_ROOT", media_root.display().to_string()),
  ]
  .into_iter()
  .collect();
  AppConfig::from_lookup(|name| vars.get(name).cloned()).expect("test config")
}

/// Application state over a fresh in-memory store. The concrete store is
/// returned too so tests can seed and inspect it directly.
pub fn test_state() -> (AppState, Arc<MemoryStore>) {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let state = AppState::new(store.clone() as Arc<dyn Store>, test_config());
  (state, store)
}

/// Builds an initialised test service with every API route mounted.
#[macro_export]
macro_rules! init_app {
  ($state:expr) => {
    actix_web::test::init_service(
      actix_web::App::new()
        .app_data(actix_web::web::Data::new($state.clone()))
        .configure(storefront::web::configure_app_routes)
        .default_service(actix_web::web::to(storefront::web::not_found_handler)),
    )
    .await
  };
}

pub async fn seed_user(store: &MemoryStore, username: &str, is_staff: bool) -> User {
  let user = User {
    id: Uuid::new_v4(),
    username: username.to_string(),
    email: format!("{}@harbour.example", username.to_lowercase()),
    first_name: String::new(),
    last_name: String::new(),
    password_hash: PASSWORD_HASH.clone(),
    is_staff,
    date_joined: Utc::now(),
  };
  store.insert_user(&user).await.expect("insert user");
  user
}

pub async fn seed_product(store: &MemoryStore, name: &str, category: &str, price: Decimal) -> Product {
  let mut product = Product::draft();
  product.name = name.to_string();
  product.description = format!("Fresh {}", name.to_lowercase());
  product.category = category.to_string();
  product.price = price;
  product.stock_quantity = 10;
  store.insert_product(&product).await.expect("insert product");
  product
}

/// `Authorization` header value carrying a fresh access token for `user`.
pub fn bearer(state: &AppState, user: &User) -> (&'static str, String) {
  let token = state.tokens.issue(user, TokenKind::Access).expect("issue token");
  ("Authorization", format!("Bearer {}", token))
}

pub async fn read_json<B: MessageBody>(resp: ServiceResponse<B>) -> (StatusCode, Value) {
  let status = resp.status();
  let body = actix_web::test::read_body(resp).await;
  let json = if body.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&body).expect("JSON response body")
  };
  (status, json)
}
