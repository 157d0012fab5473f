// storefront/src/state.rs
use crate::config::AppConfig;
use crate::db::Store;
use crate::services::media_service::MediaStorage;
use crate::services::token_service::TokenService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn Store>,
  pub tokens: Arc<TokenService>,
  pub media: Arc<MediaStorage>,
  pub config: Arc<AppConfig>, // Share loaded config
}

impl AppState {
  pub fn new(store: Arc<dyn Store>, config: AppConfig) -> Self {
    let tokens = TokenService::new(&config.jwt_secret, config.access_token_ttl, config.refresh_token_ttl);
    let media = MediaStorage::new(config.media_root.clone(), &config.media_url);
    Self {
      store,
      tokens: Arc::new(tokens),
      media: Arc::new(media),
      config: Arc::new(config),
    }
  }
}
