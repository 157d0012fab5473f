// storefront/src/models/banner.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Banner {
  pub id: Uuid,
  pub title: String,
  pub image: Option<String>,
  pub link_url: Option<String>,
  pub active: bool,
  pub created_at: DateTime<Utc>,
}

impl Banner {
  pub fn draft() -> Self {
    Self {
      id: Uuid::new_v4(),
      title: String::new(),
      image: None,
      link_url: None,
      active: true,
      created_at: Utc::now(),
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct BannerChanges {
  pub title: Option<String>,
  pub link_url: Option<Option<String>>,
  pub active: Option<bool>,
}

impl BannerChanges {
  pub fn apply(self, banner: &mut Banner) {
    if let Some(title) = self.title {
      banner.title = title;
    }
    if let Some(link_url) = self.link_url {
      banner.link_url = link_url;
    }
    if let Some(active) = self.active {
      banner.active = active;
    }
  }
}
