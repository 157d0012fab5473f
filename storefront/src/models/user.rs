// storefront/src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
  pub id: Uuid,
  pub username: String,
  pub email: String,
  pub first_name: String,
  pub last_name: String,
  #[serde(skip_serializing)] // Never send password hash to client
  pub password_hash: String,
  pub is_staff: bool,
  pub date_joined: DateTime<Utc>,
}

impl User {
  /// Case-insensitive match on either the username or the email.
  pub fn matches_login(&self, login: &str) -> bool {
    self.username.eq_ignore_ascii_case(login) || self.email.eq_ignore_ascii_case(login)
  }
}

/// Public view of an account, as returned by login and profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
  pub id: Uuid,
  pub username: String,
  pub email: String,
  pub first_name: String,
  pub last_name: String,
  pub is_staff: bool,
}

impl From<&User> for UserSummary {
  fn from(user: &User) -> Self {
    Self {
      id: user.id,
      username: user.username.clone(),
      email: user.email.clone(),
      first_name: user.first_name.clone(),
      last_name: user.last_name.clone(),
      is_staff: user.is_staff,
    }
  }
}
