// storefront/src/models/contact_message.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ContactMessage {
  pub id: Uuid,
  #[sqlx(rename = "user_id")]
  pub user: Option<Uuid>, // Cleared when the author account is deleted
  pub name: String,
  pub email: String,
  pub subject: Option<String>,
  pub message: String,
  pub is_read: bool,
  pub created_at: DateTime<Utc>,
}

impl ContactMessage {
  pub fn draft(user: Option<Uuid>) -> Self {
    Self {
      id: Uuid::new_v4(),
      user,
      name: String::new(),
      email: String::new(),
      subject: None,
      message: String::new(),
      is_read: false,
      created_at: Utc::now(),
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct ContactMessageChanges {
  pub name: Option<String>,
  pub email: Option<String>,
  pub subject: Option<Option<String>>,
  pub message: Option<String>,
  pub is_read: Option<bool>,
}

impl ContactMessageChanges {
  pub fn apply(self, contact: &mut ContactMessage) {
    if let Some(name) = self.name {
      contact.name = name;
    }
    if let Some(email) = self.email {
      contact.email = email;
    }
    if let Some(subject) = self.subject {
      contact.subject = subject;
    }
    if let Some(message) = self.message {
      contact.message = message;
    }
    if let Some(is_read) = self.is_read {
      contact.is_read = is_read;
    }
  }
}
