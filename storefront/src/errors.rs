// storefront/src/errors.rs

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Invalid fields: {0}")]
  Fields(FieldErrors),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Permission Denied: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Migration Error: {0}")]
  Migrate(#[from] sqlx::migrate::MigrateError),

  #[error("Token Error: {0}")]
  Token(#[from] jsonwebtoken::errors::Error),

  #[error("Image Error: {0}")]
  Image(#[from] image::ImageError),

  #[error("I/O Error: {0}")]
  Io(#[from] std::io::Error),

  #[error("Internal Server Error: {0}")]
  Internal(String), // For miscellaneous errors
}

// Allow anyhow::Error to be converted into AppError::Internal for convenience in handlers
impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<sqlx::Error>() {
      Ok(sqlx_err) => AppError::Sqlx(sqlx_err),
      Err(other) => AppError::Internal(other.to_string()),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) | AppError::Fields(_) | AppError::Image(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Config(_)
      | AppError::Sqlx(_)
      | AppError::Migrate(_)
      | AppError::Token(_)
      | AppError::Io(_)
      | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    // Client mistakes are routine; only server-side failures are logged as errors.
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, status = status.as_u16(), "Rejecting request");
    }
    match self {
      AppError::Validation(m) | AppError::Auth(m) | AppError::Forbidden(m) | AppError::NotFound(m) => {
        HttpResponse::build(status).json(json!({"error": m}))
      }
      AppError::Fields(fields) => HttpResponse::build(status).json(fields),
      AppError::Image(_) => HttpResponse::build(status).json(json!({
        "image": ["Upload a valid image. The file you uploaded was either not an image or a corrupted image."]
      })),
      AppError::Config(m) => HttpResponse::build(status).json(json!({"error": "Configuration issue", "detail": m})),
      AppError::Sqlx(_) | AppError::Migrate(_) => {
        HttpResponse::build(status).json(json!({"error": "Database operation failed"}))
      }
      AppError::Token(_) => HttpResponse::build(status).json(json!({"error": "Token processing failed"})),
      AppError::Io(_) => HttpResponse::build(status).json(json!({"error": "Storage operation failed"})),
      AppError::Internal(m) => {
        HttpResponse::build(status).json(json!({"error": "An internal error occurred", "detail": m}))
      }
    }
  }
}

/// Field-level validation messages keyed by field name, serialized as
/// `{"field": ["message", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
    self.0.entry(field.into()).or_default().push(message.into());
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn get(&self, field: &str) -> Option<&[String]> {
    self.0.get(field).map(Vec::as_slice)
  }

  /// `Ok(value)` when nothing was recorded, otherwise `AppError::Fields`.
  pub fn finish<T>(self, value: T) -> Result<T> {
    if self.is_empty() {
      Ok(value)
    } else {
      Err(AppError::Fields(self))
    }
  }
}

impl fmt::Display for FieldErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
    write!(f, "{}", fields.join(", "))
  }
}

// Define a Result type alias for the application
pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn field_errors_accumulate_per_field() {
    let mut errors = FieldErrors::new();
    errors.add("name", "This field is required.");
    errors.add("name", "Ensure this field has no more than 255 characters.");
    errors.add("price", "A valid number is required.");

    assert_eq!(errors.get("name").map(|m| m.len()), Some(2));
    let json = serde_json::to_value(&errors).unwrap();
    assert_eq!(json["price"][0], "A valid number is required.");
    assert!(errors.finish(()).is_err());
    assert!(FieldErrors::new().finish(1).is_ok());
  }

  #[test]
  fn status_codes_follow_error_class() {
    assert_eq!(AppError::Auth("x".into()).status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(AppError::Forbidden("x".into()).status_code(), StatusCode::FORBIDDEN);
    assert_eq!(AppError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
      AppError::Sqlx(sqlx::Error::RowNotFound).status_code(),
      StatusCode::INTERNAL_SERVER_ERROR
    );
  }
}
