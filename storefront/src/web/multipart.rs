// storefront/src/web/multipart.rs

use actix_multipart::Multipart;
use futures_util::StreamExt;

use crate::errors::{AppError, FieldErrors, Result};

const ALLOWED_MIMES: &[&str] = &["image/png", "image/jpeg", "image/webp"];

fn image_error(message: impl Into<String>) -> AppError {
  let mut errors = FieldErrors::new();
  errors.add("image", message);
  AppError::Fields(errors)
}

/// Reads the `image` field of a multipart upload into memory, enforcing the
/// MIME allow-list and `max_bytes`. Other fields are drained and ignored.
pub async fn read_image_field(multipart: &mut Multipart, max_bytes: usize) -> Result<Vec<u8>> {
  while let Some(field) = multipart.next().await {
    let mut field = field.map_err(|e| AppError::Validation(format!("Malformed multipart body: {}", e)))?;
    if field.name() != Some("image") {
      while let Some(chunk) = field.next().await {
        chunk.map_err(|e| AppError::Validation(format!("Malformed multipart body: {}", e)))?;
      }
      continue;
    }

    let mime = field.content_type().map(|m| m.essence_str().to_string()).unwrap_or_default();
    if !ALLOWED_MIMES.contains(&mime.as_str()) {
      return Err(image_error(format!(
        "Unsupported content type `{}`; upload PNG, JPEG or WebP.",
        if mime.is_empty() { "<empty>" } else { mime.as_str() }
      )));
    }

    let mut buf: Vec<u8> = Vec::new();
    while let Some(chunk) = field.next().await {
      let data = chunk.map_err(|e| AppError::Validation(format!("Malformed multipart body: {}", e)))?;
      if buf.len().saturating_add(data.len()) > max_bytes {
        return Err(image_error(format!("File too large (max {} bytes).", max_bytes)));
      }
      buf.extend_from_slice(&data);
    }
    if buf.is_empty() {
      return Err(image_error("The submitted file is empty."));
    }
    return Ok(buf);
  }
  Err(image_error("No file was submitted."))
}
