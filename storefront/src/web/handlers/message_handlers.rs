// storefront/src/web/handlers/message_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::db::MessageFilter;
use crate::errors::{AppError, FieldErrors};
use crate::models::{ContactMessage, ContactMessageChanges};
use crate::services::validation::{self, double_option, Mode};
use crate::state::AppState;
use crate::web::extractors::{MaybeUser, StaffUser};
use crate::web::pagination::{PageQuery, Paginated};

#[derive(Deserialize, Debug)]
pub struct ListMessagesQuery {
  pub is_read: Option<String>,
}

#[derive(Deserialize, Validate, Debug, Default)]
pub struct MessagePayload {
  #[validate(length(min = 1, max = 255))]
  pub name: Option<String>,
  #[validate(email)]
  pub email: Option<String>,
  #[serde(default, deserialize_with = "double_option")]
  #[validate(length(max = 255))]
  pub subject: Option<Option<String>>,
  #[validate(length(min = 1))]
  pub message: Option<String>,
  pub is_read: Option<bool>,
}

impl MessagePayload {
  pub fn into_changes(mut self, mode: Mode) -> Result<ContactMessageChanges, AppError> {
    self.name = validation::trimmed(self.name);
    self.email = validation::trimmed(self.email);
    self.subject = validation::trimmed_nullable(self.subject);
    self.message = validation::trimmed(self.message);

    let mut errors = validation::check(&self);
    validation::require(
      &mut errors,
      mode,
      &[
        ("name", self.name.is_some()),
        ("email", self.email.is_some()),
        ("message", self.message.is_some()),
      ],
    );
    errors.finish(ContactMessageChanges {
      name: self.name,
      email: self.email,
      subject: self.subject,
      message: self.message,
      is_read: self.is_read,
    })
  }
}

fn parse_flag(raw: &str) -> Option<bool> {
  match raw.trim().to_ascii_lowercase().as_str() {
    "true" | "1" => Some(true),
    "false" | "0" => Some(false),
    _ => None,
  }
}

fn not_found(id: Uuid) -> AppError {
  warn!("Contact message with ID {} not found.", id);
  AppError::NotFound(format!("Contact message with ID {} not found.", id))
}

/// Open to anyone. A signed-in sender is linked to the message.
#[instrument(name = "handler::create_message", skip_all)]
pub async fn create_message_handler(
  app_state: web::Data<AppState>,
  sender: MaybeUser,
  req_payload: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
  let mut payload: MessagePayload = validation::parse_payload(req_payload.into_inner())?;
  // Senders cannot mark their own message as read.
  payload.is_read = None;
  let changes = payload.into_changes(Mode::Full)?;
  let mut message = ContactMessage::draft(sender.0.as_ref().map(|u| u.id));
  changes.apply(&mut message);
  app_state.store.insert_message(&message).await?;
  info!(message_id = %message.id, linked = message.user.is_some(), "Contact message received.");
  Ok(HttpResponse::Created().json(message))
}

#[instrument(name = "handler::list_messages", skip_all)]
pub async fn list_messages_handler(
  app_state: web::Data<AppState>,
  _staff: StaffUser,
  filter_query: web::Query<ListMessagesQuery>,
  page_query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
  let is_read = match filter_query.is_read.as_deref().filter(|s| !s.trim().is_empty()) {
    None => None,
    Some(raw) => Some(parse_flag(raw).ok_or_else(|| {
      let mut errors = FieldErrors::new();
      errors.add("is_read", "Enter a valid boolean.");
      AppError::Fields(errors)
    })?),
  };
  let page = app_state
    .store
    .list_messages(&MessageFilter { is_read }, page_query.request()?)
    .await?;
  Ok(HttpResponse::Ok().json(Paginated::new(&page_query, page)?))
}

#[instrument(name = "handler::get_message", skip_all, fields(message_id = %path.as_ref()))]
pub async fn get_message_handler(
  app_state: web::Data<AppState>,
  _staff: StaffUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let message_id = path.into_inner();
  match app_state.store.get_message(message_id).await? {
    Some(message) => Ok(HttpResponse::Ok().json(message)),
    None => Err(not_found(message_id)),
  }
}

async fn update_message(
  app_state: &AppState,
  message_id: Uuid,
  body: Value,
  mode: Mode,
) -> Result<HttpResponse, AppError> {
  let payload: MessagePayload = validation::parse_payload(body)?;
  let mut message = app_state
    .store
    .get_message(message_id)
    .await?
    .ok_or_else(|| not_found(message_id))?;
  payload.into_changes(mode)?.apply(&mut message);
  if !app_state.store.update_message(&message).await? {
    return Err(not_found(message_id));
  }
  info!(%message_id, is_read = message.is_read, "Contact message updated.");
  Ok(HttpResponse::Ok().json(message))
}

#[instrument(name = "handler::replace_message", skip_all, fields(message_id = %path.as_ref()))]
pub async fn replace_message_handler(
  app_state: web::Data<AppState>,
  _staff: StaffUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
  update_message(&app_state, path.into_inner(), req_payload.into_inner(), Mode::Full).await
}

#[instrument(name = "handler::patch_message", skip_all, fields(message_id = %path.as_ref()))]
pub async fn patch_message_handler(
  app_state: web::Data<AppState>,
  _staff: StaffUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
  update_message(&app_state, path.into_inner(), req_payload.into_inner(), Mode::Partial).await
}

#[instrument(name = "handler::delete_message", skip_all, fields(message_id = %path.as_ref()))]
pub async fn delete_message_handler(
  app_state: web::Data<AppState>,
  _staff: StaffUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let message_id = path.into_inner();
  if !app_state.store.delete_message(message_id).await? {
    return Err(not_found(message_id));
  }
  info!(%message_id, "Contact message deleted.");
  Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn boolean_filter_values() {
    assert_eq!(parse_flag("True"), Some(true));
    assert_eq!(parse_flag("0"), Some(false));
    assert_eq!(parse_flag("maybe"), None);
  }

  #[test]
  fn create_payload_checks_email() {
    let payload = MessagePayload {
      name: Some("Nemo".to_string()),
      email: Some("not-an-email".to_string()),
      message: Some("Hello".to_string()),
      ..Default::default()
    };
    match payload.into_changes(Mode::Full).unwrap_err() {
      AppError::Fields(fields) => assert_eq!(
        fields.get("email"),
        Some(&[validation::INVALID_EMAIL.to_string()][..])
      ),
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn partial_payload_only_checks_present_fields() {
    let payload = MessagePayload { is_read: Some(true), ..Default::default() };
    let changes = payload.into_changes(Mode::Partial).unwrap();
    assert_eq!(changes.is_read, Some(true));

    let payload = MessagePayload { message: Some("   ".to_string()), ..Default::default() };
    match payload.into_changes(Mode::Partial).unwrap_err() {
      AppError::Fields(fields) => {
        assert_eq!(fields.get("message"), Some(&[validation::BLANK.to_string()][..]));
        assert!(fields.get("name").is_none());
      }
      other => panic!("unexpected error: {other}"),
    }
  }
}
