// storefront/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::errors::{AppError, FieldErrors};
use crate::models::UserSummary;
use crate::services::auth_service::{self, Registration};
use crate::services::token_service::TokenKind;
use crate::services::validation::{self, REQUIRED};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

const INVALID_USERNAME: &str =
  "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";

// --- Request DTOs ---
#[derive(Deserialize, Validate, Debug, Default)]
pub struct RegisterRequestPayload {
  #[validate(required, length(min = 1, max = 150))]
  pub username: Option<String>,
  #[validate(required, email)]
  pub email: Option<String>,
  #[validate(required, length(min = 1))]
  pub password: Option<String>,
  #[validate(length(max = 150))]
  pub first_name: Option<String>,
  #[validate(length(max = 150))]
  pub last_name: Option<String>,
}

impl RegisterRequestPayload {
  /// Format checks only; uniqueness is decided by `auth_service::register`.
  pub fn into_registration(mut self) -> Result<Registration, AppError> {
    self.username = validation::trimmed(self.username);
    self.email = validation::trimmed(self.email);
    self.first_name = validation::trimmed(self.first_name);
    self.last_name = validation::trimmed(self.last_name);

    let mut errors = validation::check(&self);
    if self.username.as_deref().is_some_and(|u| u.chars().any(char::is_whitespace)) {
      errors.add("username", INVALID_USERNAME);
    }
    match errors.finish((self.username, self.email, self.password))? {
      (Some(username), Some(email), Some(password)) => Ok(Registration {
        username,
        email,
        password,
        first_name: self.first_name.unwrap_or_default(),
        last_name: self.last_name.unwrap_or_default(),
      }),
      _ => Err(AppError::Internal("Registration fields missing after validation.".to_string())),
    }
  }
}

/// `username` may hold either the username or the email address.
#[derive(Deserialize)]
pub struct LoginRequestPayload {
  pub username: Option<String>,
  pub email: Option<String>,
  pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct RefreshRequestPayload {
  pub refresh: Option<String>,
}

#[instrument(name = "handler::register", skip(app_state, req_payload))]
pub async fn register_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
  let payload: RegisterRequestPayload = validation::parse_payload(req_payload.into_inner())?;
  let registration = payload.into_registration()?;
  let user = auth_service::register(app_state.store.as_ref(), registration).await?;
  info!(user_id = %user.id, "Signup successful.");
  Ok(HttpResponse::Created().json(UserSummary::from(&user)))
}

#[instrument(name = "handler::login", skip(app_state, req_payload))]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<LoginRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let login = payload.username.or(payload.email);

  let mut errors = FieldErrors::new();
  if login.is_none() {
    errors.add("username", REQUIRED);
  }
  if payload.password.is_none() {
    errors.add("password", REQUIRED);
  }
  let (login, password) = match errors.finish((login, payload.password))? {
    (Some(login), Some(password)) => (login, password),
    _ => return Err(AppError::Internal("Login fields missing after validation.".to_string())),
  };

  let user = auth_service::authenticate(app_state.store.as_ref(), &login, &password).await?;
  let pair = app_state.tokens.issue_pair(&user)?;
  Ok(HttpResponse::Ok().json(json!({
    "refresh": pair.refresh,
    "access": pair.access,
    "user": UserSummary::from(&user),
  })))
}

#[instrument(name = "handler::refresh", skip(app_state, req_payload))]
pub async fn refresh_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<RefreshRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let Some(refresh) = req_payload.into_inner().refresh.filter(|t| !t.trim().is_empty()) else {
    let mut errors = FieldErrors::new();
    errors.add("refresh", REQUIRED);
    return Err(AppError::Fields(errors));
  };

  let claims = app_state.tokens.verify(refresh.trim(), TokenKind::Refresh)?;
  // Reload so the new access token carries the current staff flag.
  let user = app_state.store.get_user(claims.sub).await?.ok_or_else(|| {
    warn!(user_id = %claims.sub, "Refresh token refers to a user that no longer exists.");
    AppError::Auth("User not found".to_string())
  })?;
  let access = app_state.tokens.issue(&user, TokenKind::Access)?;
  info!(user_id = %user.id, "Access token refreshed.");
  Ok(HttpResponse::Ok().json(json!({ "access": access })))
}

#[instrument(name = "handler::profile", skip(auth_user), fields(user_id = %auth_user.0.id))]
pub async fn profile_handler(auth_user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  Ok(HttpResponse::Ok().json(UserSummary::from(&auth_user.0)))
}
