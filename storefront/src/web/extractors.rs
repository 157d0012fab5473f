// storefront/src/web/extractors.rs

//! Request identity. The bearer access token is verified, then the account is
//! reloaded from the store so a deleted user or a revoked staff flag takes
//! effect immediately.

use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use tracing::warn;

use crate::errors::AppError;
use crate::models::User;
use crate::services::token_service::TokenKind;
use crate::state::AppState;

const NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";
const NOT_STAFF: &str = "You do not have permission to perform this action.";

fn bearer_token(req: &HttpRequest) -> Option<String> {
  let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
  let (scheme, token) = value.trim().split_once(' ')?;
  if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
    Some(token.trim().to_string())
  } else {
    None
  }
}

/// `Ok(None)` when no Authorization header is present; a header that is
/// present but invalid is always an error.
async fn resolve_user(req: HttpRequest) -> Result<Option<User>, AppError> {
  if req.headers().get(AUTHORIZATION).is_none() {
    return Ok(None);
  }
  let token = bearer_token(&req).ok_or_else(|| AppError::Auth("Authorization header must be a Bearer token.".to_string()))?;
  let state = req
    .app_data::<web::Data<AppState>>()
    .ok_or_else(|| AppError::Internal("Application state is not configured.".to_string()))?;

  let claims = state.tokens.verify(&token, TokenKind::Access)?;
  match state.store.get_user(claims.sub).await? {
    Some(user) => Ok(Some(user)),
    None => {
      warn!(user_id = %claims.sub, "Token refers to a user that no longer exists.");
      Err(AppError::Auth("User not found".to_string()))
    }
  }
}

/// Any signed-in user; 401 otherwise.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let req = req.clone();
    Box::pin(async move {
      resolve_user(req)
        .await?
        .map(AuthenticatedUser)
        .ok_or_else(|| AppError::Auth(NOT_AUTHENTICATED.to_string()))
    })
  }
}

/// A signed-in staff user; 401 when anonymous, 403 when not staff.
#[derive(Debug, Clone)]
pub struct StaffUser(pub User);

impl FromRequest for StaffUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let req = req.clone();
    Box::pin(async move {
      let user = resolve_user(req)
        .await?
        .ok_or_else(|| AppError::Auth(NOT_AUTHENTICATED.to_string()))?;
      if !user.is_staff {
        warn!(user_id = %user.id, "Staff-only endpoint refused.");
        return Err(AppError::Forbidden(NOT_STAFF.to_string()));
      }
      Ok(StaffUser(user))
    })
  }
}

/// The caller when a token is supplied, `None` for anonymous requests.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
  pub fn is_staff(&self) -> bool {
    self.0.as_ref().map_or(false, |u| u.is_staff)
  }
}

impl FromRequest for MaybeUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let req = req.clone();
    Box::pin(async move { resolve_user(req).await.map(MaybeUser) })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::test::TestRequest;

  #[test]
  fn bearer_token_parsing() {
    let req = TestRequest::default().insert_header((AUTHORIZATION, "Bearer abc.def")).to_http_request();
    assert_eq!(bearer_token(&req).as_deref(), Some("abc.def"));
    let req = TestRequest::default().insert_header((AUTHORIZATION, "bearer  xyz ")).to_http_request();
    assert_eq!(bearer_token(&req).as_deref(), Some("xyz"));
    let req = TestRequest::default().insert_header((AUTHORIZATION, "Basic abc")).to_http_request();
    assert_eq!(bearer_token(&req), None);
    let req = TestRequest::default().to_http_request();
    assert_eq!(bearer_token(&req), None);
  }
}
