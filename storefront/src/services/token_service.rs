// storefront/src/services/token_service.rs

//! Signed access/refresh token pairs (HS256).

use crate::errors::{AppError, Result};
use crate::models::User;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
  Access,
  Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
  pub sub: Uuid,
  pub username: String,
  pub is_staff: bool,
  pub token_type: TokenKind,
  pub jti: Uuid,
  pub iat: i64,
  pub exp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
  pub refresh: String,
  pub access: String,
}

pub struct TokenService {
  encoding_key: EncodingKey,
  decoding_key: DecodingKey,
  access_ttl: Duration,
  refresh_ttl: Duration,
}

impl TokenService {
  pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
    Self {
      encoding_key: EncodingKey::from_secret(secret.as_bytes()),
      decoding_key: DecodingKey::from_secret(secret.as_bytes()),
      access_ttl,
      refresh_ttl,
    }
  }

  #[instrument(name = "token_service::issue_pair", skip(self, user), fields(user_id = %user.id))]
  pub fn issue_pair(&self, user: &User) -> Result<TokenPair> {
    Ok(TokenPair {
      refresh: self.issue(user, TokenKind::Refresh)?,
      access: self.issue(user, TokenKind::Access)?,
    })
  }

  pub fn issue(&self, user: &User, kind: TokenKind) -> Result<String> {
    let now = Utc::now();
    let ttl = match kind {
      TokenKind::Access => self.access_ttl,
      TokenKind::Refresh => self.refresh_ttl,
    };
    let claims = Claims {
      sub: user.id,
      username: user.username.clone(),
      is_staff: user.is_staff,
      token_type: kind,
      jti: Uuid::new_v4(),
      iat: now.timestamp(),
      exp: (now + ttl).timestamp(),
    };
    Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
  }

  /// Decodes and checks signature, expiry and token kind. Any failure is an
  /// authentication error.
  pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    let claims = decode::<Claims>(token, &self.decoding_key, &validation)
      .map_err(|e| {
        debug!(error = %e, "Token rejected.");
        AppError::Auth("Given token not valid for any token type".to_string())
      })?
      .claims;
    if claims.token_type != kind {
      debug!(expected = ?kind, got = ?claims.token_type, "Token kind mismatch.");
      return Err(AppError::Auth("Token has wrong type".to_string()));
    }
    Ok(claims)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn user() -> User {
    User {
      id: Uuid::new_v4(),
      username: "skipper".to_string(),
      email: "skipper@harbour.example".to_string(),
      first_name: String::new(),
      last_name: String::new(),
      password_hash: String::new(),
      is_staff: true,
      date_joined: Utc::now(),
    }
  }

  #[test]
  fn pair_round_trips_and_kinds_are_not_interchangeable() {
    let service = TokenService::new("secret", Duration::minutes(5), Duration::days(1));
    let user = user();
    let pair = service.issue_pair(&user).unwrap();

    let claims = service.verify(&pair.access, TokenKind::Access).unwrap();
    assert_eq!(claims.sub, user.id);
    assert!(claims.is_staff);
    assert!(service.verify(&pair.refresh, TokenKind::Refresh).is_ok());

    assert!(matches!(service.verify(&pair.access, TokenKind::Refresh), Err(AppError::Auth(_))));
    assert!(matches!(service.verify(&pair.refresh, TokenKind::Access), Err(AppError::Auth(_))));
  }

  #[test]
  fn rejects_expired_and_foreign_tokens() {
    let expired = TokenService::new("secret", Duration::minutes(-5), Duration::days(1));
    let token = expired.issue(&user(), TokenKind::Access).unwrap();
    assert!(matches!(expired.verify(&token, TokenKind::Access), Err(AppError::Auth(_))));

    let other = TokenService::new("other", Duration::minutes(5), Duration::days(1));
    let token = other.issue(&user(), TokenKind::Access).unwrap();
    let service = TokenService::new("secret", Duration::minutes(5), Duration::days(1));
    assert!(service.verify(&token, TokenKind::Access).is_err());
    assert!(service.verify("not-a-token", TokenKind::Access).is_err());
  }
}
