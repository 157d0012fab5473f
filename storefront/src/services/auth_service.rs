// storefront/src/services/auth_service.rs

//! Password hashing plus the account flows built on it: registration, login
//! and the staff bootstrap run at startup.

use crate::config::AdminBootstrap;
use crate::db::{Store, DUPLICATE_EMAIL, DUPLICATE_USERNAME};
use crate::errors::{AppError, FieldErrors, Result};
use crate::models::User;
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Returned for both unknown identifiers and wrong passwords.
pub const INVALID_CREDENTIALS: &str = "No active account found with the given credentials";

/// Hashes a plain-text password using Argon2 with a random salt.
#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String> {
  if password.is_empty() {
    error!("Password hashing failed: Password cannot be empty.");
    return Err(AppError::Validation("Password cannot be empty for hashing.".to_string()));
  }

  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|argon_err| {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      AppError::Internal(format!("Password hashing process failed: {}", argon_err))
    })
}

/// Verifies a plain-text password against a stored Argon2 hash.
///
/// Returns `Ok(false)` on a mismatch. A stored hash that cannot be parsed is
/// an internal error, not an authentication failure.
#[instrument(name = "auth_service::verify_password", skip_all, err(Display))]
pub fn verify_password(hashed_password_str: &str, provided_password: &str) -> Result<bool> {
  if provided_password.is_empty() {
    return Ok(false);
  }

  let parsed_hash = PasswordHash::new(hashed_password_str).map_err(|parse_err| {
    error!(error = %parse_err, "Failed to parse stored password hash string.");
    AppError::Internal(format!("Invalid stored password hash format: {}", parse_err))
  })?;

  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => {
      debug!("Password verification failed: Passwords do not match.");
      Ok(false)
    }
    Err(other_argon_err) => {
      error!(error = %other_argon_err, "Argon2 password verification process encountered an error.");
      Err(AppError::Internal(format!(
        "Password verification process failed: {}",
        other_argon_err
      )))
    }
  }
}

/// Registration fields that already passed format validation.
#[derive(Debug, Default)]
pub struct Registration {
  pub username: String,
  pub email: String,
  pub password: String,
  pub first_name: String,
  pub last_name: String,
}

/// Creates a non-staff account. A username or email is taken when it matches
/// any existing username or email ignoring case, so a login identifier always
/// resolves to at most one account.
#[instrument(name = "auth_service::register", skip(store, registration), fields(username = %registration.username))]
pub async fn register(store: &dyn Store, registration: Registration) -> Result<User> {
  let Registration { username, email, password, first_name, last_name } = registration;
  let mut errors = FieldErrors::new();
  if !store.find_users_by_login(&username).await?.is_empty() {
    errors.add("username", DUPLICATE_USERNAME);
  }
  if !store.find_users_by_login(&email).await?.is_empty() {
    errors.add("email", DUPLICATE_EMAIL);
  }
  errors.finish(())?;

  let user = User {
    id: Uuid::new_v4(),
    username,
    email,
    first_name,
    last_name,
    password_hash: hash_password(&password)?,
    is_staff: false,
    date_joined: Utc::now(),
  };
  store.insert_user(&user).await?;
  info!(user_id = %user.id, "User registered.");
  Ok(user)
}

/// Resolves a username-or-email login and checks the password. Every failure
/// is the same `AppError::Auth` so account existence is not revealed.
#[instrument(name = "auth_service::authenticate", skip(store, password))]
pub async fn authenticate(store: &dyn Store, login: &str, password: &str) -> Result<User> {
  let login = login.trim();
  if login.is_empty() || password.is_empty() {
    return Err(AppError::Auth(INVALID_CREDENTIALS.to_string()));
  }

  let candidates = store.find_users_by_login(login).await?;
  let user = candidates
    .iter()
    .find(|u| u.username.eq_ignore_ascii_case(login))
    .or_else(|| candidates.iter().find(|u| u.email.eq_ignore_ascii_case(login)));

  let Some(user) = user else {
    warn!("Login rejected: unknown identifier.");
    return Err(AppError::Auth(INVALID_CREDENTIALS.to_string()));
  };
  if !verify_password(&user.password_hash, password)? {
    warn!(user_id = %user.id, "Login rejected: wrong password.");
    return Err(AppError::Auth(INVALID_CREDENTIALS.to_string()));
  }
  info!(user_id = %user.id, "Login succeeded.");
  Ok(user.clone())
}

/// Ensures the configured staff account exists with the configured password.
#[instrument(name = "auth_service::bootstrap_admin", skip(store, admin), fields(username = %admin.username))]
pub async fn bootstrap_admin(store: &dyn Store, admin: &AdminBootstrap) -> Result<User> {
  let existing = store
    .find_users_by_login(&admin.username)
    .await?
    .into_iter()
    .find(|u| u.username.eq_ignore_ascii_case(&admin.username));

  let password_hash = hash_password(&admin.password)?;
  match existing {
    Some(mut user) => {
      user.email = admin.email.clone();
      user.password_hash = password_hash;
      user.is_staff = true;
      store.update_user(&user).await?;
      info!(user_id = %user.id, "Staff account updated from bootstrap settings.");
      Ok(user)
    }
    None => {
      let user = User {
        id: Uuid::new_v4(),
        username: admin.username.clone(),
        email: admin.email.clone(),
        first_name: String::new(),
        last_name: String::new(),
        password_hash,
        is_staff: true,
        date_joined: Utc::now(),
      };
      store.insert_user(&user).await?;
      info!(user_id = %user.id, "Staff account created from bootstrap settings.");
      Ok(user)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::MemoryStore;

  fn registration(username: &str, email: &str) -> Registration {
    Registration {
      username: username.to_string(),
      email: email.to_string(),
      password: "tide-pool-42".to_string(),
      ..Default::default()
    }
  }

  #[test]
  fn hash_then_verify() {
    let hash = hash_password("s3cret").unwrap();
    assert!(verify_password(&hash, "s3cret").unwrap());
    assert!(!verify_password(&hash, "S3cret").unwrap());
    assert!(hash_password("").is_err());
  }

  #[tokio::test]
  async fn login_by_username_or_email_ignoring_case() {
    let store = MemoryStore::new();
    register(&store, registration("Marina", "marina@harbour.example")).await.unwrap();

    for login in ["marina", "MARINA", "Marina@Harbour.example"] {
      let user = authenticate(&store, login, "tide-pool-42").await.unwrap();
      assert_eq!(user.username, "Marina");
    }
    let err = authenticate(&store, "marina", "wrong").await.unwrap_err();
    let unknown = authenticate(&store, "nobody", "tide-pool-42").await.unwrap_err();
    assert_eq!(err.to_string(), unknown.to_string());
  }

  #[tokio::test]
  async fn username_cannot_take_another_accounts_email() {
    let store = MemoryStore::new();
    register(&store, registration("alice", "alice@harbour.example")).await.unwrap();

    let err = register(&store, registration("Alice@Harbour.example", "second@harbour.example"))
      .await
      .unwrap_err();
    match err {
      AppError::Fields(fields) => {
        assert_eq!(fields.get("username"), Some(&[DUPLICATE_USERNAME.to_string()][..]));
        assert!(fields.get("email").is_none());
      }
      other => panic!("unexpected error: {other}"),
    }

    let err = register(&store, registration("bob", "ALICE")).await.unwrap_err();
    match err {
      AppError::Fields(fields) => assert_eq!(fields.get("email"), Some(&[DUPLICATE_EMAIL.to_string()][..])),
      other => panic!("unexpected error: {other}"),
    }

    assert_eq!(store.count_users().await.unwrap(), 1);
    let user = authenticate(&store, "alice@harbour.example", "tide-pool-42").await.unwrap();
    assert_eq!(user.username, "alice");
  }

  #[tokio::test]
  async fn duplicates_are_rejected_ignoring_case() {
    let store = MemoryStore::new();
    register(&store, registration("marina", "marina@harbour.example")).await.unwrap();
    let err = register(&store, registration("MARINA", "MARINA@harbour.example")).await.unwrap_err();
    match err {
      AppError::Fields(fields) => {
        assert!(fields.get("username").is_some());
        assert!(fields.get("email").is_some());
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[tokio::test]
  async fn bootstrap_creates_then_resets_staff() {
    let store = MemoryStore::new();
    register(&store, registration("admin", "old@harbour.example")).await.unwrap();
    let admin = AdminBootstrap {
      username: "admin".to_string(),
      email: "admin@harbour.example".to_string(),
      password: "anchor".to_string(),
    };
    let user = bootstrap_admin(&store, &admin).await.unwrap();
    assert!(user.is_staff);
    assert_eq!(store.count_users().await.unwrap(), 1);
    assert!(authenticate(&store, "admin", "anchor").await.unwrap().is_staff);
  }
}
