// storefront/src/web/handlers/user_handlers.rs

use actix_web::{web, HttpResponse};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::StaffUser;

#[instrument(name = "handler::list_users", skip_all, fields(staff_id = %staff.0.id))]
pub async fn list_users_handler(app_state: web::Data<AppState>, staff: StaffUser) -> Result<HttpResponse, AppError> {
  let users = app_state.store.list_users().await?;
  info!("Fetched {} users.", users.len());
  Ok(HttpResponse::Ok().json(users))
}

/// Removes an account. Its orders go with it; its contact messages stay,
/// unlinked.
#[instrument(name = "handler::delete_user", skip_all, fields(staff_id = %staff.0.id, user_id = %path.as_ref()))]
pub async fn delete_user_handler(
  app_state: web::Data<AppState>,
  staff: StaffUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let user_id = path.into_inner();
  if user_id == staff.0.id {
    return Err(AppError::Validation("You cannot delete your own account.".to_string()));
  }
  if !app_state.store.delete_user(user_id).await? {
    warn!("User with ID {} not found.", user_id);
    return Err(AppError::NotFound(format!("User with ID {} not found.", user_id)));
  }
  info!(%user_id, "User deleted.");
  Ok(HttpResponse::NoContent().finish())
}
