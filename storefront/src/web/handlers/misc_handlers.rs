// storefront/src/web/handlers/misc_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::errors::AppError;
use crate::services::chat_service;
use crate::state::AppState;

#[derive(Deserialize, Debug, Default)]
pub struct ChatRequestPayload {
  #[serde(default)]
  pub query: Option<String>,
}

/// Liveness check used by the hosting platform to keep the service warm.
pub async fn ping_handler() -> HttpResponse {
  HttpResponse::Ok().json(json!({ "status": "ok", "message": "Server is awake" }))
}

#[instrument(name = "handler::ai_chat", skip_all)]
pub async fn chat_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<ChatRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let query = req_payload.into_inner().query.unwrap_or_default();
  let reply = chat_service::respond(app_state.store.as_ref(), &query).await?;
  Ok(HttpResponse::Ok().json(reply))
}
