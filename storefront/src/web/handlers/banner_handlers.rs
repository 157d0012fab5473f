// storefront/src/web/handlers/banner_handlers.rs

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::errors::AppError;
use crate::models::{Banner, BannerChanges};
use crate::services::media_service::{MediaKind, MAX_UPLOAD_BYTES};
use crate::services::validation::{self, double_option, Mode};
use crate::state::AppState;
use crate::web::extractors::{MaybeUser, StaffUser};
use crate::web::multipart::read_image_field;
use crate::web::pagination::{PageQuery, Paginated};

#[derive(Deserialize, Validate, Debug, Default)]
pub struct BannerPayload {
  #[validate(length(min = 1, max = 255))]
  pub title: Option<String>,
  #[serde(default, deserialize_with = "double_option")]
  #[validate(length(max = 255))]
  pub link_url: Option<Option<String>>,
  pub active: Option<bool>,
}

impl BannerPayload {
  pub fn into_changes(mut self, mode: Mode) -> Result<BannerChanges, AppError> {
    self.title = validation::trimmed(self.title);
    self.link_url = validation::trimmed_nullable(self.link_url);

    let mut errors = validation::check(&self);
    validation::require(&mut errors, mode, &[("title", self.title.is_some())]);
    errors.finish(BannerChanges {
      title: self.title,
      link_url: self.link_url,
      active: self.active,
    })
  }
}

fn not_found(id: Uuid) -> AppError {
  warn!("Banner with ID {} not found.", id);
  AppError::NotFound(format!("Banner with ID {} not found.", id))
}

#[instrument(name = "handler::list_banners", skip_all, fields(staff = viewer.is_staff()))]
pub async fn list_banners_handler(
  app_state: web::Data<AppState>,
  viewer: MaybeUser,
  page_query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
  let page = app_state
    .store
    .list_banners(!viewer.is_staff(), page_query.request()?)
    .await?;
  Ok(HttpResponse::Ok().json(Paginated::new(&page_query, page)?))
}

#[instrument(name = "handler::get_banner", skip_all, fields(banner_id = %path.as_ref()))]
pub async fn get_banner_handler(
  app_state: web::Data<AppState>,
  viewer: MaybeUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let banner_id = path.into_inner();
  match app_state.store.get_banner(banner_id, !viewer.is_staff()).await? {
    Some(banner) => Ok(HttpResponse::Ok().json(banner)),
    None => Err(not_found(banner_id)),
  }
}

#[instrument(name = "handler::create_banner", skip_all)]
pub async fn create_banner_handler(
  app_state: web::Data<AppState>,
  _staff: StaffUser,
  req_payload: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
  let payload: BannerPayload = validation::parse_payload(req_payload.into_inner())?;
  let changes = payload.into_changes(Mode::Full)?;
  let mut banner = Banner::draft();
  changes.apply(&mut banner);
  app_state.store.insert_banner(&banner).await?;
  info!(banner_id = %banner.id, "Banner created.");
  Ok(HttpResponse::Created().json(banner))
}

async fn update_banner(
  app_state: &AppState,
  banner_id: Uuid,
  body: Value,
  mode: Mode,
) -> Result<HttpResponse, AppError> {
  let payload: BannerPayload = validation::parse_payload(body)?;
  let mut banner = app_state
    .store
    .get_banner(banner_id, false)
    .await?
    .ok_or_else(|| not_found(banner_id))?;
  payload.into_changes(mode)?.apply(&mut banner);
  if !app_state.store.update_banner(&banner).await? {
    return Err(not_found(banner_id));
  }
  info!(%banner_id, "Banner updated.");
  Ok(HttpResponse::Ok().json(banner))
}

#[instrument(name = "handler::replace_banner", skip_all, fields(banner_id = %path.as_ref()))]
pub async fn replace_banner_handler(
  app_state: web::Data<AppState>,
  _staff: StaffUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
  update_banner(&app_state, path.into_inner(), req_payload.into_inner(), Mode::Full).await
}

#[instrument(name = "handler::patch_banner", skip_all, fields(banner_id = %path.as_ref()))]
pub async fn patch_banner_handler(
  app_state: web::Data<AppState>,
  _staff: StaffUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
  update_banner(&app_state, path.into_inner(), req_payload.into_inner(), Mode::Partial).await
}

#[instrument(name = "handler::delete_banner", skip_all, fields(banner_id = %path.as_ref()))]
pub async fn delete_banner_handler(
  app_state: web::Data<AppState>,
  _staff: StaffUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let banner_id = path.into_inner();
  let banner = app_state
    .store
    .get_banner(banner_id, false)
    .await?
    .ok_or_else(|| not_found(banner_id))?;
  app_state.store.delete_banner(banner_id).await?;
  if let Some(image) = &banner.image {
    app_state.media.remove(image).await;
  }
  info!(%banner_id, "Banner deleted.");
  Ok(HttpResponse::NoContent().finish())
}

#[instrument(name = "handler::upload_banner_image", skip_all, fields(banner_id = %path.as_ref()))]
pub async fn upload_banner_image_handler(
  app_state: web::Data<AppState>,
  _staff: StaffUser,
  path: web::Path<Uuid>,
  mut multipart: Multipart,
) -> Result<HttpResponse, AppError> {
  let banner_id = path.into_inner();
  let mut banner = app_state
    .store
    .get_banner(banner_id, false)
    .await?
    .ok_or_else(|| not_found(banner_id))?;

  let bytes = read_image_field(&mut multipart, MAX_UPLOAD_BYTES).await?;
  let url = app_state.media.save_image(MediaKind::Banner, bytes).await?;
  let previous = banner.image.replace(url.clone());
  let attached = app_state.store.update_banner(&banner).await;
  if !app_state.media.finish_replacement(&url, previous.as_deref(), attached).await? {
    return Err(not_found(banner_id));
  }
  info!(%banner_id, "Banner image replaced.");
  Ok(HttpResponse::Ok().json(banner))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn empty_link_clears_and_long_link_is_rejected() {
    let payload: BannerPayload = serde_json::from_value(json!({"link_url": "  "})).unwrap();
    assert_eq!(payload.into_changes(Mode::Partial).unwrap().link_url, Some(None));

    let payload: BannerPayload =
      serde_json::from_value(json!({"title": "Spring catch", "link_url": "x".repeat(256)})).unwrap();
    match payload.into_changes(Mode::Full) {
      Err(AppError::Fields(fields)) => {
        assert!(fields.get("link_url").is_some());
        assert!(fields.get("title").is_none());
      }
      other => panic!("unexpected result: {other:?}"),
    }
  }
}
