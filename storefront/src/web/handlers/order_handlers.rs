// storefront/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::db::{OrderFilter, PageRequest};
use crate::errors::{AppError, FieldErrors};
use crate::models::{OrderStatus, User};
use crate::services::order_service::{self, OrderDraft};
use crate::services::validation;
use crate::state::AppState;
use crate::web::extractors::{AuthenticatedUser, StaffUser};
use crate::web::pagination::{PageQuery, Paginated};

#[derive(Deserialize, Debug)]
pub struct ListOrdersQuery {
  pub status: Option<String>,
}

/// Staff see every order; everyone else only their own.
fn visible_to(user: &User) -> OrderFilter {
  if user.is_staff {
    OrderFilter::default()
  } else {
    OrderFilter::owned_by(user.id)
  }
}

fn not_found(id: Uuid) -> AppError {
  warn!("Order with ID {} not found.", id);
  AppError::NotFound(format!("Order with ID {} not found.", id))
}

#[instrument(name = "handler::list_orders", skip_all, fields(user_id = %auth_user.0.id))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  filter_query: web::Query<ListOrdersQuery>,
  page_query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
  let mut filter = visible_to(&auth_user.0);
  if let Some(raw) = filter_query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
    let status = raw.parse::<OrderStatus>().map_err(|e| {
      let mut errors = FieldErrors::new();
      errors.add("status", e.to_string());
      AppError::Fields(errors)
    })?;
    filter.status = Some(status);
  }
  let page = app_state.store.list_orders(&filter, page_query.request()?).await?;
  info!("Fetched {} of {} orders.", page.results.len(), page.count);
  Ok(HttpResponse::Ok().json(Paginated::new(&page_query, page)?))
}

#[instrument(name = "handler::my_orders", skip_all, fields(user_id = %auth_user.0.id))]
pub async fn my_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let page = app_state
    .store
    .list_orders(&visible_to(&auth_user.0), PageRequest::all())
    .await?;
  Ok(HttpResponse::Ok().json(page.results))
}

#[instrument(name = "handler::get_order", skip_all, fields(order_id = %path.as_ref()))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  match app_state.store.get_order(order_id, &visible_to(&auth_user.0)).await? {
    Some(order) => Ok(HttpResponse::Ok().json(order)),
    None => Err(not_found(order_id)),
  }
}

#[instrument(name = "handler::create_order", skip_all, fields(user_id = %auth_user.0.id))]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
  let draft: OrderDraft = validation::parse_payload(req_payload.into_inner())?;
  let order = order_service::place_order(app_state.store.as_ref(), &auth_user.0, draft).await?;
  Ok(HttpResponse::Created().json(order))
}

#[instrument(name = "handler::delete_order", skip_all, fields(order_id = %path.as_ref()))]
pub async fn delete_order_handler(
  app_state: web::Data<AppState>,
  _staff: StaffUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  if !app_state.store.delete_order(order_id).await? {
    return Err(not_found(order_id));
  }
  info!(%order_id, "Order deleted.");
  Ok(HttpResponse::NoContent().finish())
}

/// Sets any declared status; transitions are not restricted.
#[instrument(name = "handler::update_order_status", skip_all, fields(order_id = %path.as_ref()))]
pub async fn update_status_handler(
  app_state: web::Data<AppState>,
  _staff: StaffUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let raw = match req_payload.get("status") {
    None | Some(Value::Null) => None,
    Some(Value::String(s)) if s.trim().is_empty() => None,
    Some(Value::String(s)) => Some(s.trim().to_string()),
    Some(other) => Some(other.to_string()),
  };
  let Some(raw) = raw else {
    return Err(AppError::Validation("status is required".to_string()));
  };
  let status = raw.parse::<OrderStatus>().map_err(|e| {
    let mut errors = FieldErrors::new();
    errors.add("status", e.to_string());
    AppError::Fields(errors)
  })?;

  let order = app_state
    .store
    .set_order_status(order_id, status)
    .await?
    .ok_or_else(|| not_found(order_id))?;
  info!(%order_id, status = %order.status, "Order status updated.");
  Ok(HttpResponse::Ok().json(json!({
    "status": "order status updated",
    "new_status": order.status,
  })))
}

#[instrument(name = "handler::order_stats", skip_all)]
pub async fn stats_handler(app_state: web::Data<AppState>, _staff: StaffUser) -> Result<HttpResponse, AppError> {
  let stats = order_service::dashboard_stats(app_state.store.as_ref()).await?;
  Ok(HttpResponse::Ok().json(stats))
}

#[instrument(name = "handler::order_analytics", skip_all)]
pub async fn analytics_handler(app_state: web::Data<AppState>, _staff: StaffUser) -> Result<HttpResponse, AppError> {
  let points = order_service::revenue_by_day(app_state.store.as_ref()).await?;
  Ok(HttpResponse::Ok().json(points))
}
