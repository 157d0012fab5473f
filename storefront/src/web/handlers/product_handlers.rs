// storefront/src/web/handlers/product_handlers.rs

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::db::ProductFilter;
use crate::errors::{AppError, FieldErrors};
use crate::models::{Product, ProductChanges};
use crate::services::media_service::{MediaKind, MAX_UPLOAD_BYTES};
use crate::services::validation::{self, double_option, Mode, INVALID_INTEGER};
use crate::state::AppState;
use crate::web::extractors::StaffUser;
use crate::web::multipart::read_image_field;
use crate::web::pagination::{PageQuery, Paginated};

#[derive(Deserialize, Debug)]
pub struct ListProductsQuery {
  pub category: Option<String>,
  pub search: Option<String>,
}

#[derive(Deserialize, Validate, Debug, Default)]
pub struct ProductPayload {
  #[validate(length(min = 1, max = 255))]
  pub name: Option<String>,
  #[validate(length(min = 1))]
  pub description: Option<String>,
  pub price: Option<Decimal>,
  #[validate(length(min = 1, max = 100))]
  pub category: Option<String>,
  pub stock_quantity: Option<i32>,
  #[serde(default, deserialize_with = "double_option")]
  pub wholesale_price: Option<Option<Decimal>>,
  #[validate(range(min = 0))]
  pub wholesale_moq: Option<i32>,
  #[validate(range(min = 0))]
  pub low_stock_threshold: Option<i32>,
  #[validate(range(min = 0, max = 100))]
  pub discount_percent: Option<i32>,
}

impl ProductPayload {
  pub fn into_changes(mut self, mode: Mode) -> Result<ProductChanges, AppError> {
    self.name = validation::trimmed(self.name);
    self.description = validation::trimmed(self.description);
    self.category = validation::trimmed(self.category);

    let mut errors = validation::check(&self);
    validation::require(
      &mut errors,
      mode,
      &[
        ("name", self.name.is_some()),
        ("description", self.description.is_some()),
        ("price", self.price.is_some()),
        ("category", self.category.is_some()),
      ],
    );
    let changes = ProductChanges {
      price: self.price.and_then(|price| validation::money(&mut errors, "price", price)),
      wholesale_price: match self.wholesale_price {
        Some(Some(price)) => validation::money(&mut errors, "wholesale_price", price).map(Some),
        other => other,
      },
      name: self.name,
      description: self.description,
      category: self.category,
      stock_quantity: self.stock_quantity,
      wholesale_moq: self.wholesale_moq,
      low_stock_threshold: self.low_stock_threshold,
      discount_percent: self.discount_percent,
    };
    errors.finish(changes)
  }
}

fn not_found(id: Uuid) -> AppError {
  warn!("Product with ID {} not found.", id);
  AppError::NotFound(format!("Product with ID {} not found.", id))
}

#[instrument(name = "handler::list_products", skip(app_state, filter_query, page_query))]
pub async fn list_products_handler(
  app_state: web::Data<AppState>,
  filter_query: web::Query<ListProductsQuery>,
  page_query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
  let query = filter_query.into_inner();
  let filter = ProductFilter {
    category: query.category.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
    search: query.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
  };
  let page = app_state.store.list_products(&filter, page_query.request()?).await?;
  info!("Successfully fetched {} of {} products.", page.results.len(), page.count);
  Ok(HttpResponse::Ok().json(Paginated::new(&page_query, page)?))
}

#[instrument(name = "handler::get_product", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  match app_state.store.get_product(product_id).await? {
    Some(product) => Ok(HttpResponse::Ok().json(product)),
    None => Err(not_found(product_id)),
  }
}

#[instrument(name = "handler::create_product", skip_all, fields(staff_id = %staff.0.id))]
pub async fn create_product_handler(
  app_state: web::Data<AppState>,
  staff: StaffUser,
  req_payload: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
  let payload: ProductPayload = validation::parse_payload(req_payload.into_inner())?;
  let changes = payload.into_changes(Mode::Full)?;
  let mut product = Product::draft();
  changes.apply(&mut product);
  app_state.store.insert_product(&product).await?;
  info!(product_id = %product.id, "Product created.");
  Ok(HttpResponse::Created().json(product))
}

async fn update_product(
  app_state: &AppState,
  product_id: Uuid,
  body: Value,
  mode: Mode,
) -> Result<HttpResponse, AppError> {
  let payload: ProductPayload = validation::parse_payload(body)?;
  let mut product = app_state
    .store
    .get_product(product_id)
    .await?
    .ok_or_else(|| not_found(product_id))?;
  payload.into_changes(mode)?.apply(&mut product);
  if !app_state.store.update_product(&product).await? {
    return Err(not_found(product_id));
  }
  info!(product_id = %product.id, "Product updated.");
  Ok(HttpResponse::Ok().json(product))
}

#[instrument(name = "handler::replace_product", skip_all, fields(product_id = %path.as_ref()))]
pub async fn replace_product_handler(
  app_state: web::Data<AppState>,
  _staff: StaffUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
  update_product(&app_state, path.into_inner(), req_payload.into_inner(), Mode::Full).await
}

#[instrument(name = "handler::patch_product", skip_all, fields(product_id = %path.as_ref()))]
pub async fn patch_product_handler(
  app_state: web::Data<AppState>,
  _staff: StaffUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
  update_product(&app_state, path.into_inner(), req_payload.into_inner(), Mode::Partial).await
}

#[instrument(name = "handler::delete_product", skip_all, fields(product_id = %path.as_ref()))]
pub async fn delete_product_handler(
  app_state: web::Data<AppState>,
  _staff: StaffUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  let product = app_state
    .store
    .get_product(product_id)
    .await?
    .ok_or_else(|| not_found(product_id))?;
  if !app_state.store.delete_product(product_id).await? {
    return Err(not_found(product_id));
  }
  if let Some(image) = &product.image {
    app_state.media.remove(image).await;
  }
  info!(%product_id, "Product deleted.");
  Ok(HttpResponse::NoContent().finish())
}

/// Overwrites the stock count. Any integer is accepted, negatives included.
#[instrument(name = "handler::update_stock", skip_all, fields(product_id = %path.as_ref()))]
pub async fn update_stock_handler(
  app_state: web::Data<AppState>,
  _staff: StaffUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  let raw = req_payload.get("stock_quantity").filter(|v| !v.is_null());
  let Some(raw) = raw else {
    return Err(AppError::Validation("stock_quantity is required".to_string()));
  };
  let Some(stock_quantity) = validation::integer_value(raw) else {
    let mut errors = FieldErrors::new();
    errors.add("stock_quantity", INVALID_INTEGER);
    return Err(AppError::Fields(errors));
  };

  let product = app_state
    .store
    .set_product_stock(product_id, stock_quantity)
    .await?
    .ok_or_else(|| not_found(product_id))?;
  info!(%product_id, stock_quantity, "Stock updated.");
  Ok(HttpResponse::Ok().json(json!({
    "status": "stock updated",
    "stock_quantity": product.stock_quantity,
  })))
}

#[instrument(name = "handler::upload_product_image", skip_all, fields(product_id = %path.as_ref()))]
pub async fn upload_product_image_handler(
  app_state: web::Data<AppState>,
  _staff: StaffUser,
  path: web::Path<Uuid>,
  mut multipart: Multipart,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  let mut product = app_state
    .store
    .get_product(product_id)
    .await?
    .ok_or_else(|| not_found(product_id))?;

  let bytes = read_image_field(&mut multipart, MAX_UPLOAD_BYTES).await?;
  let url = app_state.media.save_image(MediaKind::Product, bytes).await?;
  let previous = product.image.replace(url.clone());
  let attached = app_state.store.update_product(&product).await;
  if !app_state.media.finish_replacement(&url, previous.as_deref(), attached).await? {
    return Err(not_found(product_id));
  }
  info!(%product_id, "Product image replaced.");
  Ok(HttpResponse::Ok().json(product))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn field_errors(err: AppError) -> FieldErrors {
    match err {
      AppError::Fields(fields) => fields,
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn full_payload_requires_core_fields() {
    let fields = field_errors(ProductPayload::default().into_changes(Mode::Full).unwrap_err());
    for field in ["name", "description", "price", "category"] {
      assert!(fields.get(field).is_some(), "{field} should be required");
    }
    assert!(ProductPayload::default().into_changes(Mode::Partial).is_ok());
  }

  #[test]
  fn wholesale_price_can_be_cleared() {
    let payload: ProductPayload = serde_json::from_value(json!({"wholesale_price": null})).unwrap();
    let changes = payload.into_changes(Mode::Partial).unwrap();
    assert_eq!(changes.wholesale_price, Some(None));
  }

  #[test]
  fn field_rules_report_each_offending_field() {
    let payload: ProductPayload = serde_json::from_value(json!({
      "name": "   ",
      "category": "c".repeat(101),
      "price": "1.005",
      "discount_percent": 101,
      "wholesale_moq": -1,
    }))
    .unwrap();
    let fields = field_errors(payload.into_changes(Mode::Partial).unwrap_err());
    assert_eq!(fields.get("name"), Some(&[validation::BLANK.to_string()][..]));
    assert_eq!(
      fields.get("category"),
      Some(&["Ensure this field has no more than 100 characters.".to_string()][..])
    );
    assert_eq!(
      fields.get("discount_percent"),
      Some(&["Ensure this value is less than or equal to 100.".to_string()][..])
    );
    assert!(fields.get("price").is_some());
    assert!(fields.get("wholesale_moq").is_some());
  }

  #[test]
  fn mistyped_price_is_a_field_error() {
    let err = validation::parse_payload::<ProductPayload>(json!({"name": "Cod", "price": "abc"})).unwrap_err();
    let fields = field_errors(err);
    assert!(fields.get("price").is_some());
    assert!(fields.get("name").is_none());
  }
}
