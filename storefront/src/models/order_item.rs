// storefront/src/models/order_item.rs

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub price_at_purchase: Decimal, // Snapshot taken when the order was placed
}

/// Line item joined with the product's display fields.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItemDetail {
  pub id: Uuid,
  #[serde(skip)]
  pub order_id: Uuid,
  pub product: Uuid,
  pub product_name: String,
  pub image: Option<String>,
  pub quantity: i32,
  pub price_at_purchase: Decimal,
}
