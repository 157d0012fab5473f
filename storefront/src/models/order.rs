// storefront/src/models/order.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{
  encode::IsNull,
  error::BoxDynError,
  postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef},
  Decode, Encode, FromRow, Postgres, Type,
};
use std::{fmt, str::FromStr};
use thiserror::Error;
use uuid::Uuid;

use super::order_item::OrderItemDetail;

/// Declared order statuses. Stored as lowercase text in `orders.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Processing,
  Shipped,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  pub const ALL: [OrderStatus; 5] = [
    OrderStatus::Pending,
    OrderStatus::Processing,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Processing => "processing",
      OrderStatus::Shipped => "shipped",
      OrderStatus::Delivered => "delivered",
      OrderStatus::Cancelled => "cancelled",
    }
  }
}

impl Default for OrderStatus {
  fn default() -> Self {
    OrderStatus::Pending
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("\"{0}\" is not a valid choice.")]
pub struct UnknownOrderStatus(pub String);

impl FromStr for OrderStatus {
  type Err = UnknownOrderStatus;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    OrderStatus::ALL
      .into_iter()
      .find(|status| status.as_str() == s)
      .ok_or_else(|| UnknownOrderStatus(s.to_string()))
  }
}

// Text-backed column: delegate to the `&str` codec.
impl Type<Postgres> for OrderStatus {
  fn type_info() -> PgTypeInfo {
    <&str as Type<Postgres>>::type_info()
  }

  fn compatible(ty: &PgTypeInfo) -> bool {
    <&str as Type<Postgres>>::compatible(ty)
  }
}

impl<'r> Decode<'r, Postgres> for OrderStatus {
  fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
    let raw = <&str as Decode<Postgres>>::decode(value)?;
    Ok(raw.parse()?)
  }
}

impl Encode<'_, Postgres> for OrderStatus {
  fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
    <&str as Encode<Postgres>>::encode(self.as_str(), buf)
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  pub total_amount: Decimal,
  pub status: OrderStatus,
  pub delivery_address: String,
  pub created_at: DateTime<Utc>,
}

/// An order with its owner's username and line items, as served by the API.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
  pub id: Uuid,
  pub user: Uuid,
  pub user_name: String,
  pub total_amount: Decimal,
  pub status: OrderStatus,
  pub delivery_address: String,
  pub items: Vec<OrderItemDetail>,
  pub created_at: DateTime<Utc>,
}

impl OrderDetail {
  pub fn new(order: Order, user_name: String, items: Vec<OrderItemDetail>) -> Self {
    Self {
      id: order.id,
      user: order.user_id,
      user_name,
      total_amount: order.total_amount,
      status: order.status,
      delivery_address: order.delivery_address,
      items,
      created_at: order.created_at,
    }
  }
}

/// Revenue summed over one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct DailyRevenue {
  pub day: NaiveDate,
  pub revenue: Decimal,
}
