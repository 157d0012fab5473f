// storefront/src/models/product.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
  pub id: Uuid,
  pub name: String,
  pub description: String,
  pub price: Decimal,
  pub image: Option<String>,
  pub category: String,
  pub stock_quantity: i32, // May go negative, no floor is enforced
  pub wholesale_price: Option<Decimal>,
  pub wholesale_moq: i32,
  pub low_stock_threshold: i32,
  pub discount_percent: i32,
  pub created_at: DateTime<Utc>,
}

impl Product {
  /// A fresh record with column defaults, ready to have validated changes applied.
  pub fn draft() -> Self {
    Self {
      id: Uuid::new_v4(),
      name: String::new(),
      description: String::new(),
      price: Decimal::ZERO,
      image: None,
      category: String::new(),
      stock_quantity: 0,
      wholesale_price: None,
      wholesale_moq: 0,
      low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
      discount_percent: 0,
      created_at: Utc::now(),
    }
  }

  pub fn is_low_stock(&self) -> bool {
    self.stock_quantity < self.low_stock_threshold
  }
}

/// Validated field updates for a product. `None` leaves the field untouched;
/// `wholesale_price: Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
  pub name: Option<String>,
  pub description: Option<String>,
  pub price: Option<Decimal>,
  pub category: Option<String>,
  pub stock_quantity: Option<i32>,
  pub wholesale_price: Option<Option<Decimal>>,
  pub wholesale_moq: Option<i32>,
  pub low_stock_threshold: Option<i32>,
  pub discount_percent: Option<i32>,
}

impl ProductChanges {
  pub fn apply(self, product: &mut Product) {
    if let Some(name) = self.name {
      product.name = name;
    }
    if let Some(description) = self.description {
      product.description = description;
    }
    if let Some(price) = self.price {
      product.price = price;
    }
    if let Some(category) = self.category {
      product.category = category;
    }
    if let Some(stock_quantity) = self.stock_quantity {
      product.stock_quantity = stock_quantity;
    }
    if let Some(wholesale_price) = self.wholesale_price {
      product.wholesale_price = wholesale_price;
    }
    if let Some(wholesale_moq) = self.wholesale_moq {
      product.wholesale_moq = wholesale_moq;
    }
    if let Some(low_stock_threshold) = self.low_stock_threshold {
      product.low_stock_threshold = low_stock_threshold;
    }
    if let Some(discount_percent) = self.discount_percent {
      product.discount_percent = discount_percent;
    }
  }
}

/// Row shape of the low-stock section of the staff stats view.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct LowStockProduct {
  pub id: Uuid,
  pub name: String,
  pub stock_quantity: i32,
}

impl From<&Product> for LowStockProduct {
  fn from(product: &Product) -> Self {
    Self {
      id: product.id,
      name: product.name.clone(),
      stock_quantity: product.stock_quantity,
    }
  }
}
