// storefront/src/services/order_service.rs

//! Order placement and the staff dashboard aggregates.

use crate::db::{OrderFilter, PageRequest, Store};
use crate::errors::{AppError, Result};
use crate::models::{DailyRevenue, LowStockProduct, Order, OrderDetail, OrderItem, OrderStatus, User};
use crate::services::validation;
use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

const RECENT_ORDERS: i64 = 5;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct OrderItemDraft {
  #[validate(required)]
  pub product: Option<Uuid>,
  #[validate(required, range(min = 1))]
  pub quantity: Option<i32>,
}

/// Order payload as submitted by the customer. Any `status` sent along is
/// ignored; new orders always start as pending.
#[derive(Debug, Deserialize, Validate)]
pub struct OrderDraft {
  #[validate(required, length(min = 1))]
  pub delivery_address: Option<String>,
  #[validate(required)]
  pub total_amount: Option<Decimal>,
  #[serde(default)]
  #[validate(length(min = 1, message = "Ensure this field has at least 1 elements."), nested)]
  pub items: Vec<OrderItemDraft>,
}

/// Validates the draft, snapshots current product prices onto the line items
/// and stores the order with its items in one write.
#[instrument(name = "order_service::place_order", skip(store, customer, draft), fields(user_id = %customer.id))]
pub async fn place_order(store: &dyn Store, customer: &User, mut draft: OrderDraft) -> Result<OrderDetail> {
  draft.delivery_address = validation::trimmed(draft.delivery_address);
  let mut errors = validation::check(&draft);
  let total_amount = draft
    .total_amount
    .and_then(|total| validation::money(&mut errors, "total_amount", total));

  let ids: Vec<Uuid> = draft.items.iter().filter_map(|d| d.product).collect();
  let prices: HashMap<Uuid, Decimal> = store
    .get_products(&ids)
    .await?
    .into_iter()
    .map(|p| (p.id, p.price))
    .collect();

  let order_id = Uuid::new_v4();
  let mut items = Vec::with_capacity(draft.items.len());
  for (index, item) in draft.items.iter().enumerate() {
    let Some(product_id) = item.product else { continue };
    let Some(price) = prices.get(&product_id) else {
      errors.add(
        format!("items[{}].product", index),
        format!("Invalid pk \"{}\" - object does not exist.", product_id),
      );
      continue;
    };
    if let Some(quantity) = item.quantity {
      items.push(OrderItem {
        id: Uuid::new_v4(),
        order_id,
        product_id,
        quantity,
        price_at_purchase: *price,
      });
    }
  }

  let (delivery_address, total_amount) = match errors.finish((draft.delivery_address, total_amount))? {
    (Some(address), Some(total)) => (address, total),
    _ => return Err(AppError::Internal("Order fields missing after validation.".to_string())),
  };

  let order = Order {
    id: order_id,
    user_id: customer.id,
    total_amount,
    status: OrderStatus::Pending,
    delivery_address,
    created_at: Utc::now(),
  };
  store.insert_order(&order, &items).await?;
  info!(order_id = %order.id, items = items.len(), "Order placed.");

  store
    .get_order(order.id, &OrderFilter::default())
    .await?
    .ok_or_else(|| AppError::Internal(format!("Order {} vanished after insert.", order.id)))
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
  pub total_revenue: f64,
  pub total_orders: i64,
  pub total_products: i64,
  pub total_users: i64,
  pub recent_orders: Vec<OrderDetail>,
  pub low_stock_products: Vec<LowStockProduct>,
}

#[instrument(name = "order_service::dashboard_stats", skip(store))]
pub async fn dashboard_stats(store: &dyn Store) -> Result<DashboardStats> {
  let total_revenue = store.total_revenue().await?;
  let recent = store
    .list_orders(&OrderFilter::default(), PageRequest::first(RECENT_ORDERS))
    .await?;
  Ok(DashboardStats {
    total_revenue: to_f64(total_revenue),
    total_orders: store.count_orders().await?,
    total_products: store.count_products().await?,
    total_users: store.count_users().await?,
    recent_orders: recent.results,
    low_stock_products: store.low_stock_products().await?,
  })
}

#[derive(Debug, Serialize, PartialEq)]
pub struct RevenuePoint {
  pub date: String,
  #[serde(rename = "displayDate")]
  pub display_date: String,
  pub revenue: f64,
}

impl From<DailyRevenue> for RevenuePoint {
  fn from(day: DailyRevenue) -> Self {
    Self {
      date: day.day.format("%Y-%m-%d").to_string(),
      display_date: day.day.format("%b %d").to_string(),
      revenue: to_f64(day.revenue),
    }
  }
}

#[instrument(name = "order_service::revenue_by_day", skip(store))]
pub async fn revenue_by_day(store: &dyn Store) -> Result<Vec<RevenuePoint>> {
  let days = store.daily_revenue().await?;
  Ok(days.into_iter().map(RevenuePoint::from).collect())
}

fn to_f64(value: Decimal) -> f64 {
  value.to_f64().unwrap_or_else(|| {
    warn!(%value, "Decimal not representable as f64.");
    0.0
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::MemoryStore;
  use crate::models::Product;
  use chrono::NaiveDate;

  fn customer() -> User {
    User {
      id: Uuid::new_v4(),
      username: "angler".to_string(),
      email: "angler@harbour.example".to_string(),
      first_name: String::new(),
      last_name: String::new(),
      password_hash: String::new(),
      is_staff: false,
      date_joined: Utc::now(),
    }
  }

  async fn seeded() -> (MemoryStore, User, Product) {
    let store = MemoryStore::new();
    let user = customer();
    store.insert_user(&user).await.unwrap();
    let mut product = Product::draft();
    product.name = "Tuna".to_string();
    product.category = "Fish".to_string();
    product.price = Decimal::new(1999, 2);
    store.insert_product(&product).await.unwrap();
    (store, user, product)
  }

  #[tokio::test]
  async fn place_order_snapshots_prices() {
    let (store, user, mut product) = seeded().await;
    let draft = OrderDraft {
      delivery_address: Some("1 Pier Road".to_string()),
      total_amount: Some(Decimal::new(3998, 2)),
      items: vec![OrderItemDraft { product: Some(product.id), quantity: Some(2) }],
    };
    let order = place_order(&store, &user, draft).await.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.items[0].price_at_purchase, Decimal::new(1999, 2));

    product.price = Decimal::new(2500, 2);
    store.update_product(&product).await.unwrap();
    let reloaded = store.get_order(order.id, &OrderFilter::default()).await.unwrap().unwrap();
    assert_eq!(reloaded.items[0].price_at_purchase, Decimal::new(1999, 2));
  }

  #[tokio::test]
  async fn place_order_reports_item_errors() {
    let (store, user, product) = seeded().await;
    let missing = Uuid::new_v4();
    let draft = OrderDraft {
      delivery_address: Some("1 Pier Road".to_string()),
      total_amount: Some(Decimal::ONE),
      items: vec![
        OrderItemDraft { product: Some(product.id), quantity: Some(0) },
        OrderItemDraft { product: Some(missing), quantity: Some(1) },
        OrderItemDraft { product: None, quantity: Some(1) },
      ],
    };
    match place_order(&store, &user, draft).await.unwrap_err() {
      AppError::Fields(fields) => {
        assert_eq!(
          fields.get("items[0].quantity"),
          Some(&["Ensure this value is greater than or equal to 1.".to_string()][..])
        );
        assert!(fields.get("items[1].product").is_some());
        assert_eq!(fields.get("items[2].product"), Some(&[validation::REQUIRED.to_string()][..]));
      }
      other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.count_orders().await.unwrap(), 0);

    let empty = OrderDraft { delivery_address: None, total_amount: None, items: Vec::new() };
    match place_order(&store, &user, empty).await.unwrap_err() {
      AppError::Fields(fields) => {
        assert_eq!(
          fields.get("items"),
          Some(&["Ensure this field has at least 1 elements.".to_string()][..])
        );
        assert_eq!(fields.get("delivery_address"), Some(&[validation::REQUIRED.to_string()][..]));
        assert!(fields.get("total_amount").is_some());
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn revenue_point_formats_dates() {
    let point = RevenuePoint::from(DailyRevenue {
      day: NaiveDate::from_ymd_opt(2025, 3, 7).unwrap(),
      revenue: Decimal::new(1050, 2),
    });
    assert_eq!(point.date, "2025-03-07");
    assert_eq!(point.display_date, "Mar 07");
    assert_eq!(point.revenue, 10.5);
  }
}
