// storefront/src/db/mod.rs

//! Persistence seam. Handlers and services talk to a `Store`; the server runs
//! on `PgStore`, local development and the HTTP tests run on `MemoryStore`.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::errors::{AppError, FieldErrors, Result};
use crate::models::{
  Banner, ContactMessage, DailyRevenue, LowStockProduct, Order, OrderDetail, OrderItem, OrderStatus, Product,
  User,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub const DUPLICATE_USERNAME: &str = "A user with that username already exists.";
pub const DUPLICATE_EMAIL: &str = "A user with that email already exists.";

/// Which unique account column a write collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountField {
  Username,
  Email,
}

impl AccountField {
  pub fn name(self) -> &'static str {
    match self {
      AccountField::Username => "username",
      AccountField::Email => "email",
    }
  }
}

/// Field error reported by every store when a user write would duplicate a
/// username or email (ignoring case).
pub fn duplicate_account(field: AccountField) -> AppError {
  let mut errors = FieldErrors::new();
  let message = match field {
    AccountField::Username => DUPLICATE_USERNAME,
    AccountField::Email => DUPLICATE_EMAIL,
  };
  errors.add(field.name(), message);
  AppError::Fields(errors)
}

/// Offset/limit window over a list. `limit: None` returns everything from `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  pub offset: i64,
  pub limit: Option<i64>,
}

impl PageRequest {
  pub fn all() -> Self {
    Self { offset: 0, limit: None }
  }

  pub fn first(limit: i64) -> Self {
    Self { offset: 0, limit: Some(limit) }
  }

  /// Applies the window to an already-ordered vector.
  pub fn slice<T>(&self, rows: Vec<T>) -> Vec<T> {
    let offset = usize::try_from(self.offset).unwrap_or(0);
    let iter = rows.into_iter().skip(offset);
    match self.limit.and_then(|l| usize::try_from(l).ok()) {
      Some(limit) => iter.take(limit).collect(),
      None => iter.collect(),
    }
  }
}

/// One window of results plus the size of the full filtered set.
#[derive(Debug, Clone)]
pub struct Page<T> {
  pub count: i64,
  pub results: Vec<T>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
  /// Case-insensitive exact category match.
  pub category: Option<String>,
  /// Case-insensitive substring of name, description or category.
  pub search: Option<String>,
}

impl ProductFilter {
  pub fn matches(&self, product: &Product) -> bool {
    let category_ok = self
      .category
      .as_ref()
      .map_or(true, |c| product.category.eq_ignore_ascii_case(c));
    let search_ok = self.search.as_ref().map_or(true, |term| {
      let term = term.to_lowercase();
      product.name.to_lowercase().contains(&term)
        || product.description.to_lowercase().contains(&term)
        || product.category.to_lowercase().contains(&term)
    });
    category_ok && search_ok
  }
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
  /// Restricts the listing to one customer's orders.
  pub user_id: Option<Uuid>,
  pub status: Option<OrderStatus>,
}

impl OrderFilter {
  pub fn owned_by(user_id: Uuid) -> Self {
    Self { user_id: Some(user_id), status: None }
  }

  pub fn matches(&self, order: &Order) -> bool {
    self.user_id.map_or(true, |u| order.user_id == u) && self.status.map_or(true, |s| order.status == s)
  }
}

#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
  pub is_read: Option<bool>,
}

/// Storage operations the web layer depends on. Lists are newest first unless
/// stated otherwise.
#[async_trait]
pub trait Store: Send + Sync + 'static {
  // --- Users ---
  /// Fails with `duplicate_account` when the username or email is taken.
  async fn insert_user(&self, user: &User) -> Result<()>;
  /// Same uniqueness rules as `insert_user`, ignoring the row itself.
  async fn update_user(&self, user: &User) -> Result<bool>;
  async fn get_user(&self, id: Uuid) -> Result<Option<User>>;
  /// Accounts whose username or email equals `login`, ignoring case.
  async fn find_users_by_login(&self, login: &str) -> Result<Vec<User>>;
  /// Accounts ordered by join date, oldest first.
  async fn list_users(&self) -> Result<Vec<User>>;
  /// Cascades to the user's orders; contact messages lose their user reference.
  async fn delete_user(&self, id: Uuid) -> Result<bool>;
  async fn count_users(&self) -> Result<i64>;

  // --- Products ---
  async fn insert_product(&self, product: &Product) -> Result<()>;
  async fn update_product(&self, product: &Product) -> Result<bool>;
  async fn get_product(&self, id: Uuid) -> Result<Option<Product>>;
  async fn get_products(&self, ids: &[Uuid]) -> Result<Vec<Product>>;
  async fn list_products(&self, filter: &ProductFilter, page: PageRequest) -> Result<Page<Product>>;
  /// Cascades to order items referencing the product.
  async fn delete_product(&self, id: Uuid) -> Result<bool>;
  async fn set_product_stock(&self, id: Uuid, stock_quantity: i32) -> Result<Option<Product>>;
  /// Oldest product whose name or category contains any of `terms`, ignoring case.
  async fn find_first_product_matching(&self, terms: &[String]) -> Result<Option<Product>>;
  async fn count_products(&self) -> Result<i64>;
  async fn low_stock_products(&self) -> Result<Vec<LowStockProduct>>;

  // --- Orders ---
  /// Writes the order and all of its items atomically.
  async fn insert_order(&self, order: &Order, items: &[OrderItem]) -> Result<()>;
  async fn get_order(&self, id: Uuid, filter: &OrderFilter) -> Result<Option<OrderDetail>>;
  async fn list_orders(&self, filter: &OrderFilter, page: PageRequest) -> Result<Page<OrderDetail>>;
  async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> Result<Option<Order>>;
  /// Cascades to the order's items.
  async fn delete_order(&self, id: Uuid) -> Result<bool>;
  async fn count_orders(&self) -> Result<i64>;
  async fn total_revenue(&self) -> Result<Decimal>;
  /// Revenue per UTC calendar day, oldest day first.
  async fn daily_revenue(&self) -> Result<Vec<DailyRevenue>>;

  // --- Banners ---
  async fn insert_banner(&self, banner: &Banner) -> Result<()>;
  async fn update_banner(&self, banner: &Banner) -> Result<bool>;
  async fn get_banner(&self, id: Uuid, active_only: bool) -> Result<Option<Banner>>;
  async fn list_banners(&self, active_only: bool, page: PageRequest) -> Result<Page<Banner>>;
  async fn delete_banner(&self, id: Uuid) -> Result<bool>;

  // --- Contact messages ---
  async fn insert_message(&self, message: &ContactMessage) -> Result<()>;
  async fn update_message(&self, message: &ContactMessage) -> Result<bool>;
  async fn get_message(&self, id: Uuid) -> Result<Option<ContactMessage>>;
  async fn list_messages(&self, filter: &MessageFilter, page: PageRequest) -> Result<Page<ContactMessage>>;
  async fn delete_message(&self, id: Uuid) -> Result<bool>;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn page_request_slices_window() {
    let rows: Vec<i32> = (1..=10).collect();
    assert_eq!(PageRequest { offset: 2, limit: Some(3) }.slice(rows.clone()), vec![3, 4, 5]);
    assert_eq!(PageRequest::all().slice(rows.clone()).len(), 10);
    assert!(PageRequest { offset: 20, limit: Some(3) }.slice(rows).is_empty());
  }

  #[test]
  fn product_filter_matches_category_and_search() {
    let mut product = Product::draft();
    product.name = "Atlantic Salmon".to_string();
    product.category = "Fish".to_string();
    product.description = "Fresh fillet".to_string();

    let by_category = ProductFilter { category: Some("fish".to_string()), search: None };
    assert!(by_category.matches(&product));
    let by_search = ProductFilter { category: None, search: Some("FILLET".to_string()) };
    assert!(by_search.matches(&product));
    let miss = ProductFilter { category: Some("Shellfish".to_string()), search: None };
    assert!(!miss.matches(&product));
  }
}
