// storefront/src/db/memory.rs

//! `Store` kept entirely in process memory. Mirrors the relational rules of the
//! Postgres schema (cascades, SET NULL, ordering) so the HTTP layer behaves
//! identically on both backends.
//!
//! Lock guards are never held across an `.await`.

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{duplicate_account, AccountField, MessageFilter, OrderFilter, Page, PageRequest, ProductFilter, Store};
use crate::errors::Result;
use crate::models::{
  Banner, ContactMessage, DailyRevenue, LowStockProduct, Order, OrderDetail, OrderItem, OrderItemDetail,
  OrderStatus, Product, User,
};

#[derive(Debug, Default)]
struct Tables {
  users: Vec<User>,
  products: Vec<Product>,
  orders: Vec<Order>,
  order_items: Vec<OrderItem>,
  banners: Vec<Banner>,
  messages: Vec<ContactMessage>,
}

impl Tables {
  /// Mirrors the case-insensitive unique indexes on `users`.
  fn check_unique_account(&self, user: &User) -> Result<()> {
    let others = self.users.iter().filter(|u| u.id != user.id);
    for other in others {
      if other.username.to_lowercase() == user.username.to_lowercase() {
        return Err(duplicate_account(AccountField::Username));
      }
      if other.email.to_lowercase() == user.email.to_lowercase() {
        return Err(duplicate_account(AccountField::Email));
      }
    }
    Ok(())
  }

  fn order_detail(&self, order: &Order) -> OrderDetail {
    let user_name = self
      .users
      .iter()
      .find(|u| u.id == order.user_id)
      .map(|u| u.username.clone())
      .unwrap_or_default();
    let items = self
      .order_items
      .iter()
      .filter(|item| item.order_id == order.id)
      .map(|item| {
        let product = self.products.iter().find(|p| p.id == item.product_id);
        OrderItemDetail {
          id: item.id,
          order_id: item.order_id,
          product: item.product_id,
          product_name: product.map(|p| p.name.clone()).unwrap_or_default(),
          image: product.and_then(|p| p.image.clone()),
          quantity: item.quantity,
          price_at_purchase: item.price_at_purchase,
        }
      })
      .collect();
    OrderDetail::new(order.clone(), user_name, items)
  }

  fn remove_orders_where<F: Fn(&Order) -> bool>(&mut self, predicate: F) -> usize {
    let doomed: Vec<Uuid> = self.orders.iter().filter(|o| predicate(o)).map(|o| o.id).collect();
    self.order_items.retain(|item| !doomed.contains(&item.order_id));
    self.orders.retain(|o| !doomed.contains(&o.id));
    doomed.len()
  }
}

/// Newest first; rows created in the same instant keep reverse insertion order.
fn newest_first<T: Clone, F>(rows: &[T], created_at: F) -> Vec<T>
where
  F: Fn(&T) -> chrono::DateTime<chrono::Utc>,
{
  let mut out: Vec<T> = rows.iter().rev().cloned().collect();
  out.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
  out
}

fn paged<T>(rows: Vec<T>, page: PageRequest) -> Page<T> {
  let count = rows.len() as i64;
  Page { count, results: page.slice(rows) }
}

fn replace_by_id<T: Clone, F: Fn(&T) -> Uuid>(rows: &mut [T], row: &T, id_of: F) -> bool {
  match rows.iter_mut().find(|existing| id_of(existing) == id_of(row)) {
    Some(slot) => {
      *slot = row.clone();
      true
    }
    None => false,
  }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
  tables: RwLock<Tables>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of stored line items, across all orders.
  pub fn order_item_count(&self) -> usize {
    self.tables.read().order_items.len()
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn insert_user(&self, user: &User) -> Result<()> {
    let mut tables = self.tables.write();
    tables.check_unique_account(user)?;
    tables.users.push(user.clone());
    Ok(())
  }

  async fn update_user(&self, user: &User) -> Result<bool> {
    let mut tables = self.tables.write();
    tables.check_unique_account(user)?;
    Ok(replace_by_id(&mut tables.users, user, |u| u.id))
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    Ok(self.tables.read().users.iter().find(|u| u.id == id).cloned())
  }

  async fn find_users_by_login(&self, login: &str) -> Result<Vec<User>> {
    Ok(self.tables.read().users.iter().filter(|u| u.matches_login(login)).cloned().collect())
  }

  async fn list_users(&self) -> Result<Vec<User>> {
    let mut users = self.tables.read().users.clone();
    users.sort_by_key(|u| u.date_joined);
    Ok(users)
  }

  async fn delete_user(&self, id: Uuid) -> Result<bool> {
    let mut tables = self.tables.write();
    let before = tables.users.len();
    tables.users.retain(|u| u.id != id);
    if tables.users.len() == before {
      return Ok(false);
    }
    tables.remove_orders_where(|o| o.user_id == id);
    for message in tables.messages.iter_mut().filter(|m| m.user == Some(id)) {
      message.user = None;
    }
    Ok(true)
  }

  async fn count_users(&self) -> Result<i64> {
    Ok(self.tables.read().users.len() as i64)
  }

  async fn insert_product(&self, product: &Product) -> Result<()> {
    self.tables.write().products.push(product.clone());
    Ok(())
  }

  async fn update_product(&self, product: &Product) -> Result<bool> {
    Ok(replace_by_id(&mut self.tables.write().products, product, |p| p.id))
  }

  async fn get_product(&self, id: Uuid) -> Result<Option<Product>> {
    Ok(self.tables.read().products.iter().find(|p| p.id == id).cloned())
  }

  async fn get_products(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
    Ok(self.tables.read().products.iter().filter(|p| ids.contains(&p.id)).cloned().collect())
  }

  async fn list_products(&self, filter: &ProductFilter, page: PageRequest) -> Result<Page<Product>> {
    let tables = self.tables.read();
    let rows: Vec<Product> = newest_first(&tables.products, |p| p.created_at)
      .into_iter()
      .filter(|p| filter.matches(p))
      .collect();
    Ok(paged(rows, page))
  }

  async fn delete_product(&self, id: Uuid) -> Result<bool> {
    let mut tables = self.tables.write();
    let before = tables.products.len();
    tables.products.retain(|p| p.id != id);
    tables.order_items.retain(|item| item.product_id != id);
    Ok(tables.products.len() != before)
  }

  async fn set_product_stock(&self, id: Uuid, stock_quantity: i32) -> Result<Option<Product>> {
    let mut tables = self.tables.write();
    Ok(tables.products.iter_mut().find(|p| p.id == id).map(|p| {
      p.stock_quantity = stock_quantity;
      p.clone()
    }))
  }

  async fn find_first_product_matching(&self, terms: &[String]) -> Result<Option<Product>> {
    if terms.is_empty() {
      return Ok(None);
    }
    let terms: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();
    let mut products = self.tables.read().products.clone();
    products.sort_by_key(|p| p.created_at); // stable: ties keep insertion order
    Ok(products.into_iter().find(|p| {
      let name = p.name.to_lowercase();
      let category = p.category.to_lowercase();
      terms.iter().any(|t| name.contains(t.as_str()) || category.contains(t.as_str()))
    }))
  }

  async fn count_products(&self) -> Result<i64> {
    Ok(self.tables.read().products.len() as i64)
  }

  async fn low_stock_products(&self) -> Result<Vec<LowStockProduct>> {
    let mut low: Vec<LowStockProduct> = self
      .tables
      .read()
      .products
      .iter()
      .filter(|p| p.is_low_stock())
      .map(LowStockProduct::from)
      .collect();
    low.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(low)
  }

  async fn insert_order(&self, order: &Order, items: &[OrderItem]) -> Result<()> {
    let mut tables = self.tables.write();
    tables.orders.push(order.clone());
    tables.order_items.extend(items.iter().cloned());
    Ok(())
  }

  async fn get_order(&self, id: Uuid, filter: &OrderFilter) -> Result<Option<OrderDetail>> {
    let tables = self.tables.read();
    Ok(
      tables
        .orders
        .iter()
        .find(|o| o.id == id && filter.matches(o))
        .map(|o| tables.order_detail(o)),
    )
  }

  async fn list_orders(&self, filter: &OrderFilter, page: PageRequest) -> Result<Page<OrderDetail>> {
    let tables = self.tables.read();
    let rows: Vec<Order> = newest_first(&tables.orders, |o| o.created_at)
      .into_iter()
      .filter(|o| filter.matches(o))
      .collect();
    let count = rows.len() as i64;
    let results = page.slice(rows).iter().map(|o| tables.order_detail(o)).collect();
    Ok(Page { count, results })
  }

  async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> Result<Option<Order>> {
    let mut tables = self.tables.write();
    Ok(tables.orders.iter_mut().find(|o| o.id == id).map(|o| {
      o.status = status;
      o.clone()
    }))
  }

  async fn delete_order(&self, id: Uuid) -> Result<bool> {
    Ok(self.tables.write().remove_orders_where(|o| o.id == id) > 0)
  }

  async fn count_orders(&self) -> Result<i64> {
    Ok(self.tables.read().orders.len() as i64)
  }

  async fn total_revenue(&self) -> Result<Decimal> {
    Ok(self.tables.read().orders.iter().map(|o| o.total_amount).sum())
  }

  async fn daily_revenue(&self) -> Result<Vec<DailyRevenue>> {
    let mut buckets: BTreeMap<chrono::NaiveDate, Decimal> = BTreeMap::new();
    for order in self.tables.read().orders.iter() {
      *buckets.entry(order.created_at.date_naive()).or_insert(Decimal::ZERO) += order.total_amount;
    }
    Ok(buckets.into_iter().map(|(day, revenue)| DailyRevenue { day, revenue }).collect())
  }

  async fn insert_banner(&self, banner: &Banner) -> Result<()> {
    self.tables.write().banners.push(banner.clone());
    Ok(())
  }

  async fn update_banner(&self, banner: &Banner) -> Result<bool> {
    Ok(replace_by_id(&mut self.tables.write().banners, banner, |b| b.id))
  }

  async fn get_banner(&self, id: Uuid, active_only: bool) -> Result<Option<Banner>> {
    Ok(
      self
        .tables
        .read()
        .banners
        .iter()
        .find(|b| b.id == id && (b.active || !active_only))
        .cloned(),
    )
  }

  async fn list_banners(&self, active_only: bool, page: PageRequest) -> Result<Page<Banner>> {
    let tables = self.tables.read();
    let rows: Vec<Banner> = newest_first(&tables.banners, |b| b.created_at)
      .into_iter()
      .filter(|b| b.active || !active_only)
      .collect();
    Ok(paged(rows, page))
  }

  async fn delete_banner(&self, id: Uuid) -> Result<bool> {
    let mut tables = self.tables.write();
    let before = tables.banners.len();
    tables.banners.retain(|b| b.id != id);
    Ok(tables.banners.len() != before)
  }

  async fn insert_message(&self, message: &ContactMessage) -> Result<()> {
    self.tables.write().messages.push(message.clone());
    Ok(())
  }

  async fn update_message(&self, message: &ContactMessage) -> Result<bool> {
    Ok(replace_by_id(&mut self.tables.write().messages, message, |m| m.id))
  }

  async fn get_message(&self, id: Uuid) -> Result<Option<ContactMessage>> {
    Ok(self.tables.read().messages.iter().find(|m| m.id == id).cloned())
  }

  async fn list_messages(&self, filter: &MessageFilter, page: PageRequest) -> Result<Page<ContactMessage>> {
    let tables = self.tables.read();
    let rows: Vec<ContactMessage> = newest_first(&tables.messages, |m| m.created_at)
      .into_iter()
      .filter(|m| filter.is_read.map_or(true, |r| m.is_read == r))
      .collect();
    Ok(paged(rows, page))
  }

  async fn delete_message(&self, id: Uuid) -> Result<bool> {
    let mut tables = self.tables.write();
    let before = tables.messages.len();
    tables.messages.retain(|m| m.id != id);
    Ok(tables.messages.len() != before)
  }
}
