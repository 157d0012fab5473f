// storefront/src/db/postgres.rs

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::{duplicate_account, AccountField, MessageFilter, OrderFilter, Page, PageRequest, ProductFilter, Store};
use crate::errors::{AppError, Result};
use crate::models::{
  Banner, ContactMessage, DailyRevenue, LowStockProduct, Order, OrderDetail, OrderItem, OrderItemDetail,
  OrderStatus, Product, User,
};

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, password_hash, is_staff, date_joined";
const PRODUCT_COLUMNS: &str = "id, name, description, price, image, category, stock_quantity, wholesale_price, \
                               wholesale_moq, low_stock_threshold, discount_percent, created_at";
const BANNER_COLUMNS: &str = "id, title, image, link_url, active, created_at";
const MESSAGE_COLUMNS: &str = "id, user_id, name, email, subject, message, is_read, created_at";

const PRODUCT_FILTER: &str = "($1::text IS NULL OR LOWER(category) = LOWER($1)) \
                              AND ($2::text IS NULL OR name ILIKE $2 OR description ILIKE $2 OR category ILIKE $2)";
const ORDER_FILTER: &str = "($1::uuid IS NULL OR o.user_id = $1) AND ($2::text IS NULL OR o.status = $2)";

#[derive(FromRow)]
struct OrderRow {
  #[sqlx(flatten)]
  order: Order,
  user_name: String,
}

const USERS_EMAIL_INDEX: &str = "users_email_lower_idx";

/// Unique-index hits on `users` become the same field error the memory store
/// reports; anything else stays a database error.
fn user_write_error(err: sqlx::Error) -> AppError {
  if let sqlx::Error::Database(db) = &err {
    if db.is_unique_violation() {
      let field = match db.constraint() {
        Some(USERS_EMAIL_INDEX) => AccountField::Email,
        _ => AccountField::Username,
      };
      return duplicate_account(field);
    }
  }
  AppError::Sqlx(err)
}

/// Escapes LIKE metacharacters and wraps the term for a substring match.
fn contains_pattern(term: &str) -> String {
  let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
  format!("%{}%", escaped)
}

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  #[instrument(name = "db::connect", skip(database_url), err(Display))]
  pub async fn connect(database_url: &str) -> Result<Self> {
    let pool = PgPoolOptions::new()
      .max_connections(10)
      .connect(database_url)
      .await
      .map_err(|e| {
        error!(error = %e, "Failed to connect to the database.");
        AppError::Sqlx(e)
      })?;
    info!("Successfully connected to the database.");
    Ok(Self::new(pool))
  }

  /// Applies the embedded schema migrations.
  #[instrument(name = "db::migrate", skip(self), err(Display))]
  pub async fn migrate(&self) -> Result<()> {
    sqlx::migrate!("./migrations").run(&self.pool).await?;
    info!("Database migrations applied.");
    Ok(())
  }

  /// Loads the line items of a whole batch of orders with one query.
  async fn attach_items(&self, rows: Vec<OrderRow>) -> Result<Vec<OrderDetail>> {
    if rows.is_empty() {
      return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = rows.iter().map(|r| r.order.id).collect();
    let items: Vec<OrderItemDetail> = sqlx::query_as(
      "SELECT oi.id, oi.order_id, oi.product_id AS product, p.name AS product_name, p.image, \
              oi.quantity, oi.price_at_purchase \
       FROM order_items oi JOIN products p ON p.id = oi.product_id \
       WHERE oi.order_id = ANY($1)",
    )
    .bind(&ids)
    .fetch_all(&self.pool)
    .await?;

    let mut by_order: HashMap<Uuid, Vec<OrderItemDetail>> = HashMap::new();
    for item in items {
      by_order.entry(item.order_id).or_default().push(item);
    }
    Ok(
      rows
        .into_iter()
        .map(|row| {
          let items = by_order.remove(&row.order.id).unwrap_or_default();
          OrderDetail::new(row.order, row.user_name, items)
        })
        .collect(),
    )
  }

  async fn delete_by_id(&self, table: &str, id: Uuid) -> Result<bool> {
    let sql = format!("DELETE FROM {} WHERE id = $1", table);
    let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
    Ok(result.rows_affected() > 0)
  }

  async fn count(&self, table: &str) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", table);
    Ok(sqlx::query_scalar(&sql).fetch_one(&self.pool).await?)
  }
}

#[async_trait]
impl Store for PgStore {
  async fn insert_user(&self, user: &User) -> Result<()> {
    sqlx::query(
      "INSERT INTO users (id, username, email, first_name, last_name, password_hash, is_staff, date_joined) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(user.id)
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.password_hash)
    .bind(user.is_staff)
    .bind(user.date_joined)
    .execute(&self.pool)
    .await
    .map_err(user_write_error)?;
    Ok(())
  }

  async fn update_user(&self, user: &User) -> Result<bool> {
    let result = sqlx::query(
      "UPDATE users SET username = $2, email = $3, first_name = $4, last_name = $5, password_hash = $6, \
       is_staff = $7 WHERE id = $1",
    )
    .bind(user.id)
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.password_hash)
    .bind(user.is_staff)
    .execute(&self.pool)
    .await
    .map_err(user_write_error)?;
    Ok(result.rows_affected() > 0)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
    Ok(sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?)
  }

  async fn find_users_by_login(&self, login: &str) -> Result<Vec<User>> {
    let sql = format!(
      "SELECT {} FROM users WHERE LOWER(username) = LOWER($1) OR LOWER(email) = LOWER($1) ORDER BY date_joined",
      USER_COLUMNS
    );
    Ok(sqlx::query_as(&sql).bind(login).fetch_all(&self.pool).await?)
  }

  async fn list_users(&self) -> Result<Vec<User>> {
    let sql = format!("SELECT {} FROM users ORDER BY date_joined, id", USER_COLUMNS);
    Ok(sqlx::query_as(&sql).fetch_all(&self.pool).await?)
  }

  async fn delete_user(&self, id: Uuid) -> Result<bool> {
    // orders cascade, contact_messages.user_id is SET NULL by the schema
    self.delete_by_id("users", id).await
  }

  async fn count_users(&self) -> Result<i64> {
    self.count("users").await
  }

  async fn insert_product(&self, product: &Product) -> Result<()> {
    sqlx::query(
      "INSERT INTO products (id, name, description, price, image, category, stock_quantity, wholesale_price, \
       wholesale_moq, low_stock_threshold, discount_percent, created_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
    )
    .bind(product.id)
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price)
    .bind(&product.image)
    .bind(&product.category)
    .bind(product.stock_quantity)
    .bind(product.wholesale_price)
    .bind(product.wholesale_moq)
    .bind(product.low_stock_threshold)
    .bind(product.discount_percent)
    .bind(product.created_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn update_product(&self, product: &Product) -> Result<bool> {
    let result = sqlx::query(
      "UPDATE products SET name = $2, description = $3, price = $4, image = $5, category = $6, \
       stock_quantity = $7, wholesale_price = $8, wholesale_moq = $9, low_stock_threshold = $10, \
       discount_percent = $11 WHERE id = $1",
    )
    .bind(product.id)
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price)
    .bind(&product.image)
    .bind(&product.category)
    .bind(product.stock_quantity)
    .bind(product.wholesale_price)
    .bind(product.wholesale_moq)
    .bind(product.low_stock_threshold)
    .bind(product.discount_percent)
    .execute(&self.pool)
    .await?;
    Ok(result.rows_affected() > 0)
  }

  async fn get_product(&self, id: Uuid) -> Result<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
    Ok(sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?)
  }

  async fn get_products(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = ANY($1)", PRODUCT_COLUMNS);
    Ok(sqlx::query_as(&sql).bind(ids.to_vec()).fetch_all(&self.pool).await?)
  }

  #[instrument(name = "db::list_products", skip(self), err(Display))]
  async fn list_products(&self, filter: &ProductFilter, page: PageRequest) -> Result<Page<Product>> {
    let search = filter.search.as_deref().map(contains_pattern);
    let count_sql = format!("SELECT COUNT(*) FROM products WHERE {}", PRODUCT_FILTER);
    let count: i64 = sqlx::query_scalar(&count_sql)
      .bind(&filter.category)
      .bind(&search)
      .fetch_one(&self.pool)
      .await?;

    let sql = format!(
      "SELECT {} FROM products WHERE {} ORDER BY created_at DESC, id LIMIT $3 OFFSET $4",
      PRODUCT_COLUMNS, PRODUCT_FILTER
    );
    let results = sqlx::query_as(&sql)
      .bind(&filter.category)
      .bind(&search)
      .bind(page.limit)
      .bind(page.offset)
      .fetch_all(&self.pool)
      .await?;
    Ok(Page { count, results })
  }

  async fn delete_product(&self, id: Uuid) -> Result<bool> {
    self.delete_by_id("products", id).await
  }

  async fn set_product_stock(&self, id: Uuid, stock_quantity: i32) -> Result<Option<Product>> {
    let sql = format!(
      "UPDATE products SET stock_quantity = $2 WHERE id = $1 RETURNING {}",
      PRODUCT_COLUMNS
    );
    Ok(
      sqlx::query_as(&sql)
        .bind(id)
        .bind(stock_quantity)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn find_first_product_matching(&self, terms: &[String]) -> Result<Option<Product>> {
    if terms.is_empty() {
      return Ok(None);
    }
    let patterns: Vec<String> = terms.iter().map(|t| contains_pattern(t)).collect();
    let sql = format!(
      "SELECT {} FROM products WHERE name ILIKE ANY($1) OR category ILIKE ANY($1) \
       ORDER BY created_at ASC, id LIMIT 1",
      PRODUCT_COLUMNS
    );
    Ok(sqlx::query_as(&sql).bind(patterns).fetch_optional(&self.pool).await?)
  }

  async fn count_products(&self) -> Result<i64> {
    self.count("products").await
  }

  async fn low_stock_products(&self) -> Result<Vec<LowStockProduct>> {
    Ok(
      sqlx::query_as(
        "SELECT id, name, stock_quantity FROM products WHERE stock_quantity < low_stock_threshold ORDER BY name",
      )
      .fetch_all(&self.pool)
      .await?,
    )
  }

  #[instrument(name = "db::insert_order", skip(self, order, items), fields(order_id = %order.id, items = items.len()), err(Display))]
  async fn insert_order(&self, order: &Order, items: &[OrderItem]) -> Result<()> {
    let mut tx = self.pool.begin().await?;
    sqlx::query(
      "INSERT INTO orders (id, user_id, total_amount, status, delivery_address, created_at) \
       VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(order.id)
    .bind(order.user_id)
    .bind(order.total_amount)
    .bind(order.status)
    .bind(&order.delivery_address)
    .bind(order.created_at)
    .execute(&mut *tx)
    .await?;

    for item in items {
      sqlx::query(
        "INSERT INTO order_items (id, order_id, product_id, quantity, price_at_purchase) VALUES ($1, $2, $3, $4, $5)",
      )
      .bind(item.id)
      .bind(item.order_id)
      .bind(item.product_id)
      .bind(item.quantity)
      .bind(item.price_at_purchase)
      .execute(&mut *tx)
      .await?;
    }
    tx.commit().await?;
    Ok(())
  }

  async fn get_order(&self, id: Uuid, filter: &OrderFilter) -> Result<Option<OrderDetail>> {
    let sql = format!(
      "SELECT o.id, o.user_id, o.total_amount, o.status, o.delivery_address, o.created_at, u.username AS user_name \
       FROM orders o JOIN users u ON u.id = o.user_id WHERE {} AND o.id = $3",
      ORDER_FILTER
    );
    let row: Option<OrderRow> = sqlx::query_as(&sql)
      .bind(filter.user_id)
      .bind(filter.status)
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    match row {
      Some(row) => Ok(self.attach_items(vec![row]).await?.pop()),
      None => Ok(None),
    }
  }

  #[instrument(name = "db::list_orders", skip(self), err(Display))]
  async fn list_orders(&self, filter: &OrderFilter, page: PageRequest) -> Result<Page<OrderDetail>> {
    let count_sql = format!("SELECT COUNT(*) FROM orders o WHERE {}", ORDER_FILTER);
    let count: i64 = sqlx::query_scalar(&count_sql)
      .bind(filter.user_id)
      .bind(filter.status)
      .fetch_one(&self.pool)
      .await?;

    let sql = format!(
      "SELECT o.id, o.user_id, o.total_amount, o.status, o.delivery_address, o.created_at, u.username AS user_name \
       FROM orders o JOIN users u ON u.id = o.user_id WHERE {} \
       ORDER BY o.created_at DESC, o.id LIMIT $3 OFFSET $4",
      ORDER_FILTER
    );
    let rows: Vec<OrderRow> = sqlx::query_as(&sql)
      .bind(filter.user_id)
      .bind(filter.status)
      .bind(page.limit)
      .bind(page.offset)
      .fetch_all(&self.pool)
      .await?;
    let results = self.attach_items(rows).await?;
    Ok(Page { count, results })
  }

  async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> Result<Option<Order>> {
    Ok(
      sqlx::query_as(
        "UPDATE orders SET status = $2 WHERE id = $1 \
         RETURNING id, user_id, total_amount, status, delivery_address, created_at",
      )
      .bind(id)
      .bind(status)
      .fetch_optional(&self.pool)
      .await?,
    )
  }

  async fn delete_order(&self, id: Uuid) -> Result<bool> {
    // order_items cascade
    self.delete_by_id("orders", id).await
  }

  async fn count_orders(&self) -> Result<i64> {
    self.count("orders").await
  }

  async fn total_revenue(&self) -> Result<Decimal> {
    Ok(
      sqlx::query_scalar("SELECT COALESCE(SUM(total_amount), 0) FROM orders")
        .fetch_one(&self.pool)
        .await?,
    )
  }

  async fn daily_revenue(&self) -> Result<Vec<DailyRevenue>> {
    Ok(
      sqlx::query_as(
        "SELECT (created_at AT TIME ZONE 'UTC')::date AS day, SUM(total_amount) AS revenue \
         FROM orders GROUP BY 1 ORDER BY 1",
      )
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn insert_banner(&self, banner: &Banner) -> Result<()> {
    sqlx::query("INSERT INTO banners (id, title, image, link_url, active, created_at) VALUES ($1, $2, $3, $4, $5, $6)")
      .bind(banner.id)
      .bind(&banner.title)
      .bind(&banner.image)
      .bind(&banner.link_url)
      .bind(banner.active)
      .bind(banner.created_at)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  async fn update_banner(&self, banner: &Banner) -> Result<bool> {
    let result = sqlx::query("UPDATE banners SET title = $2, image = $3, link_url = $4, active = $5 WHERE id = $1")
      .bind(banner.id)
      .bind(&banner.title)
      .bind(&banner.image)
      .bind(&banner.link_url)
      .bind(banner.active)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() > 0)
  }

  async fn get_banner(&self, id: Uuid, active_only: bool) -> Result<Option<Banner>> {
    let sql = format!(
      "SELECT {} FROM banners WHERE id = $1 AND (active OR NOT $2)",
      BANNER_COLUMNS
    );
    Ok(sqlx::query_as(&sql).bind(id).bind(active_only).fetch_optional(&self.pool).await?)
  }

  async fn list_banners(&self, active_only: bool, page: PageRequest) -> Result<Page<Banner>> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM banners WHERE active OR NOT $1")
      .bind(active_only)
      .fetch_one(&self.pool)
      .await?;
    let sql = format!(
      "SELECT {} FROM banners WHERE active OR NOT $1 ORDER BY created_at DESC, id LIMIT $2 OFFSET $3",
      BANNER_COLUMNS
    );
    let results = sqlx::query_as(&sql)
      .bind(active_only)
      .bind(page.limit)
      .bind(page.offset)
      .fetch_all(&self.pool)
      .await?;
    Ok(Page { count, results })
  }

  async fn delete_banner(&self, id: Uuid) -> Result<bool> {
    self.delete_by_id("banners", id).await
  }

  async fn insert_message(&self, message: &ContactMessage) -> Result<()> {
    sqlx::query(
      "INSERT INTO contact_messages (id, user_id, name, email, subject, message, is_read, created_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(message.id)
    .bind(message.user)
    .bind(&message.name)
    .bind(&message.email)
    .bind(&message.subject)
    .bind(&message.message)
    .bind(message.is_read)
    .bind(message.created_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn update_message(&self, message: &ContactMessage) -> Result<bool> {
    let result = sqlx::query(
      "UPDATE contact_messages SET name = $2, email = $3, subject = $4, message = $5, is_read = $6 WHERE id = $1",
    )
    .bind(message.id)
    .bind(&message.name)
    .bind(&message.email)
    .bind(&message.subject)
    .bind(&message.message)
    .bind(message.is_read)
    .execute(&self.pool)
    .await?;
    Ok(result.rows_affected() > 0)
  }

  async fn get_message(&self, id: Uuid) -> Result<Option<ContactMessage>> {
    let sql = format!("SELECT {} FROM contact_messages WHERE id = $1", MESSAGE_COLUMNS);
    Ok(sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?)
  }

  async fn list_messages(&self, filter: &MessageFilter, page: PageRequest) -> Result<Page<ContactMessage>> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contact_messages WHERE ($1::bool IS NULL OR is_read = $1)")
      .bind(filter.is_read)
      .fetch_one(&self.pool)
      .await?;
    let sql = format!(
      "SELECT {} FROM contact_messages WHERE ($1::bool IS NULL OR is_read = $1) \
       ORDER BY created_at DESC, id LIMIT $2 OFFSET $3",
      MESSAGE_COLUMNS
    );
    let results = sqlx::query_as(&sql)
      .bind(filter.is_read)
      .bind(page.limit)
      .bind(page.offset)
      .fetch_all(&self.pool)
      .await?;
    Ok(Page { count, results })
  }

  async fn delete_message(&self, id: Uuid) -> Result<bool> {
    self.delete_by_id("contact_messages", id).await
  }
}
