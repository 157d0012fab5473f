// storefront/src/models/mod.rs

//! Contains data structures representing database entities.

pub mod banner;
pub mod contact_message;
pub mod order;
pub mod order_item;
pub mod product;
pub mod user;

// Re-export the model structs for convenient access
pub use banner::{Banner, BannerChanges};
pub use contact_message::{ContactMessage, ContactMessageChanges};
pub use order::{DailyRevenue, Order, OrderDetail, OrderStatus};
pub use order_item::{OrderItem, OrderItemDetail};
pub use product::{LowStockProduct, Product, ProductChanges};
pub use user::{User, UserSummary};
