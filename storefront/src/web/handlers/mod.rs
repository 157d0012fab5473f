// storefront/src/web/handlers/mod.rs

pub mod auth_handlers;
pub mod banner_handlers;
pub mod message_handlers;
pub mod misc_handlers;
pub mod order_handlers;
pub mod product_handlers;
pub mod user_handlers;
