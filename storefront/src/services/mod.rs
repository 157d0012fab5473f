// storefront/src/services/mod.rs

pub mod auth_service;
pub mod chat_service;
pub mod media_service;
pub mod order_service;
pub mod token_service;
pub mod validation;
