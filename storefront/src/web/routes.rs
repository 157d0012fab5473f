// storefront/src/web/routes.rs

use actix_web::{web, HttpResponse};

use crate::errors::AppError;
use crate::web::handlers::{
  auth_handlers, banner_handlers, message_handlers, misc_handlers, order_handlers, product_handlers, user_handlers,
};

const JSON_BODY_LIMIT: usize = 1024 * 1024;

/// Body and query-string decoding failures become the usual `{"error": ...}`
/// 400; a malformed id in the path is a plain 404.
fn extractor_configs(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(
      web::JsonConfig::default()
        .limit(JSON_BODY_LIMIT)
        .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .app_data(web::QueryConfig::default().error_handler(|err, _req| AppError::Validation(err.to_string()).into()))
    .app_data(web::PathConfig::default().error_handler(|_err, _req| AppError::NotFound("Not found.".to_string()).into()));
}

// This function is called by the server and by the HTTP tests to mount every route.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  extractor_configs(cfg);

  cfg.service(
    web::scope("/api")
      .route("/ping/", web::get().to(misc_handlers::ping_handler))
      .route("/ai-chat/", web::post().to(misc_handlers::chat_handler))
      // Authentication Routes
      .service(
        web::scope("/auth")
          .route("/register/", web::post().to(auth_handlers::register_handler))
          .route("/login/", web::post().to(auth_handlers::login_handler))
          .route("/refresh/", web::post().to(auth_handlers::refresh_handler))
          .route("/profile/", web::get().to(auth_handlers::profile_handler)),
      )
      // Product Routes
      .service(
        web::scope("/products")
          .service(
            web::resource("/")
              .route(web::get().to(product_handlers::list_products_handler))
              .route(web::post().to(product_handlers::create_product_handler)),
          )
          .route("/{id}/stock/", web::patch().to(product_handlers::update_stock_handler))
          .route("/{id}/image/", web::post().to(product_handlers::upload_product_image_handler))
          .service(
            web::resource("/{id}/")
              .route(web::get().to(product_handlers::get_product_handler))
              .route(web::put().to(product_handlers::replace_product_handler))
              .route(web::patch().to(product_handlers::patch_product_handler))
              .route(web::delete().to(product_handlers::delete_product_handler)),
          ),
      )
      // Order Routes. Fixed paths are registered before `/{id}/`.
      .service(
        web::scope("/orders")
          .service(
            web::resource("/")
              .route(web::get().to(order_handlers::list_orders_handler))
              .route(web::post().to(order_handlers::create_order_handler)),
          )
          .route("/my-orders/", web::get().to(order_handlers::my_orders_handler))
          .route("/stats/", web::get().to(order_handlers::stats_handler))
          .route("/analytics/", web::get().to(order_handlers::analytics_handler))
          .route("/{id}/status/", web::put().to(order_handlers::update_status_handler))
          .service(
            web::resource("/{id}/")
              .route(web::get().to(order_handlers::get_order_handler))
              .route(web::delete().to(order_handlers::delete_order_handler)),
          ),
      )
      // Banner Routes
      .service(
        web::scope("/banners")
          .service(
            web::resource("/")
              .route(web::get().to(banner_handlers::list_banners_handler))
              .route(web::post().to(banner_handlers::create_banner_handler)),
          )
          .route("/{id}/image/", web::post().to(banner_handlers::upload_banner_image_handler))
          .service(
            web::resource("/{id}/")
              .route(web::get().to(banner_handlers::get_banner_handler))
              .route(web::put().to(banner_handlers::replace_banner_handler))
              .route(web::patch().to(banner_handlers::patch_banner_handler))
              .route(web::delete().to(banner_handlers::delete_banner_handler)),
          ),
      )
      // Contact Message Routes
      .service(
        web::scope("/messages")
          .service(
            web::resource("/")
              .route(web::get().to(message_handlers::list_messages_handler))
              .route(web::post().to(message_handlers::create_message_handler)),
          )
          .service(
            web::resource("/{id}/")
              .route(web::get().to(message_handlers::get_message_handler))
              .route(web::put().to(message_handlers::replace_message_handler))
              .route(web::patch().to(message_handlers::patch_message_handler))
              .route(web::delete().to(message_handlers::delete_message_handler)),
          ),
      )
      // User Administration Routes
      .service(
        web::scope("/users")
          .route("/", web::get().to(user_handlers::list_users_handler))
          .route("/{id}/", web::delete().to(user_handlers::delete_user_handler)),
      ),
  );
}

/// Fallback for unknown paths, so every miss is JSON.
pub async fn not_found_handler() -> HttpResponse {
  HttpResponse::NotFound().json(serde_json::json!({ "error": "Not found." }))
}
