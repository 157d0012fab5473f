// storefront/src/main.rs

use actix_files::Files;
use actix_web::{web as actix_data, App, HttpServer};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan; // For span events in tracing

use storefront::config::AppConfig;
use storefront::state::AppState;
use storefront::web::{configure_app_routes, cors, not_found_handler};

fn io_error(e: impl std::fmt::Display) -> std::io::Error {
  std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  // Initialize tracing subscriber for logging (RUST_LOG overrides the default level)
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE) // Log when spans close, showing duration
    .init();

  tracing::info!("Starting storefront server...");

  let app_config = AppConfig::from_env().map_err(|e| {
    tracing::error!(error = %e, "Failed to load application configuration.");
    io_error(e)
  })?;

  let store = storefront::build_store(&app_config).await.map_err(|e| {
    tracing::error!(error = %e, "Failed to initialise storage.");
    io_error(e)
  })?;

  storefront::bootstrap(store.as_ref(), &app_config).await.map_err(|e| {
    tracing::error!(error = %e, "Failed to bootstrap the staff account.");
    io_error(e)
  })?;

  tokio::fs::create_dir_all(&app_config.media_root).await?;

  let app_state = AppState::new(Arc::clone(&store), app_config);
  let config = Arc::clone(&app_state.config);

  let server_address = format!("{}:{}", config.server_host, config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone())) // Share AppState with handlers
      .wrap(cors::middleware(&config.cors_allowed_origins))
      .wrap(tracing_actix_web::TracingLogger::default()) // Actix middleware for tracing requests
      .configure(configure_app_routes)
      .service(Files::new(&config.media_url, &config.media_root))
      .default_service(actix_data::to(not_found_handler))
  })
  .bind(&server_address)?
  .run()
  .await
}
