// storefront/src/web/cors.rs

use actix_cors::Cors;
use actix_web::http::{header, Method};

/// Allow-list CORS with credentials. Origins are compared after stripping a
/// trailing slash, matching how they are read from configuration.
pub fn middleware(allowed_origins: &[String]) -> Cors {
  let origins = allowed_origins.to_vec();
  Cors::default()
    .allowed_origin_fn(move |origin, _| {
      origin
        .to_str()
        .map(|o| origins.iter().any(|allowed| allowed == o.trim_end_matches('/')))
        .unwrap_or(false)
    })
    .allowed_methods(vec![
      Method::GET,
      Method::POST,
      Method::PUT,
      Method::PATCH,
      Method::DELETE,
      Method::OPTIONS,
    ])
    .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
    .supports_credentials()
    .max_age(3600)
}
