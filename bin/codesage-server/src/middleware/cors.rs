use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;

/// CORS layer from `CODESAGE_CORS_ORIGINS`.
///
/// Unset, or a list with no parseable origin, allows any origin.
pub fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<axum::http::HeaderValue> = config
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new().allow_headers(Any).allow_methods(Any);
    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}
