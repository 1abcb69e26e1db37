//! Axum router construction.
//!
//! [`build`] assembles the complete application router:
//! - Middleware layers (CORS, per-request trace-ID injection)
//! - Optional Swagger UI / OpenAPI spec endpoint (disable with `CODESAGE_ENABLE_SWAGGER=false`)
//! - Health / heartbeat route
//! - The chat page and the `/codesage` API

mod codesage;
pub mod doc;
mod health;

use axum::{middleware, Router};
use std::sync::Arc;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::{cors, trace};
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .merge(health::router())
        .merge(codesage::router());

    if state.config.enable_swagger {
        app = app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", doc::get_docs()));
    }

    app
        // Outermost layers execute first on the way in.
        .layer(cors::cors_layer(&state.config))
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::state::test::test_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn trace_id_is_echoed() {
        let app = build(test_state("http://127.0.0.1:9"));
        let id = "6f9619ff-8b86-d011-b42d-00cf4fc964ff";
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(trace::X_TRACE_ID, id)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[trace::X_TRACE_ID], id);
    }

    #[tokio::test]
    async fn swagger_spec_lists_generate() {
        let app = build(test_state("http://127.0.0.1:9"));
        let resp = app
            .oneshot(Request::get("/api-docs/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let spec: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(spec["paths"]["/codesage/generate"]["post"].is_object());
    }
}
