//! Chat page and the `/codesage` API.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use codesage_core::input::{MAX_PROMPT_CHARS, SOFT_LIMIT_CHARS};
use tracing::info;
use utoipa::OpenApi;
use validator::Validate;

use crate::error::ServerError;
use crate::schemas::codesage::{
    ErrorResponse, GenerateRequest, GenerateResponse, HistoryResponse, SessionSummary,
};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(generate, history),
    components(schemas(
        GenerateRequest,
        GenerateResponse,
        ErrorResponse,
        HistoryResponse,
        SessionSummary
    ))
)]
pub struct CodeSageApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index))
        .route("/codesage/generate", post(generate))
        .route("/codesage/history", get(history))
}

/// The chat page, opened with the welcome message.
pub async fn index(State(state): State<Arc<AppState>>) -> Result<Html<String>, ServerError> {
    let page = state
        .pages
        .render_chat(state.service.welcome_message(), MAX_PROMPT_CHARS, SOFT_LIMIT_CHARS)?;
    Ok(Html(page))
}

/// Generate a debugging answer for a prompt (`POST /codesage/generate`).
///
/// A successful upstream call without usable text still answers 200, with
/// the fallback apology as the response.
#[utoipa::path(
    post,
    path = "/codesage/generate",
    tag = "codesage",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Response generated", body = GenerateResponse),
        (status = 422, description = "Prompt missing, blank or too long", body = ErrorResponse),
        (status = 500, description = "Upstream call failed", body = ErrorResponse),
    )
)]
pub async fn generate(
    State(state): State<Arc<AppState>>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ServerError> {
    let Json(req) = body?;
    req.validate()?;

    let response = state.service.generate_response(&req.prompt).await?;
    info!(response_chars = response.chars().count(), "generate succeeded");
    Ok(Json(GenerateResponse::success(response)))
}

/// Past chat sessions (`GET /codesage/history`). Nothing is persisted, so
/// the list is always empty.
#[utoipa::path(
    get,
    path = "/codesage/history",
    tag = "codesage",
    responses(
        (status = 200, description = "Stored sessions", body = HistoryResponse),
    )
)]
pub async fn history() -> Json<HistoryResponse> {
    Json(HistoryResponse::default())
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::GENERATION_FAILED;
    use crate::routes::build;
    use crate::state::test::test_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use codesage_core::{
        Backend, HttpBackend, Phase, SessionLoop, TurnStatus, FALLBACK_RESPONSE, WELCOME_MESSAGE,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;
    use tracing_test::traced_test;

    /// Serve `app` on an ephemeral local port and return its base URL.
    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// A stand-in Gemini API answering every request with `status` and `body`.
    async fn fake_gemini(status: StatusCode, body: Value) -> String {
        let app = Router::new().fallback(move || {
            let body = body.clone();
            async move { (status, Json(body)) }
        });
        serve(app).await
    }

    fn candidate(text: &str) -> Value {
        json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })
    }

    async fn post_prompt(app: Router, prompt: Value) -> (StatusCode, Value) {
        let resp = app
            .oneshot(
                Request::post("/codesage/generate")
                    .header("content-type", "application/json")
                    .body(Body::from(prompt.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn generate_returns_upstream_text() {
        let gemini = fake_gemini(StatusCode::OK, candidate("Fix: X")).await;
        let (status, body) = post_prompt(build(test_state(&gemini)), json!({ "prompt": "boom" })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "response": "Fix: X", "status": "success" }));
    }

    #[tokio::test]
    async fn generate_without_text_returns_fallback() {
        let gemini = fake_gemini(StatusCode::OK, json!({ "candidates": [] })).await;
        let (status, body) = post_prompt(build(test_state(&gemini)), json!({ "prompt": "boom" })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], FALLBACK_RESPONSE);
    }

    #[tokio::test]
    #[traced_test]
    async fn upstream_error_status_is_500() {
        let gemini = fake_gemini(StatusCode::FORBIDDEN, json!({ "error": { "message": "API key not valid" } })).await;
        let (status, body) = post_prompt(build(test_state(&gemini)), json!({ "prompt": "boom" })).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], GENERATION_FAILED);
        assert!(body["details"].as_str().unwrap().contains("API request failed with status: 403"));
        assert!(logs_contain("error in generate"));
    }

    #[tokio::test]
    async fn unreachable_upstream_is_500() {
        let (status, body) =
            post_prompt(build(test_state("http://127.0.0.1:9")), json!({ "prompt": "boom" })).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], GENERATION_FAILED);
    }

    #[tokio::test]
    async fn oversize_prompt_is_422() {
        let (status, body) = post_prompt(
            build(test_state("http://127.0.0.1:9")),
            json!({ "prompt": "x".repeat(8001) }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "The given data was invalid.");
    }

    #[tokio::test]
    async fn missing_or_blank_prompt_is_422() {
        let app = build(test_state("http://127.0.0.1:9"));
        let (status, _) = post_prompt(app.clone(), json!({})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = post_prompt(app, json!({ "prompt": "   " })).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn history_is_empty() {
        let resp = build(test_state("http://127.0.0.1:9"))
            .oneshot(Request::get("/codesage/history").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "sessions": [] }));
    }

    #[tokio::test]
    async fn index_shows_welcome_message() {
        let resp = build(test_state("http://127.0.0.1:9"))
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains(WELCOME_MESSAGE));
    }

    #[tokio::test]
    async fn http_backend_drives_session_end_to_end() {
        let gemini = fake_gemini(StatusCode::OK, candidate("Use ```rust\nlet x = 1;\n``` here")).await;
        let server = serve(build(test_state(&gemini))).await;

        let backend = Arc::new(HttpBackend::new(&server, Duration::from_secs(5)).unwrap());
        let mut chat = SessionLoop::new(backend, codesage_core::HtmlTranscript::new(), Duration::from_secs(5));
        chat.submit("TypeError: x is undefined").unwrap();
        chat.run_until_idle().await;

        let s = chat.session();
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.transcript()[1].status, TurnStatus::Complete);
        assert!(s.sink().fragments()[1].contains("<code class=\"language-rust\">let x = 1;</code>"));
    }

    #[tokio::test]
    async fn http_backend_reports_validation_details() {
        let server = serve(build(test_state("http://127.0.0.1:9"))).await;
        let backend = HttpBackend::new(&server, Duration::from_secs(5)).unwrap();

        let err = backend.generate("   ").await.unwrap_err();
        assert!(matches!(err, codesage_core::PipelineError::InvalidInput(_)));
    }
}
