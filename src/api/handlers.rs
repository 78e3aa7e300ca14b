//! HTTP request handlers

use super::assets::{get_index_html, serve_static};
use super::types::{
    ChatRequest, ChatResponse, ErrorResponse, EvaluateRequest, EvaluateResponse, SuccessResponse,
};
use super::AppState;
use crate::auth::{require_basic_auth, AuthenticatedUser};
use crate::context::{SelfAssessment, SessionId};
use crate::tutor::EquationPair;
use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

pub const SESSION_COOKIE: &str = "tutor_session";

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Root serves the single-page UI
        .route("/", get(serve_spa))
        // Static assets (embedded or filesystem fallback)
        .route("/assets/*path", get(serve_static))
        .route("/api/evaluate", post(evaluate))
        .route("/api/chat", post(chat))
        .route("/api/session/reset", post(reset_session))
        // Everything above requires credentials
        .route_layer(middleware::from_fn_with_state(
            state.credentials.clone(),
            require_basic_auth,
        ))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Sessions
// ============================================================

/// Session from the cookie, minting a new one when absent or invalid
fn session_from(jar: CookieJar) -> (CookieJar, SessionId) {
    if let Some(id) = jar
        .get(SESSION_COOKIE)
        .and_then(|c| SessionId::parse(c.value()))
    {
        return (jar, id);
    }

    let id = SessionId::generate();
    tracing::debug!(session = %id, "Issuing new session");
    let cookie = Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    (jar.add(cookie), id)
}

// ============================================================
// SPA Handler
// ============================================================

async fn serve_spa() -> impl IntoResponse {
    match get_index_html() {
        Some(content) => Html(content).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Html("<h1>404 - UI not found</h1>".to_string()),
        )
            .into_response(),
    }
}

// ============================================================
// Assessment
// ============================================================

fn required(value: Option<String>, name: &str) -> Result<String, AppError> {
    value.ok_or_else(|| AppError::MissingField(name.to_string()))
}

async fn evaluate(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    jar: CookieJar,
    Json(req): Json<EvaluateRequest>,
) -> Result<(CookieJar, Json<EvaluateResponse>), AppError> {
    let assessment = SelfAssessment {
        topic: required(req.topic, "topic")?,
        facts: required(req.facts, "facts")?,
        strategies: required(req.strategies, "strategies")?,
        procedures: required(req.procedures, "procedures")?,
        rationales: required(req.rationales, "rationales")?,
    };
    let pair = EquationPair::from_optional(req.candidate.as_deref(), req.reference.as_deref());

    let (jar, session) = session_from(jar);
    tracing::debug!(user = %user, session = %session, "Assessment submitted");
    let topic = assessment.topic.clone();
    let evaluation = state.tutor.evaluate(&session, assessment, pair.as_ref()).await;

    Ok((jar, Json(EvaluateResponse::new(topic, evaluation))))
}

// ============================================================
// Follow-up chat
// ============================================================

async fn chat(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<ChatRequest>,
) -> Result<(CookieJar, Json<ChatResponse>), AppError> {
    let message = req
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| AppError::MissingField("message".to_string()))?;

    let (jar, session) = session_from(jar);
    let reply = state.tutor.chat(&session, &message).await;
    tracing::debug!(session = %session, prompt_len = reply.prompt.len(), "Follow-up prompt sent");

    Ok((
        jar,
        Json(ChatResponse {
            response: reply.response_text(),
        }),
    ))
}

async fn reset_session(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<SuccessResponse>, AppError> {
    let Some(session) = jar
        .get(SESSION_COOKIE)
        .and_then(|c| SessionId::parse(c.value()))
    else {
        return Ok(Json(SuccessResponse { success: true }));
    };

    state
        .tutor
        .reset(&session)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    tracing::info!(session = %session, "Session context cleared");
    Ok(Json(SuccessResponse { success: true }))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    MissingField(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::MissingField(field) => (
                StatusCode::BAD_REQUEST,
                format!("Missing required field: {field}"),
            ),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::DynTutor;
    use crate::auth::StaticCredentials;
    use crate::context::{ContextStore, InMemoryContextStore};
    use crate::llm::LlmError;
    use crate::tutor::testing::MockLlmClient;
    use crate::tutor::{LlmClient, TutorSettings};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    const LONG: &str = "one two three four five six seven eight nine ten";

    struct Harness {
        router: Router,
        llm: Arc<MockLlmClient>,
        store: Arc<InMemoryContextStore>,
    }

    fn harness() -> Harness {
        let llm = Arc::new(MockLlmClient::new("mock"));
        let store = Arc::new(InMemoryContextStore::new());
        let store_dyn: Arc<dyn ContextStore> = store.clone();
        let llm_dyn: Arc<dyn LlmClient> = llm.clone();
        let tutor: DynTutor = crate::tutor::Tutor::new(store_dyn, llm_dyn, TutorSettings::default());
        let credentials = Arc::new(StaticCredentials::parse("student:pw").unwrap());
        let router = create_router(AppState::new(tutor, credentials));
        Harness { router, llm, store }
    }

    fn auth_header() -> String {
        format!("Basic {}", STANDARD.encode("student:pw"))
    }

    fn post_json(uri: &str, body: &Value, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::AUTHORIZATION, auth_header())
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(resp: Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn session_cookie(resp: &Response) -> String {
        let set_cookie = resp
            .headers()
            .get(header::SET_COOKIE)
            .expect("session cookie issued")
            .to_str()
            .unwrap();
        assert!(set_cookie.contains("HttpOnly"));
        set_cookie.split(';').next().unwrap().to_string()
    }

    fn assessment_body() -> Value {
        json!({
            "topic": "Polynomials",
            "facts": LONG,
            "strategies": LONG,
            "procedures": "expand",
            "rationales": LONG,
            "candidate": "(x+1)^2",
            "reference": "x^2 + 2*x + 1"
        })
    }

    #[tokio::test]
    async fn test_auth_required() {
        let h = harness();
        let resp = h
            .router
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let bad = format!("Basic {}", STANDARD.encode("student:nope"));
        let resp = h
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/chat")
                    .header(header::AUTHORIZATION, bad)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"message":"hi"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(h.llm.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_version_is_public() {
        let resp = harness()
            .router
            .oneshot(Request::builder().uri("/version").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains(env!("CARGO_PKG_VERSION")));
    }

    #[tokio::test]
    async fn test_index_served_with_auth() {
        let resp = harness()
            .router
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(header::AUTHORIZATION, auth_header())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_evaluate_then_chat_share_session() {
        let h = harness();
        h.llm.queue_text("**Identified Gaps**");
        h.llm.queue_text("Expand the square first.");

        let resp = h
            .router
            .clone()
            .oneshot(post_json("/api/evaluate", &assessment_body(), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie = session_cookie(&resp);
        let body = json_body(resp).await;

        assert_eq!(body["topic"], "Polynomials");
        assert_eq!(body["gaps"].as_array().unwrap().len(), 1);
        assert_eq!(body["gaps"][0]["dimension"], "procedures");
        assert_eq!(body["equivalence"]["status"], "equivalent");
        assert_eq!(
            body["equivalence"]["message"],
            "Correct! The expressions are equivalent."
        );
        assert_eq!(body["feedback"], "**Identified Gaps**");
        assert!(body.get("error").is_none());

        let resp = h
            .router
            .clone()
            .oneshot(post_json(
                "/api/chat",
                &json!({"message": "How do I expand?"}),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().get(header::SET_COOKIE).is_none());
        let body = json_body(resp).await;
        assert_eq!(body["response"], "Expand the square first.");

        let prompts = h.llm.recorded_requests();
        assert!(prompts[1].messages[0].content.contains("\"Polynomials\""));
        assert!(prompts[1].messages[0].content.contains("How do I expand?"));
    }

    #[tokio::test]
    async fn test_evaluate_without_pair_omits_equivalence() {
        let h = harness();
        h.llm.queue_text("ok");
        let mut body = assessment_body();
        body["candidate"] = json!("   ");

        let resp = h
            .router
            .oneshot(post_json("/api/evaluate", &body, None))
            .await
            .unwrap();
        let body = json_body(resp).await;
        assert!(body.get("equivalence").is_none());
    }

    #[tokio::test]
    async fn test_llm_failure_rendered_inline() {
        let h = harness();
        h.llm.queue_error(LlmError::server_error("Server error: overloaded"));

        let resp = h
            .router
            .clone()
            .oneshot(post_json("/api/evaluate", &assessment_body(), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert!(body.get("feedback").is_none());
        assert_eq!(
            body["error"],
            "Error fetching response from OpenAI: Server error: overloaded"
        );
        assert_eq!(h.store.len(), 1);

        // Nothing queued: the mock reports a network error.
        let resp = h
            .router
            .oneshot(post_json("/api/chat", &json!({"message": "hi"}), None))
            .await
            .unwrap();
        let body = json_body(resp).await;
        assert_eq!(
            body["response"],
            "Error fetching response: No mock response queued"
        );
    }

    #[tokio::test]
    async fn test_missing_field_is_bad_request() {
        let h = harness();
        let mut body = assessment_body();
        body.as_object_mut().unwrap().remove("strategies");

        let resp = h
            .router
            .clone()
            .oneshot(post_json("/api/evaluate", &body, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert_eq!(body["error"], "Missing required field: strategies");
        assert_eq!(h.store.len(), 0);

        let resp = h
            .router
            .oneshot(post_json("/api/chat", &json!({}), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(h.llm.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_reset_clears_context() {
        let h = harness();
        h.llm.queue_text("ok");
        let resp = h
            .router
            .clone()
            .oneshot(post_json("/api/evaluate", &assessment_body(), None))
            .await
            .unwrap();
        let cookie = session_cookie(&resp);
        assert_eq!(h.store.len(), 1);

        let resp = h
            .router
            .oneshot(post_json("/api/session/reset", &json!({}), Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(h.store.len(), 0);
    }
}
