use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        Html, IntoResponse, Redirect, Response,
        sse::{Event, Sse},
    },
    routing::{get, post},
};
use futures::{Stream, StreamExt};
use serde::Deserialize;

use super::dialer::Dialer;
use super::models::{AddOutcome, BatchId, Flash, FlashKind};
use super::page;
use super::relay::StatusRelay;
use super::store::StoreHandle;
use crate::errors::StoreError;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub store: StoreHandle,
    pub dialer: Dialer,
    pub relay: Arc<StatusRelay>,
    /// Notices queued for the next index render. Single operator, so one queue.
    pub flashes: Mutex<Vec<Flash>>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(dialer: Dialer, relay: Arc<StatusRelay>) -> Self {
        Self {
            store: dialer.store().clone(),
            dialer,
            relay,
            flashes: Mutex::new(Vec::new()),
        }
    }

    fn flash(&self, kind: FlashKind, message: impl Into<String>) {
        self.flashes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Flash::new(kind, message));
    }

    fn take_flashes(&self) -> Vec<Flash> {
        std::mem::take(&mut *self.flashes.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct AddNumberForm {
    #[serde(default)]
    pub number: String,
}

#[derive(Deserialize)]
pub struct BatchQuery {
    pub batch: Option<String>,
}

impl BatchQuery {
    fn parse(&self) -> Result<Option<BatchId>, String> {
        match self.batch.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse::<BatchId>().map(Some),
        }
    }
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmptyNumber | StoreError::InvalidNumber(_) => {
                ApiError::BadRequest(err.to_string())
            }
            other => {
                tracing::error!(error = %other, "number store failure");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/", get(index))
        .route("/add_number", post(add_number))
        .route("/remove_number/{number}", get(remove_number))
        .route("/call_all", post(call_all))
        .route("/get_status", get(get_status))
        .route("/api/numbers", get(list_numbers))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn index(
    State(state): State<SharedState>,
    Query(query): Query<BatchQuery>,
) -> Result<Html<String>, ApiError> {
    let numbers = state.store.list().await?;
    let flashes = state.take_flashes();
    // A stale or mangled batch id just means no auto-attached feed.
    let batch = query.parse().ok().flatten();
    Ok(Html(page::render_index(&numbers, &flashes, batch)))
}

async fn list_numbers(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let numbers = state.store.list().await?;
    Ok(Json(numbers))
}

async fn add_number(
    State(state): State<SharedState>,
    Form(form): Form<AddNumberForm>,
) -> Result<Redirect, ApiError> {
    match state.store.add(&form.number).await {
        Ok((number, AddOutcome::Added)) => {
            state.flash(
                FlashKind::Success,
                format!("Number {} added successfully!", number),
            );
        }
        Ok((number, AddOutcome::AlreadyPresent)) => {
            state.flash(FlashKind::Warning, format!("Number {} already exists!", number));
        }
        Err(StoreError::EmptyNumber) => {
            state.flash(FlashKind::Error, "Phone number is required!");
        }
        Err(StoreError::InvalidNumber(raw)) => {
            tracing::info!(input = %raw, "rejected malformed number");
            state.flash(
                FlashKind::Error,
                "Please enter a valid phone number starting with + and at least 10 digits!",
            );
        }
        Err(other) => return Err(other.into()),
    }
    Ok(Redirect::to("/"))
}

async fn remove_number(
    State(state): State<SharedState>,
    Path(number): Path<String>,
) -> Result<Redirect, ApiError> {
    if state.store.remove(&number).await? {
        state.flash(
            FlashKind::Success,
            format!("Number {} removed successfully!", number),
        );
    }
    Ok(Redirect::to("/"))
}

async fn call_all(State(state): State<SharedState>) -> Result<Redirect, ApiError> {
    let batch = state.dialer.start_batch(&state.relay).await?;
    state.flash(
        FlashKind::Info,
        "Calling process started! Check status below.",
    );
    Ok(Redirect::to(&format!("/?batch={}", batch)))
}

async fn get_status(
    State(state): State<SharedState>,
    Query(query): Query<BatchQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let batch = query.parse().map_err(ApiError::BadRequest)?;
    let stream = state
        .relay
        .stream(batch)
        .map(|msg| Ok(Event::default().data(msg.to_string())));
    Ok(Sse::new(stream))
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::dialer::tests::{ScriptedProvider, settings};
    use axum::body::Body;
    use axum::http::{Request, header};
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct TestApp {
        _dir: TempDir,
        path: std::path::PathBuf,
        router: Router,
    }

    fn test_app_with(initial: &str, provider: ScriptedProvider) -> TestApp {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("numbers.txt");
        std::fs::write(&path, initial).unwrap();
        let dialer = Dialer::new(StoreHandle::open(&path), Arc::new(provider), settings());
        let state = Arc::new(AppState::new(dialer, Arc::new(StatusRelay::new())));
        TestApp {
            _dir: dir,
            path,
            router: api_router().with_state(state),
        }
    }

    fn test_app(initial: &str) -> TestApp {
        test_app_with(initial, ScriptedProvider::default())
    }

    impl TestApp {
        async fn send(&self, request: Request<Body>) -> Response {
            self.router.clone().oneshot(request).await.unwrap()
        }

        async fn get(&self, uri: &str) -> Response {
            self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
        }

        async fn post_form(&self, uri: &str, body: &str) -> Response {
            self.send(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
        }

        fn file(&self) -> String {
            std::fs::read_to_string(&self.path).unwrap()
        }
    }

    async fn body_text(resp: Response) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn location(resp: &Response) -> String {
        resp.headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = test_app("");
        let resp = app.get("/health").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, "ok");
    }

    #[tokio::test]
    async fn test_index_lists_numbers() {
        let app = test_app("+15550000001\nnot-a-number\n+15550000002\n");
        let resp = app.get("/").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp).await;
        assert!(html.contains("+15550000001"));
        assert!(html.contains("+15550000002"));
        assert!(!html.contains("not-a-number"));
    }

    #[tokio::test]
    async fn test_add_number_persists_and_flashes_once() {
        let app = test_app("");
        let resp = app.post_form("/add_number", "number=%2B15551234567").await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/");
        assert_eq!(app.file(), "+15551234567\n");

        let html = body_text(app.get("/").await).await;
        assert!(html.contains("Number +15551234567 added successfully!"));
        let html = body_text(app.get("/").await).await;
        assert!(!html.contains("added successfully"));
    }

    #[tokio::test]
    async fn test_add_number_rejects_malformed() {
        let app = test_app("");
        for body in ["number=15551234567", "number=%2B1555", "number=", ""] {
            let resp = app.post_form("/add_number", body).await;
            assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        }
        assert_eq!(app.file(), "");

        let html = body_text(app.get("/").await).await;
        assert!(html.contains("Please enter a valid phone number"));
        assert!(html.contains("Phone number is required!"));
        assert!(html.contains("flash-error"));
    }

    #[tokio::test]
    async fn test_add_duplicate_warns_and_keeps_file() {
        let app = test_app("+15551234567\n+15559876543\n");
        let resp = app.post_form("/add_number", "number=%2B15551234567").await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(app.file(), "+15551234567\n+15559876543\n");

        let html = body_text(app.get("/").await).await;
        assert!(html.contains("Number +15551234567 already exists!"));
        assert!(html.contains("flash-warning"));
    }

    #[tokio::test]
    async fn test_remove_number_keeps_order() {
        let app = test_app("+15550000001\n+15550000002\n+15550000003\n");
        let resp = app.get("/remove_number/+15550000002").await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(app.file(), "+15550000001\n+15550000003\n");

        let html = body_text(app.get("/").await).await;
        assert!(html.contains("Number +15550000002 removed successfully!"));
    }

    #[tokio::test]
    async fn test_remove_absent_number_is_silent() {
        let app = test_app("+15550000001\n");
        let resp = app.get("/remove_number/+15559999999").await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(app.file(), "+15550000001\n");

        let html = body_text(app.get("/").await).await;
        assert!(!html.contains("class=\"flash"));
    }

    #[tokio::test]
    async fn test_list_numbers_json() {
        let app = test_app("+15550000001\n+15550000002\n");
        let resp = app.get("/api/numbers").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let numbers: Vec<String> = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(numbers, vec!["+15550000001", "+15550000002"]);
    }

    #[tokio::test]
    async fn test_call_all_streams_batch_status() {
        let app = test_app_with(
            "+15550000001\n+15550000002\n",
            ScriptedProvider::failing_on(&["+15550000002"]),
        );
        let resp = app.post_form("/call_all", "").await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        let loc = location(&resp);
        let batch = loc.strip_prefix("/?batch=").unwrap().to_string();

        let resp = app.get(&format!("/get_status?batch={}", batch)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/event-stream"
        );
        let body = body_text(resp).await;
        assert!(body.contains("data: 📞 Calling +15550000001..."));
        assert!(body.contains("data: ✅ Call started (SID: CA0000)"));
        assert!(body.contains("data: 🗑️ +15550000001 removed from the call list"));
        assert!(body.contains("data: ❌ Failed to call +15550000002"));

        assert_eq!(app.file(), "+15550000002\n");

        let html = body_text(app.get(&loc).await).await;
        assert!(html.contains("Calling process started!"));
        assert!(html.contains(&format!(r#"data-batch="{}""#, batch)));
    }

    #[tokio::test]
    async fn test_get_status_without_batches_is_empty_stream() {
        let app = test_app("");
        let resp = app.get("/get_status").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_get_status_rejects_malformed_batch() {
        let app = test_app("");
        let resp = app.get("/get_status?batch=nope").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_second_call_all_while_running_is_accepted() {
        let provider = ScriptedProvider::with_latency(std::time::Duration::from_millis(20));
        let app = test_app_with("+15550000001\n+15550000002\n", provider);
        let first = app.post_form("/call_all", "").await;
        let second = app.post_form("/call_all", "").await;
        assert_eq!(first.status(), StatusCode::SEE_OTHER);
        assert_eq!(second.status(), StatusCode::SEE_OTHER);
        assert_ne!(location(&first), location(&second));

        for resp in [first, second] {
            let uri = location(&resp).replacen("/?", "/get_status?", 1);
            let _ = body_text(app.get(&uri).await).await;
        }
        assert_eq!(app.file(), "");
    }
}
