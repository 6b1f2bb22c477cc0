//! Privacy tests for credentials in logs.
//!
//! Session keys and raw `Authorization` header values must never appear in
//! log output, even at TRACE level, whether authentication succeeds or fails.
//!
//! # Test Approach
//!
//! 1. Use a custom tracing subscriber Layer to capture all log messages
//! 2. Drive the router and the authenticator with known secrets
//! 3. Verify that the secrets do NOT appear in captured logs

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header::AUTHORIZATION, Request, StatusCode};
use tower::ServiceExt;
use tracing::Subscriber;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use eventrelay_server::auth::{authenticate, BasicCredentials};
use eventrelay_server::models::{Event, Session};
use eventrelay_server::routes::{create_router, AppState};
use eventrelay_server::store::MemoryStore;

const SESSION_ID: &str = "session-42";
const SESSION_KEY: &str = "k3y-that-must-never-be-logged";
const WRONG_KEY: &str = "wr0ng-key-also-secret";

// ============================================================================
// Log Capture Infrastructure
// ============================================================================

/// A buffer for capturing log output during tests.
#[derive(Clone, Default)]
struct LogCapture {
    logs: Arc<Mutex<Vec<String>>>,
}

impl LogCapture {
    fn get_logs(&self) -> String {
        self.logs.lock().unwrap().join("\n")
    }
}

/// A tracing Layer that captures log events for inspection.
struct CaptureLayer {
    capture: LogCapture,
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = StringVisitor::default();
        event.record(&mut visitor);

        let message = format!(
            "[{}] {}: {}",
            event.metadata().level(),
            event.metadata().target(),
            visitor.parts.join(" ")
        );

        self.capture.logs.lock().unwrap().push(message);
    }

    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::span::Id,
        _ctx: Context<'_, S>,
    ) {
        let mut visitor = StringVisitor::default();
        attrs.record(&mut visitor);
        self.capture
            .logs
            .lock()
            .unwrap()
            .push(format!("[span] {}", visitor.parts.join(" ")));
    }
}

/// A visitor that collects all fields into strings.
#[derive(Default)]
struct StringVisitor {
    parts: Vec<String>,
}

impl tracing::field::Visit for StringVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.parts.push(format!("{}={:?}", field.name(), value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.parts.push(format!("{}={}", field.name(), value));
    }
}

/// Runs an async test body with TRACE-level log capture on this thread.
async fn with_log_capture_async<F, Fut>(test_fn: F) -> String
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let capture = LogCapture::default();
    let layer = CaptureLayer {
        capture: capture.clone(),
    };

    let subscriber = tracing_subscriber::registry()
        .with(layer.with_filter(tracing_subscriber::filter::LevelFilter::TRACE));

    let _guard = tracing::subscriber::set_default(subscriber);
    test_fn().await;

    capture.get_logs()
}

fn assert_sensitive_not_in_logs(logs: &str, value: &str, value_name: &str, context: &str) {
    assert!(
        !logs.contains(value),
        "{value_name} found in logs during {context}!\nValue: {value}\nLogs:\n{logs}"
    );
}

fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    Session::new(SESSION_ID, SESSION_KEY).save(&*store).unwrap();
    Event::new(SESSION_ID, "evt-1", "name", "data")
        .save(&*store)
        .unwrap();
    store
}

async fn send(store: &Arc<MemoryStore>, method: &str, uri: &str, key: &str) -> StatusCode {
    let app = create_router(AppState::with_store(store.clone()));
    app.oneshot(
        Request::builder()
            .method(method)
            .uri(uri)
            .header(
                AUTHORIZATION,
                BasicCredentials::new(SESSION_ID, key).to_header_value(),
            )
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
    .status()
}

// ============================================================================
// Test Cases
// ============================================================================

#[tokio::test]
async fn session_key_not_logged_on_successful_ack() {
    let store = seeded_store();
    let header = BasicCredentials::new(SESSION_ID, SESSION_KEY).to_header_value();

    let logs = with_log_capture_async(|| async {
        let status = send(&store, "POST", "/events/evt-1/seen", SESSION_KEY).await;
        assert_eq!(status, StatusCode::OK);
    })
    .await;

    assert!(!logs.is_empty(), "expected some log output");
    assert_sensitive_not_in_logs(&logs, SESSION_KEY, "Session key", "successful ack");
    assert_sensitive_not_in_logs(&logs, &header, "Authorization header", "successful ack");
}

#[tokio::test]
async fn session_key_not_logged_on_rejected_ack() {
    let store = seeded_store();

    let logs = with_log_capture_async(|| async {
        let status = send(&store, "POST", "/events/evt-1/seen", WRONG_KEY).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    })
    .await;

    assert_sensitive_not_in_logs(&logs, WRONG_KEY, "Presented key", "rejected ack");
    assert_sensitive_not_in_logs(&logs, SESSION_KEY, "Session key", "rejected ack");
}

#[tokio::test]
async fn session_key_not_logged_on_poll() {
    let store = seeded_store();

    let logs = with_log_capture_async(|| async {
        let status = send(&store, "GET", "/events?unseen=true", SESSION_KEY).await;
        assert_eq!(status, StatusCode::OK);
    })
    .await;

    assert_sensitive_not_in_logs(&logs, SESSION_KEY, "Session key", "event poll");
}

#[tokio::test]
async fn session_key_not_logged_by_authenticator() {
    let store = seeded_store();

    let logs = with_log_capture_async(|| async {
        let ok = authenticate(&*store, &BasicCredentials::new(SESSION_ID, SESSION_KEY));
        assert!(ok.is_ok());
        let err = authenticate(&*store, &BasicCredentials::new(SESSION_ID, WRONG_KEY));
        assert!(err.is_err());
        // Debug output of the error and credentials must stay redacted too.
        tracing::trace!(
            credentials = ?BasicCredentials::new(SESSION_ID, SESSION_KEY),
            session = ?Session::new(SESSION_ID, SESSION_KEY),
            "debug formatting check"
        );
    })
    .await;

    assert!(logs.contains(SESSION_ID));
    assert_sensitive_not_in_logs(&logs, SESSION_KEY, "Session key", "authentication");
    assert_sensitive_not_in_logs(&logs, WRONG_KEY, "Presented key", "authentication");
}
