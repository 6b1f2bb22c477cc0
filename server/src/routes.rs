//! HTTP route handlers for the EventRelay server.
//!
//! This module provides the HTTP API endpoints:
//!
//! - `POST /events/{event_id}/seen` - Acknowledge delivery of an event
//! - `GET /events` - Poll the authenticated session's events
//! - `GET /health` - Health check endpoint
//!
//! # Architecture
//!
//! All routes share application state through [`AppState`], which contains:
//! - The injected [`Store`] holding sessions and events
//! - Server start time for uptime reporting
//!
//! Event routes authenticate with HTTP basic auth (username = session id,
//! password = session key). Failures use the body described in
//! [`crate::error`].
//!
//! # Example
//!
//! ```rust,no_run
//! use eventrelay_server::routes::{create_router, AppState};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = create_router(AppState::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::auth::authenticate_headers;
use crate::error;
use crate::models::{Event, SeenOutcome};
use crate::store::{MemoryStore, Store};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all route handlers.
///
/// Cloned for each request; the store itself is shared through an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Backend holding sessions and events.
    pub store: Arc<dyn Store>,

    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Creates application state backed by an empty [`MemoryStore`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// Creates application state backed by the given store.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use eventrelay_server::routes::AppState;
    /// use eventrelay_server::store::MemoryStore;
    ///
    /// let store = Arc::new(MemoryStore::new());
    /// let state = AppState::with_store(store.clone());
    /// ```
    #[must_use]
    pub fn with_store(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            start_time: Instant::now(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("store", &"<Store>")
            .field("start_time", &self.start_time)
            .finish()
    }
}

// ============================================================================
// Router
// ============================================================================

/// Creates the application router with all routes configured.
///
/// # Returns
///
/// An axum `Router` with the following routes:
/// - `POST /events/{event_id}/seen` - Mark an event as seen
/// - `GET /events` - List the session's events
/// - `GET /health` - Health check endpoint
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/events", get(get_events))
        .route("/events/{event_id}/seen", post(post_event_seen))
        .route("/health", get(get_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// POST /events/{event_id}/seen - Acknowledge an event
// ============================================================================

/// Response body for a successful seen acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct MarkEventSeenResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MarkEventSeenResponse {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }
}

/// POST /events/{event_id}/seen - Mark an event as seen.
///
/// # Authentication
///
/// Basic auth: username is the session id, password the session key.
///
/// # Responses
///
/// - `200 OK` - Authenticated. Returned whether the event was just marked,
///   was already seen, or does not exist for this session.
/// - `401 Unauthorized` - Unknown session, wrong key or malformed header
/// - `500 Internal Server Error` - Store failure
async fn post_event_seen(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    headers: HeaderMap,
) -> error::Result<Json<MarkEventSeenResponse>> {
    let session_id = authenticate_headers(state.store.as_ref(), &headers)?;

    let outcome = Event::mark_seen(state.store.as_ref(), &session_id, &event_id)?;
    match outcome {
        SeenOutcome::MarkedSeen => info!(
            session_id = %session_id,
            event_id = %event_id,
            outcome = outcome.as_str(),
            "Event acknowledged"
        ),
        SeenOutcome::AlreadySeen | SeenOutcome::Absent => debug!(
            session_id = %session_id,
            event_id = %event_id,
            outcome = outcome.as_str(),
            "Event acknowledgement was a no-op"
        ),
    }

    Ok(Json(MarkEventSeenResponse::ok()))
}

// ============================================================================
// GET /events - Poll events
// ============================================================================

/// Query parameters for event polling.
#[derive(Debug, Default, Deserialize)]
pub struct EventsQueryParams {
    /// When `"true"` (case-insensitive), only unseen events are returned.
    pub unseen: Option<String>,
}

impl EventsQueryParams {
    fn unseen_only(&self) -> bool {
        self.unseen
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }
}

/// Response body for event polling.
#[derive(Debug, Serialize, Deserialize)]
pub struct EventsResponse {
    pub events: Vec<Event>,
}

/// GET /events - List the authenticated session's events.
///
/// # Query Parameters
///
/// - `unseen` - `true` to return only events not yet marked seen
///
/// # Responses
///
/// - `200 OK` - `{"events": [...]}` ordered by event id
/// - `401 Unauthorized` - Invalid session credentials
/// - `500 Internal Server Error` - Store failure
async fn get_events(
    State(state): State<AppState>,
    Query(params): Query<EventsQueryParams>,
    headers: HeaderMap,
) -> error::Result<Json<EventsResponse>> {
    let session_id = authenticate_headers(state.store.as_ref(), &headers)?;

    let mut events = Event::load_all(state.store.as_ref(), &session_id)?;
    if params.unseen_only() {
        events.retain(|event| !event.seen);
    }

    debug!(
        session_id = %session_id,
        unseen_only = params.unseen_only(),
        event_count = events.len(),
        "Events polled"
    );

    Ok(Json(EventsResponse { events }))
}

// ============================================================================
// GET /health - Health Check
// ============================================================================

/// Response body for health check endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Server status (always "ok" if responding).
    pub status: String,

    /// Server uptime in seconds.
    pub uptime_seconds: u64,
}

/// GET /health - Health check endpoint.
///
/// No authentication required.
async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

// ============================================================================
// Tests
// ============================================================================
