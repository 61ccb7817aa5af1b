//! frontdesk-sv library interface
//!
//! Mediates between an automated answering agent and human supervisors:
//! fuzzy knowledge lookup decides when the agent must defer, the escalation
//! lifecycle tracks each deferred question, and the resolution poller pushes
//! supervisor answers back to askers who are still reachable.

pub mod api;
pub mod db;
pub mod delivery;
pub mod error;
pub mod escalation;
pub mod models;
pub mod notify;
pub mod poller;
pub mod resolver;
pub mod sessions;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::Router;
use chrono::Duration;
use frontdesk_common::Result;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

use crate::notify::NotificationSink;
use crate::resolver::ResolverConfig;
use crate::sessions::{SessionDirectory, SessionHandle};

/// Application state shared across handlers and background tasks
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Live-session directory (process-local)
    pub sessions: SessionDirectory,
    /// Outbound notification sink
    pub sink: Arc<dyn NotificationSink>,
    /// Knowledge resolver configuration (matching tables + toggles)
    pub resolver: Arc<ResolverConfig>,
    /// Deadline applied to newly-created help requests
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        sink: Arc<dyn NotificationSink>,
        resolver: ResolverConfig,
        request_timeout: Duration,
    ) -> Self {
        Self {
            db,
            sessions: SessionDirectory::new(),
            sink,
            resolver: Arc::new(resolver),
            request_timeout,
        }
    }

    /// Register an asker's live session and replay any queued follow-ups
    ///
    /// Entry point for the transport collaborator's connect callback.
    pub async fn register_session(
        &self,
        customer_phone: &str,
        handle: Arc<dyn SessionHandle>,
        room_label: &str,
    ) -> Result<usize> {
        self.sessions
            .register(customer_phone, handle, room_label)
            .await;
        delivery::drain_follow_ups(&self.db, &self.sessions, customer_phone).await
    }

    /// Remove an asker's live session (transport disconnect callback)
    pub async fn unregister_session(&self, customer_phone: &str) {
        self.sessions.unregister(customer_phone).await;
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::request_routes())
        .merge(api::knowledge_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
