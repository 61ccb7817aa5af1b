//! Live-session directory
//!
//! Tracks which askers currently have an open transport channel. Entries are
//! process-local only: a session that did not survive a restart is not a
//! session. The transport collaborator registers on connect and unregisters
//! on disconnect; the delivery notifier evicts on a failed push.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// Capability supplied by the transport collaborator for pushing a message
/// into an open session
#[async_trait]
pub trait SessionHandle: Send + Sync {
    /// Push a text message to the asker. Any error is treated by the caller
    /// as evidence the session is dead.
    async fn send_message(&self, message: &str) -> anyhow::Result<()>;
}

/// One live transport channel for one asker
#[derive(Clone)]
pub struct LiveSessionEntry {
    pub customer_phone: String,
    pub handle: Arc<dyn SessionHandle>,
    pub room_label: String,
    pub connected_at: DateTime<Utc>,
}

/// Registry of currently-reachable askers, at most one entry per identity
#[derive(Clone, Default)]
pub struct SessionDirectory {
    sessions: Arc<RwLock<HashMap<String, LiveSessionEntry>>>,
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session on connect. A new registration overwrites any
    /// stale entry for the same identity.
    pub async fn register(
        &self,
        customer_phone: impl Into<String>,
        handle: Arc<dyn SessionHandle>,
        room_label: impl Into<String>,
    ) {
        let customer_phone = customer_phone.into();
        let entry = LiveSessionEntry {
            customer_phone: customer_phone.clone(),
            handle,
            room_label: room_label.into(),
            connected_at: Utc::now(),
        };

        let mut sessions = self.sessions.write().await;
        if sessions.insert(customer_phone.clone(), entry).is_some() {
            tracing::debug!("Replaced stale session for {}", customer_phone);
        } else {
            tracing::debug!("Registered session for {}", customer_phone);
        }
    }

    /// Remove a session on disconnect (or on delivery failure)
    pub async fn unregister(&self, customer_phone: &str) {
        if self.sessions.write().await.remove(customer_phone).is_some() {
            tracing::debug!("Unregistered session for {}", customer_phone);
        }
    }

    /// Look up the live session for an asker, if any
    pub async fn lookup(&self, customer_phone: &str) -> Option<LiveSessionEntry> {
        self.sessions.read().await.get(customer_phone).cloned()
    }

    /// Number of currently-registered sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
