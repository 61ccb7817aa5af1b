//! Data model for the frontdesk supervisor service
//!
//! Three persisted record kinds (knowledge entries, help requests, deferred
//! follow-ups) plus the process-local live-session entry. Wire serialization
//! uses camelCase field names: that is the contract the dashboard and agent
//! collaborators already speak.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a knowledge entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeSource {
    /// Pre-seeded data shipped with the service
    Initial,
    /// Created from a supervisor's answer to an escalated question
    Learned,
}

impl KnowledgeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Learned => "learned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "initial" => Some(Self::Initial),
            "learned" => Some(Self::Learned),
            _ => None,
        }
    }
}

/// A question the service already knows how to answer
///
/// Immutable once created (only `updated_at` may refresh); never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeEntry {
    pub id: String,
    /// Canonical phrasing of the question
    pub question: String,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub source: KnowledgeSource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl KnowledgeEntry {
    pub fn new(
        question: impl Into<String>,
        answer: impl Into<String>,
        category: Option<String>,
        source: KnowledgeSource,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            question: question.into(),
            answer: answer.into(),
            category,
            source,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Lifecycle state of a help request
///
/// `pending → resolved` and `pending → timeout` are the only transitions;
/// both end states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Resolved,
    Timeout,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved => "resolved",
            Self::Timeout => "timeout",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "resolved" => Some(Self::Resolved),
            "timeout" => Some(Self::Timeout),
            _ => None,
        }
    }
}

/// Whether the resolved answer has been through a delivery attempt
///
/// Kept separate from `RequestStatus` so settlement bookkeeping never
/// overloads the lifecycle state. `Delivered` means the poller settled the
/// request after an attempt; it does not imply the push succeeded (a failed
/// push leaves a follow-up in the deferred queue instead).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Undelivered,
    Delivered,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Undelivered => "undelivered",
            Self::Delivered => "delivered",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "undelivered" => Some(Self::Undelivered),
            "delivered" => Some(Self::Delivered),
            _ => None,
        }
    }
}

/// A question escalated to a human supervisor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpRequest {
    pub id: String,
    /// Asker identity (phone-like string)
    pub customer_phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub status: RequestStatus,
    pub delivery_status: DeliveryStatus,
    pub created_at: DateTime<Utc>,
    /// Deadline after which a still-pending request transitions to timeout
    pub timeout_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supervisor_answer: Option<String>,
}

impl HelpRequest {
    /// Create a new pending request with a deadline `timeout` from now
    pub fn new(
        customer_phone: impl Into<String>,
        question: impl Into<String>,
        customer_name: Option<String>,
        context: Option<String>,
        timeout: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            customer_phone: customer_phone.into(),
            customer_name,
            question: question.into(),
            context,
            status: RequestStatus::Pending,
            delivery_status: DeliveryStatus::Undelivered,
            created_at: now,
            timeout_at: now + timeout,
            resolved_at: None,
            supervisor_answer: None,
        }
    }
}

/// A message that could not be delivered live, queued for the asker's
/// next contact
///
/// References the originating request only loosely (identity + message
/// text), so delivery can be retried without knowledge of escalation
/// internals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUp {
    pub id: String,
    pub customer_phone: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
}

impl FollowUp {
    pub fn new(customer_phone: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            customer_phone: customer_phone.into(),
            message: message.into(),
            created_at: Utc::now(),
            delivered_at: None,
        }
    }
}
