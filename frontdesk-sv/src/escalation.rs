//! Escalation lifecycle — create, time out, resolve
//!
//! State machine: `pending → resolved` (a supervisor answers in time) or
//! `pending → timeout` (the deadline passes first); both terminal. Timeouts
//! are swept lazily on the pending read, so no timer is required for
//! correctness; the resolution poller additionally runs the same sweep each
//! tick so dashboards that rarely poll still see timely transitions.

use chrono::{Duration, Utc};
use frontdesk_common::{Error, Result};
use sqlx::SqlitePool;

use crate::db;
use crate::models::{HelpRequest, KnowledgeEntry, KnowledgeSource, RequestStatus};
use crate::notify::NotificationSink;

/// Create a pending help request and notify the supervisor channel
///
/// Fails only on storage I/O or on missing required fields (no side effects
/// in that case).
pub async fn create_request(
    pool: &SqlitePool,
    sink: &dyn NotificationSink,
    timeout: Duration,
    customer_phone: &str,
    question: &str,
    customer_name: Option<String>,
    context: Option<String>,
) -> Result<HelpRequest> {
    if customer_phone.trim().is_empty() {
        return Err(Error::InvalidInput("customerPhone is required".to_string()));
    }
    if question.trim().is_empty() {
        return Err(Error::InvalidInput("question is required".to_string()));
    }

    let request = HelpRequest::new(customer_phone, question, customer_name, context, timeout);
    db::requests::insert_request(pool, &request).await?;

    tracing::info!(
        request_id = %request.id,
        customer_phone = %request.customer_phone,
        "Escalated question to supervisor"
    );
    sink.notify_supervisor(&request).await;

    Ok(request)
}

/// Transition every pending request past its deadline to timeout
///
/// Idempotent: a request already timed out (or resolved meanwhile) is left
/// alone by the `pending` guard in the update. Returns how many requests
/// were transitioned.
pub async fn sweep_timeouts(pool: &SqlitePool) -> Result<usize> {
    let now = Utc::now();
    let pending = db::requests::list_by_status(pool, RequestStatus::Pending).await?;

    let mut swept = 0;
    for request in pending {
        if request.timeout_at <= now && db::requests::mark_timeout(pool, &request.id).await? {
            tracing::info!(
                request_id = %request.id,
                customer_phone = %request.customer_phone,
                "Help request timed out without a supervisor answer"
            );
            swept += 1;
        }
    }

    Ok(swept)
}

/// Sweep expired requests, then return the remaining pending ones in
/// storage order
pub async fn list_pending(pool: &SqlitePool) -> Result<Vec<HelpRequest>> {
    sweep_timeouts(pool).await?;
    db::requests::list_by_status(pool, RequestStatus::Pending).await
}

/// Resolve a pending request with the supervisor's answer
///
/// On success the request transitions to resolved and exactly one learned
/// knowledge entry is written (question copied verbatim, answer from the
/// supervisor). The two writes are sequential, not atomic: a crash in
/// between leaves a resolved request without its knowledge entry, which
/// `learned_entry_exists` can surface for manual recovery.
///
/// Errors: `NotFound` for an unknown id, `InvalidInput` for a blank answer
/// (no side effects), `InvalidState` when the request is no longer pending.
pub async fn respond(pool: &SqlitePool, id: &str, answer: &str) -> Result<HelpRequest> {
    let answer = answer.trim();
    if answer.is_empty() {
        return Err(Error::InvalidInput("answer is required".to_string()));
    }

    let request = db::requests::get_request(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Help request {} not found", id)))?;

    if request.status != RequestStatus::Pending {
        return Err(Error::InvalidState(format!(
            "Help request {} is already {}",
            id,
            request.status.as_str()
        )));
    }

    let resolved_at = Utc::now();
    // The `pending` guard makes the transition a compare-and-swap: a
    // concurrent resolver or the timeout sweep wins at most once.
    if !db::requests::mark_resolved(pool, id, answer, resolved_at).await? {
        return Err(Error::InvalidState(format!(
            "Help request {} is no longer pending",
            id
        )));
    }

    let learned = KnowledgeEntry::new(
        request.question.clone(),
        answer,
        request.context.clone(),
        KnowledgeSource::Learned,
    );
    db::knowledge::insert_entry(pool, &learned).await?;

    tracing::info!(
        request_id = %id,
        knowledge_id = %learned.id,
        "Supervisor answer recorded; knowledge base updated"
    );

    db::requests::get_request(pool, id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Help request {} vanished after update", id)))
}

/// Whether a learned entry with this exact question already exists
///
/// Recovery probe for the crash window between the request transition and
/// the knowledge write.
pub async fn learned_entry_exists(pool: &SqlitePool, question: &str) -> Result<bool> {
    let entries = db::knowledge::list_entries(pool).await?;
    Ok(entries
        .iter()
        .any(|e| e.source == KnowledgeSource::Learned && e.question == question))
}

/// The message delivered to the asker once their question is answered;
/// embeds the supervisor's answer verbatim
pub fn resolution_message(request: &HelpRequest) -> Option<String> {
    let answer = request.supervisor_answer.as_deref()?;
    Some(format!(
        "You asked: \"{}\". Here's the answer: {}",
        request.question, answer
    ))
}
