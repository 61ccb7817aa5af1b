//! Help-request database operations
//!
//! State transitions are guarded at the SQL level (`WHERE status = 'pending'`)
//! so a concurrent writer can never move a request out of a terminal state.

use chrono::{DateTime, Utc};
use frontdesk_common::{Error, Result};
use sqlx::{Row, SqlitePool};

use super::{format_ts, parse_ts};
use crate::models::{DeliveryStatus, HelpRequest, RequestStatus};

/// Insert a new help request (keyed upsert)
pub async fn insert_request(pool: &SqlitePool, request: &HelpRequest) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO help_requests (
            id, customer_phone, customer_name, question, context,
            status, delivery_status, created_at, timeout_at,
            resolved_at, supervisor_answer
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            status = excluded.status,
            delivery_status = excluded.delivery_status,
            resolved_at = excluded.resolved_at,
            supervisor_answer = excluded.supervisor_answer
        "#,
    )
    .bind(&request.id)
    .bind(&request.customer_phone)
    .bind(&request.customer_name)
    .bind(&request.question)
    .bind(&request.context)
    .bind(request.status.as_str())
    .bind(request.delivery_status.as_str())
    .bind(format_ts(request.created_at))
    .bind(format_ts(request.timeout_at))
    .bind(request.resolved_at.map(format_ts))
    .bind(&request.supervisor_answer)
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetch a single request by id
pub async fn get_request(pool: &SqlitePool, id: &str) -> Result<Option<HelpRequest>> {
    let row = sqlx::query(
        r#"
        SELECT id, customer_phone, customer_name, question, context,
               status, delivery_status, created_at, timeout_at,
               resolved_at, supervisor_answer
        FROM help_requests
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(request_from_row).transpose()
}

/// List all requests in storage (insertion) order
pub async fn list_requests(pool: &SqlitePool) -> Result<Vec<HelpRequest>> {
    let rows = sqlx::query(
        r#"
        SELECT id, customer_phone, customer_name, question, context,
               status, delivery_status, created_at, timeout_at,
               resolved_at, supervisor_answer
        FROM help_requests
        ORDER BY rowid
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(request_from_row).collect()
}

/// List requests with a given lifecycle status, in storage order
pub async fn list_by_status(pool: &SqlitePool, status: RequestStatus) -> Result<Vec<HelpRequest>> {
    let rows = sqlx::query(
        r#"
        SELECT id, customer_phone, customer_name, question, context,
               status, delivery_status, created_at, timeout_at,
               resolved_at, supervisor_answer
        FROM help_requests
        WHERE status = ?
        ORDER BY rowid
        "#,
    )
    .bind(status.as_str())
    .fetch_all(pool)
    .await?;

    rows.iter().map(request_from_row).collect()
}

/// List resolved requests whose answer has not yet been through a
/// delivery attempt
pub async fn list_resolved_undelivered(pool: &SqlitePool) -> Result<Vec<HelpRequest>> {
    let rows = sqlx::query(
        r#"
        SELECT id, customer_phone, customer_name, question, context,
               status, delivery_status, created_at, timeout_at,
               resolved_at, supervisor_answer
        FROM help_requests
        WHERE resolved_at IS NOT NULL AND delivery_status = 'undelivered'
        ORDER BY rowid
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(request_from_row).collect()
}

/// Transition a pending request to timeout
///
/// Returns true if the transition happened; false means the request was no
/// longer pending (already resolved, already timed out, or unknown id).
pub async fn mark_timeout(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE help_requests SET status = 'timeout' WHERE id = ? AND status = 'pending'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Transition a pending request to resolved with the supervisor's answer
///
/// Returns true if the transition happened; the `status = 'pending'` guard
/// keeps terminal states terminal even under concurrent resolvers.
pub async fn mark_resolved(
    pool: &SqlitePool,
    id: &str,
    answer: &str,
    resolved_at: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE help_requests
        SET status = 'resolved', resolved_at = ?, supervisor_answer = ?
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(format_ts(resolved_at))
    .bind(answer)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Settle a request after a delivery attempt (success or failure), so the
/// poller never re-notifies on a later tick
pub async fn mark_delivered(pool: &SqlitePool, id: &str) -> Result<()> {
    sqlx::query("UPDATE help_requests SET delivery_status = 'delivered' WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

fn request_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<HelpRequest> {
    let status_raw: String = row.get("status");
    let status = RequestStatus::parse(&status_raw)
        .ok_or_else(|| Error::Internal(format!("Unknown request status: {}", status_raw)))?;

    let delivery_raw: String = row.get("delivery_status");
    let delivery_status = DeliveryStatus::parse(&delivery_raw)
        .ok_or_else(|| Error::Internal(format!("Unknown delivery status: {}", delivery_raw)))?;

    let created_at: String = row.get("created_at");
    let timeout_at: String = row.get("timeout_at");
    let resolved_at: Option<String> = row.get("resolved_at");

    Ok(HelpRequest {
        id: row.get("id"),
        customer_phone: row.get("customer_phone"),
        customer_name: row.get("customer_name"),
        question: row.get("question"),
        context: row.get("context"),
        status,
        delivery_status,
        created_at: parse_ts(&created_at, "created_at")?,
        timeout_at: parse_ts(&timeout_at, "timeout_at")?,
        resolved_at: resolved_at
            .as_deref()
            .map(|raw| parse_ts(raw, "resolved_at"))
            .transpose()?,
        supervisor_answer: row.get("supervisor_answer"),
    })
}
