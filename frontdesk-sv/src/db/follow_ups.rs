//! Deferred follow-up queue operations

use chrono::{DateTime, Utc};
use frontdesk_common::Result;
use sqlx::{Row, SqlitePool};

use super::{format_ts, parse_ts};
use crate::models::FollowUp;

/// Queue a message for delivery on the asker's next contact
pub async fn enqueue(pool: &SqlitePool, follow_up: &FollowUp) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO follow_ups (id, customer_phone, message, created_at, delivered_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            delivered_at = excluded.delivered_at
        "#,
    )
    .bind(&follow_up.id)
    .bind(&follow_up.customer_phone)
    .bind(&follow_up.message)
    .bind(format_ts(follow_up.created_at))
    .bind(follow_up.delivered_at.map(format_ts))
    .execute(pool)
    .await?;

    Ok(())
}

/// Undelivered follow-ups for one asker, oldest first
pub async fn list_undelivered_for(pool: &SqlitePool, customer_phone: &str) -> Result<Vec<FollowUp>> {
    let rows = sqlx::query(
        r#"
        SELECT id, customer_phone, message, created_at, delivered_at
        FROM follow_ups
        WHERE customer_phone = ? AND delivered_at IS NULL
        ORDER BY rowid
        "#,
    )
    .bind(customer_phone)
    .fetch_all(pool)
    .await?;

    rows.iter().map(follow_up_from_row).collect()
}

/// All follow-ups in storage order
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<FollowUp>> {
    let rows = sqlx::query(
        r#"
        SELECT id, customer_phone, message, created_at, delivered_at
        FROM follow_ups
        ORDER BY rowid
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(follow_up_from_row).collect()
}

/// Mark a queued follow-up as flushed to the asker
pub async fn mark_delivered(pool: &SqlitePool, id: &str, delivered_at: DateTime<Utc>) -> Result<()> {
    sqlx::query("UPDATE follow_ups SET delivered_at = ? WHERE id = ?")
        .bind(format_ts(delivered_at))
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

fn follow_up_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<FollowUp> {
    let created_at: String = row.get("created_at");
    let delivered_at: Option<String> = row.get("delivered_at");

    Ok(FollowUp {
        id: row.get("id"),
        customer_phone: row.get("customer_phone"),
        message: row.get("message"),
        created_at: parse_ts(&created_at, "created_at")?,
        delivered_at: delivered_at
            .as_deref()
            .map(|raw| parse_ts(raw, "delivered_at"))
            .transpose()?,
    })
}
