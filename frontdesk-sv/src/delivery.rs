//! Delivery notifier — pushes resolution messages to live askers
//!
//! Best-effort, at-least-once: a push failure evicts the session (a dead
//! channel is not coming back) and the caller queues the message as a
//! follow-up for the asker's next contact.

use chrono::Utc;
use frontdesk_common::Result;
use sqlx::SqlitePool;

use crate::db;
use crate::models::FollowUp;
use crate::sessions::SessionDirectory;

/// Attempt to push a message to an asker's live session
///
/// Returns true only when the push succeeded. No session → false with no
/// directory mutation. Push failure → the session is treated as dead,
/// removed from the directory, and false is returned; the error itself is
/// absorbed here and never reaches the resolution caller.
pub async fn notify(directory: &SessionDirectory, customer_phone: &str, message: &str) -> bool {
    let Some(entry) = directory.lookup(customer_phone).await else {
        tracing::debug!("No live session for {}, delivery deferred", customer_phone);
        return false;
    };

    match entry.handle.send_message(message).await {
        Ok(()) => {
            tracing::info!(
                customer_phone = %customer_phone,
                room = %entry.room_label,
                "Delivered answer to live session"
            );
            true
        }
        Err(e) => {
            tracing::warn!(
                customer_phone = %customer_phone,
                room = %entry.room_label,
                "Delivery failed ({}), evicting session",
                e
            );
            directory.unregister(customer_phone).await;
            false
        }
    }
}

/// Queue a message for replay on the asker's next contact
pub async fn defer(pool: &SqlitePool, customer_phone: &str, message: &str) -> Result<FollowUp> {
    let follow_up = FollowUp::new(customer_phone, message);
    db::follow_ups::enqueue(pool, &follow_up).await?;
    tracing::info!(
        customer_phone = %customer_phone,
        follow_up_id = %follow_up.id,
        "Queued follow-up for next contact"
    );
    Ok(follow_up)
}

/// Flush queued follow-ups to a freshly-registered session
///
/// Called after session registration; pushes each undelivered follow-up in
/// order and marks it delivered on success. Stops at the first failure (the
/// session just died again; remaining messages stay queued).
pub async fn drain_follow_ups(
    pool: &SqlitePool,
    directory: &SessionDirectory,
    customer_phone: &str,
) -> Result<usize> {
    let queued = db::follow_ups::list_undelivered_for(pool, customer_phone).await?;
    let mut drained = 0;

    for follow_up in queued {
        if !notify(directory, customer_phone, &follow_up.message).await {
            break;
        }
        db::follow_ups::mark_delivered(pool, &follow_up.id, Utc::now()).await?;
        drained += 1;
    }

    if drained > 0 {
        tracing::info!(
            customer_phone = %customer_phone,
            count = drained,
            "Drained deferred follow-ups on reconnect"
        );
    }
    Ok(drained)
}
