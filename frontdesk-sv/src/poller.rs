//! Resolution poller — background settle loop
//!
//! Every tick: sweep expired pending requests, then find resolved requests
//! whose answer has not been through a delivery attempt, attempt delivery,
//! and settle them regardless of outcome so the next tick never re-notifies.
//! A failed or impossible live delivery queues a follow-up instead.
//!
//! Ticks cannot overlap: one loop awaits each tick's work before sleeping
//! again. Per-tick errors are logged and never stop subsequent ticks.

use std::sync::Arc;
use std::time::Duration;

use frontdesk_common::Result;
use sqlx::SqlitePool;
use tokio::sync::RwLock;
use tokio::time::interval;
use tracing::{debug, error, info};

use crate::models::DeliveryStatus;
use crate::notify::NotificationSink;
use crate::sessions::SessionDirectory;
use crate::{db, delivery, escalation};

/// Background loop that propagates supervisor answers to askers
pub struct ResolutionPoller {
    pool: SqlitePool,
    directory: SessionDirectory,
    sink: Arc<dyn NotificationSink>,
    tick_interval: Duration,
    running: Arc<RwLock<bool>>,
}

impl ResolutionPoller {
    pub fn new(
        pool: SqlitePool,
        directory: SessionDirectory,
        sink: Arc<dyn NotificationSink>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            pool,
            directory,
            sink,
            tick_interval,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Run the poll loop until the running flag is cleared
    pub async fn run(&self) {
        *self.running.write().await = true;
        info!(
            "Resolution poller started (interval {:?})",
            self.tick_interval
        );

        let mut tick = interval(self.tick_interval);
        loop {
            tick.tick().await;

            if !*self.running.read().await {
                debug!("Resolution poller stopping");
                break;
            }

            // Log-and-continue: a bad tick must not kill the loop
            if let Err(e) = self.tick().await {
                error!("Resolution poller tick failed: {}", e);
            }
        }
    }

    /// Request the loop to stop after the current tick
    pub async fn stop(&self) {
        *self.running.write().await = false;
    }

    /// One poll cycle: sweep timeouts, then deliver-and-settle every
    /// resolved request still awaiting a delivery attempt
    pub async fn tick(&self) -> Result<usize> {
        escalation::sweep_timeouts(&self.pool).await?;

        let unsettled = db::requests::list_resolved_undelivered(&self.pool).await?;
        let mut settled = 0;

        for request in unsettled {
            debug_assert_eq!(request.delivery_status, DeliveryStatus::Undelivered);

            let Some(message) = escalation::resolution_message(&request) else {
                // Resolved without an answer would violate the data
                // invariant; settle it so it cannot wedge the loop.
                error!(
                    request_id = %request.id,
                    "Resolved request has no supervisor answer, settling without delivery"
                );
                db::requests::mark_delivered(&self.pool, &request.id).await?;
                continue;
            };

            let delivered =
                delivery::notify(&self.directory, &request.customer_phone, &message).await;
            if !delivered {
                delivery::defer(&self.pool, &request.customer_phone, &message).await?;
            }
            self.sink
                .notify_customer(&request.customer_phone, &message)
                .await;

            // Settle AFTER the delivery attempt completed, and regardless
            // of its outcome: the follow-up queue owns retries from here.
            db::requests::mark_delivered(&self.pool, &request.id).await?;
            settled += 1;

            info!(
                request_id = %request.id,
                delivered_live = delivered,
                "Settled resolved request"
            );
        }

        Ok(settled)
    }
}
