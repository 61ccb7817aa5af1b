//! Database access for frontdesk-sv
//!
//! Three independent collections (knowledge entries, help requests, deferred
//! follow-ups), each a flat ordered list of records keyed by opaque string id.
//! Updates are keyed upserts; no schema versioning, additive-only evolution.

pub mod follow_ups;
pub mod knowledge;
pub mod requests;

use chrono::{DateTime, Utc};
use frontdesk_common::{Error, Result};
use sqlx::SqlitePool;
use std::path::Path;

use crate::models::{KnowledgeEntry, KnowledgeSource};

/// Initialize database connection pool
///
/// Connects with mode=rwc (read, write, create) and runs table migrations.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    frontdesk_common::config::ensure_database_dir(db_path)?;

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create service tables if they don't exist
async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS knowledge_entries (
            id TEXT PRIMARY KEY,
            question TEXT NOT NULL,
            answer TEXT NOT NULL,
            category TEXT,
            source TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS help_requests (
            id TEXT PRIMARY KEY,
            customer_phone TEXT NOT NULL,
            customer_name TEXT,
            question TEXT NOT NULL,
            context TEXT,
            status TEXT NOT NULL,
            delivery_status TEXT NOT NULL DEFAULT 'undelivered',
            created_at TEXT NOT NULL,
            timeout_at TEXT NOT NULL,
            resolved_at TEXT,
            supervisor_answer TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS follow_ups (
            id TEXT PRIMARY KEY,
            customer_phone TEXT NOT NULL,
            message TEXT NOT NULL,
            created_at TEXT NOT NULL,
            delivered_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Seed the knowledge base with the initial entries, if it is empty
///
/// Idempotent: an already-populated store is left untouched, so learned
/// entries survive restarts without duplicated seeds.
pub async fn seed_knowledge(pool: &SqlitePool) -> Result<usize> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM knowledge_entries")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Ok(0);
    }

    let seeds = [
        (
            "What are your business hours?",
            "We're open Tuesday through Saturday, 9am to 7pm. Closed Sunday and Monday.",
            Some("hours"),
        ),
        (
            "How much does a haircut cost?",
            "A standard haircut is $45. A cut with wash and style is $60.",
            Some("pricing"),
        ),
        (
            "How much does hair coloring cost?",
            "Hair coloring starts at $85 for a single process. Highlights start at $120.",
            Some("pricing"),
        ),
        (
            "Where are you located?",
            "We're at 14 Water Street, two blocks from the train station.",
            Some("location"),
        ),
        (
            "Do you take walk-ins or do I need an appointment?",
            "Walk-ins are welcome when a chair is free, but appointments are recommended.",
            Some("appointments"),
        ),
    ];

    for (question, answer, category) in seeds {
        let entry = KnowledgeEntry::new(
            question,
            answer,
            category.map(str::to_string),
            KnowledgeSource::Initial,
        );
        knowledge::insert_entry(pool, &entry).await?;
    }

    tracing::info!("Seeded knowledge base with {} initial entries", seeds.len());
    Ok(seeds.len())
}

/// Format a timestamp for a TEXT column
pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

/// Parse a timestamp from a TEXT column
pub(crate) fn parse_ts(raw: &str, column: &str) -> Result<DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}
