//! Knowledge-entry database operations
//!
//! Entries are append-only: created by seeding (source=initial) or by the
//! escalation lifecycle on resolution (source=learned), never deleted.

use frontdesk_common::{Error, Result};
use sqlx::{Row, SqlitePool};

use super::{format_ts, parse_ts};
use crate::models::{KnowledgeEntry, KnowledgeSource};

/// Insert or update a knowledge entry (keyed upsert)
pub async fn insert_entry(pool: &SqlitePool, entry: &KnowledgeEntry) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO knowledge_entries (
            id, question, answer, category, source, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            answer = excluded.answer,
            category = excluded.category,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.question)
    .bind(&entry.answer)
    .bind(&entry.category)
    .bind(entry.source.as_str())
    .bind(format_ts(entry.created_at))
    .bind(format_ts(entry.updated_at))
    .execute(pool)
    .await?;

    Ok(())
}

/// List all knowledge entries in storage (insertion) order
pub async fn list_entries(pool: &SqlitePool) -> Result<Vec<KnowledgeEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT id, question, answer, category, source, created_at, updated_at
        FROM knowledge_entries
        ORDER BY rowid
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(entry_from_row).collect()
}

/// Count of stored knowledge entries
pub async fn count_entries(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM knowledge_entries")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

fn entry_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<KnowledgeEntry> {
    let source_raw: String = row.get("source");
    let source = KnowledgeSource::parse(&source_raw)
        .ok_or_else(|| Error::Internal(format!("Unknown knowledge source: {}", source_raw)))?;

    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(KnowledgeEntry {
        id: row.get("id"),
        question: row.get("question"),
        answer: row.get("answer"),
        category: row.get("category"),
        source,
        created_at: parse_ts(&created_at, "created_at")?,
        updated_at: parse_ts(&updated_at, "updated_at")?,
    })
}
