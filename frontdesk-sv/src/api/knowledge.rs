//! Knowledge API endpoints
//!
//! Read endpoint for the dashboard and the resolve entry point the agent
//! collaborator calls before deciding to escalate.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::models::KnowledgeEntry;
use crate::{db, resolver, AppState};

/// GET /knowledge
///
/// All knowledge entries in storage order, no pagination.
pub async fn list_knowledge(State(state): State<AppState>) -> ApiResult<Json<Vec<KnowledgeEntry>>> {
    let entries = db::knowledge::list_entries(&state.db).await?;
    Ok(Json(entries))
}

/// Request payload for a knowledge lookup
#[derive(Debug, Deserialize)]
pub struct ResolvePayload {
    pub question: Option<String>,
}

/// Lookup outcome: either a known answer or a signal to escalate
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ResolveResponse {
    #[serde(rename_all = "camelCase")]
    Known { answer: String, entry_id: String },
    #[serde(rename_all = "camelCase")]
    Escalate { escalate: bool },
}

/// POST /resolve
///
/// Pure read over the current knowledge snapshot: returns the best-matching
/// answer, or `{"escalate": true}` when nothing scores above zero.
pub async fn resolve(
    State(state): State<AppState>,
    Json(payload): Json<ResolvePayload>,
) -> ApiResult<Json<ResolveResponse>> {
    let question = payload
        .question
        .ok_or_else(|| ApiError::BadRequest("question is required".to_string()))?;

    let hit = resolver::resolve_query(&state.db, &state.resolver, &question).await?;

    Ok(Json(match hit {
        Some(entry) => ResolveResponse::Known {
            answer: entry.answer,
            entry_id: entry.id,
        },
        None => ResolveResponse::Escalate { escalate: true },
    }))
}

/// Build knowledge routes
pub fn knowledge_routes() -> Router<AppState> {
    Router::new()
        .route("/knowledge", get(list_knowledge))
        .route("/resolve", post(resolve))
}
