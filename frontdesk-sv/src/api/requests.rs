//! Help-request API endpoints
//!
//! Escalation entry point for the agent collaborator plus the read and
//! resolution endpoints consumed by the supervisor dashboard.
//!
//! Payload fields are `Option` and validated in the handlers so a missing
//! field surfaces as 400 with a readable message, matching the wire
//! contract the dashboard expects.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::models::HelpRequest;
use crate::{db, escalation, AppState};

/// Request payload for creating a help request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestPayload {
    pub customer_phone: Option<String>,
    pub question: Option<String>,
    pub customer_name: Option<String>,
    pub context: Option<String>,
}

/// Response payload: the opaque reference token surfaced to the asker
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestResponse {
    pub request_id: String,
}

/// POST /help-requests
///
/// Escalation entry point: creates a pending request and notifies the
/// supervisor channel. 400 when customerPhone or question is missing.
pub async fn create_request(
    State(state): State<AppState>,
    Json(payload): Json<CreateRequestPayload>,
) -> ApiResult<Json<CreateRequestResponse>> {
    let customer_phone = payload
        .customer_phone
        .ok_or_else(|| ApiError::BadRequest("customerPhone is required".to_string()))?;
    let question = payload
        .question
        .ok_or_else(|| ApiError::BadRequest("question is required".to_string()))?;

    let request = escalation::create_request(
        &state.db,
        state.sink.as_ref(),
        state.request_timeout,
        &customer_phone,
        &question,
        payload.customer_name,
        payload.context,
    )
    .await?;

    Ok(Json(CreateRequestResponse {
        request_id: request.id,
    }))
}

/// GET /help-requests
///
/// All requests in storage order, no pagination.
pub async fn list_requests(State(state): State<AppState>) -> ApiResult<Json<Vec<HelpRequest>>> {
    let requests = db::requests::list_requests(&state.db).await?;
    Ok(Json(requests))
}

/// GET /help-requests/pending
///
/// Pending requests only. Reading this list sweeps expired requests to
/// timeout first; that side effect is part of the contract.
pub async fn list_pending(State(state): State<AppState>) -> ApiResult<Json<Vec<HelpRequest>>> {
    let requests = escalation::list_pending(&state.db).await?;
    Ok(Json(requests))
}

/// Request payload for resolving a help request
#[derive(Debug, Deserialize)]
pub struct RespondPayload {
    pub answer: Option<String>,
}

/// Response payload for a successful resolution
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondResponse {
    pub success: bool,
    pub updated_request: HelpRequest,
}

/// POST /help-requests/{id}/respond
///
/// Human resolution entry point. 404 for an unknown id, 400 for a missing
/// or blank answer, 409 when the request already reached a terminal state.
pub async fn respond(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<RespondPayload>,
) -> ApiResult<Json<RespondResponse>> {
    let answer = payload
        .answer
        .ok_or_else(|| ApiError::BadRequest("answer is required".to_string()))?;

    let updated = escalation::respond(&state.db, &id, &answer).await?;

    Ok(Json(RespondResponse {
        success: true,
        updated_request: updated,
    }))
}

/// Build help-request routes
pub fn request_routes() -> Router<AppState> {
    Router::new()
        .route("/help-requests", post(create_request).get(list_requests))
        .route("/help-requests/pending", get(list_pending))
        .route("/help-requests/:id/respond", post(respond))
}
