//! Verification workflow endpoints

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::db::workflows::WorkflowRow;
use crate::error::{AnchorError, Result};
use crate::routes::AppState;
use crate::workflow::VerificationState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateRequest {
    pub document_id: String,
}

/// POST /verification-workflows
pub async fn initiate(
    State(state): State<AppState>,
    Json(req): Json<InitiateRequest>,
) -> Result<(StatusCode, Json<WorkflowRow>)> {
    let workflow = state.engine.initiate(&req.document_id)?;
    Ok((StatusCode::CREATED, Json(workflow)))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub state: Option<String>,
}

/// GET /verification-workflows?state=
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<WorkflowRow>>> {
    let filter = query
        .state
        .as_deref()
        .map(str::parse::<VerificationState>)
        .transpose()?;
    Ok(Json(state.engine.find_all(filter)?))
}

/// GET /verification-workflows/document/:documentId
pub async fn latest_for_document(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<Json<WorkflowRow>> {
    state
        .engine
        .find_by_document(&document_id)?
        .map(Json)
        .ok_or_else(|| AnchorError::NotFound(format!("no workflow for document {document_id}")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub new_state: VerificationState,
    pub note: Option<String>,
}

/// PATCH /verification-workflows/:id/transition
pub async fn transition(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<WorkflowRow>> {
    let workflow = state
        .engine
        .transition(&id, req.new_state, req.note.as_deref())?;
    Ok(Json(workflow))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordAnchorRequest {
    pub stellar_transaction_id: String,
}

/// PATCH /verification-workflows/:id/anchor
pub async fn record_anchor(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RecordAnchorRequest>,
) -> Result<Json<WorkflowRow>> {
    let workflow = state.engine.record_anchor(&id, &req.stellar_transaction_id)?;
    Ok(Json(workflow))
}
