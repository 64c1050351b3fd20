//! Axum route handlers for the Complaints API.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::complaints::access::{self, ComplaintStats};
use crate::complaints::intake::submit_complaint;
use crate::complaints::messages;
use crate::complaints::store::ComplaintFilter;
use crate::errors::AppError;
use crate::identity::{bearer_token, resolve_principal, Principal};
use crate::models::complaint::{Complaint, ComplaintPatch, ComplaintStatus, Message};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubmitComplaintRequest {
    pub complaint_text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateComplaintRequest {
    pub id: Option<String>,
    pub status: Option<ComplaintStatus>,
    pub feedback_helpful: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub message_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ComplaintResponse {
    pub success: bool,
    pub complaint: Complaint,
}

#[derive(Debug, Serialize)]
pub struct ComplaintListResponse {
    pub success: bool,
    pub complaints: Vec<Complaint>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: ComplaintStats,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: Message,
}

#[derive(Debug, Serialize)]
pub struct MessageListResponse {
    pub success: bool,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct AdminCheckResponse {
    pub success: bool,
    pub is_admin: bool,
}

async fn principal_for(state: &AppState, headers: &HeaderMap) -> Principal {
    resolve_principal(
        state.identity.as_ref(),
        state.config.service_role_key.as_deref(),
        bearer_token(headers),
    )
    .await
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /complaints
pub async fn handle_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<SubmitComplaintRequest>, JsonRejection>,
) -> Result<Json<ComplaintResponse>, AppError> {
    let Json(request) = payload?;
    let complaint = submit_complaint(
        &state,
        request.complaint_text.as_deref(),
        bearer_token(&headers),
    )
    .await?;

    Ok(Json(ComplaintResponse {
        success: true,
        complaint,
    }))
}

/// GET /complaints
pub async fn handle_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<ComplaintFilter>, QueryRejection>,
) -> Result<Json<ComplaintListResponse>, AppError> {
    let Query(filter) = query?;
    let principal = principal_for(&state, &headers).await;
    let complaints = access::list_complaints(state.store.as_ref(), &principal, &filter).await?;

    Ok(Json(ComplaintListResponse {
        success: true,
        complaints,
    }))
}

/// PUT /complaints
pub async fn handle_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<UpdateComplaintRequest>, JsonRejection>,
) -> Result<Json<ComplaintResponse>, AppError> {
    let Json(request) = payload?;

    let raw_id = request
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("id is required".to_string()))?;
    let id = Uuid::parse_str(raw_id)
        .map_err(|_| AppError::Validation(format!("id '{raw_id}' is not a valid UUID")))?;

    let principal = principal_for(&state, &headers).await;
    let patch = ComplaintPatch {
        status: request.status,
        feedback_helpful: request.feedback_helpful,
    };
    let complaint =
        access::update_complaint(state.store.as_ref(), &principal, id, patch).await?;

    Ok(Json(ComplaintResponse {
        success: true,
        complaint,
    }))
}

/// GET /complaints/stats
pub async fn handle_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<StatsResponse>, AppError> {
    let principal = principal_for(&state, &headers).await;
    let stats = access::complaint_stats(state.store.as_ref(), &principal).await?;
    Ok(Json(StatsResponse {
        success: true,
        stats,
    }))
}

/// GET /complaints/:id/messages
pub async fn handle_list_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<MessageListResponse>, AppError> {
    let Path(id) = path?;
    let principal = principal_for(&state, &headers).await;
    let messages = messages::list_messages(state.store.as_ref(), &principal, id).await?;
    Ok(Json(MessageListResponse {
        success: true,
        messages,
    }))
}

/// POST /complaints/:id/messages
pub async fn handle_post_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<PostMessageRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Path(id) = path?;
    let Json(request) = payload?;
    let principal = principal_for(&state, &headers).await;
    let message = messages::post_message(
        state.store.as_ref(),
        &principal,
        id,
        request.message_text.as_deref(),
    )
    .await?;
    Ok(Json(MessageResponse {
        success: true,
        message,
    }))
}

/// GET /admin/check
///
/// Advisory flag for dashboard gating. Grants no data access by itself.
pub async fn handle_admin_check(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AdminCheckResponse>, AppError> {
    let principal = principal_for(&state, &headers).await;
    let is_admin = match principal.identity() {
        Some(identity) => access::is_admin(state.store.as_ref(), identity).await?,
        None => false,
    };
    Ok(Json(AdminCheckResponse {
        success: true,
        is_admin,
    }))
}
