//! Complaint access layer: who may read and change which complaint rows.
//!
//! Rules:
//! - `Principal::Service` sees and updates every row.
//! - `Principal::User` sees and updates only rows whose `user_id` is theirs.
//! - `Principal::Anonymous` owns nothing: empty listings, `Forbidden` on update.
//!
//! `is_admin` is an advisory flag for dashboards. It never widens access.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::complaints::store::{ComplaintFilter, ComplaintStore, ListScope};
use crate::errors::AppError;
use crate::identity::Principal;
use crate::models::complaint::{Complaint, ComplaintPatch, ComplaintStatus};
use crate::models::user::Identity;

pub async fn list_complaints(
    store: &dyn ComplaintStore,
    principal: &Principal,
    filter: &ComplaintFilter,
) -> Result<Vec<Complaint>, AppError> {
    let scope = match principal {
        Principal::Service => ListScope::All,
        Principal::User(identity) => ListScope::Owner(identity.id),
        Principal::Anonymous => return Ok(Vec::new()),
    };
    Ok(store.list(scope, filter).await?)
}

/// Loads a complaint the principal is allowed to act on.
/// `NotFound` takes precedence over `Forbidden`.
pub async fn load_accessible(
    store: &dyn ComplaintStore,
    principal: &Principal,
    id: Uuid,
) -> Result<Complaint, AppError> {
    let complaint = store
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Complaint {id} not found")))?;

    let allowed = match principal {
        Principal::Service => true,
        Principal::User(identity) => complaint.is_owned_by(identity.id),
        Principal::Anonymous => false,
    };
    if !allowed {
        return Err(AppError::Forbidden);
    }
    Ok(complaint)
}

/// Applies a partial status/feedback update.
///
/// Status only moves Pending → Resolved and feedback only moves from unset to
/// a value. Repeating the current value is accepted as a no-op for that field.
pub async fn update_complaint(
    store: &dyn ComplaintStore,
    principal: &Principal,
    id: Uuid,
    patch: ComplaintPatch,
) -> Result<Complaint, AppError> {
    let current = load_accessible(store, principal, id).await?;
    if let Some(reason) = patch.conflict_with(&current) {
        return Err(AppError::Conflict(reason.to_string()));
    }

    let Some(updated) = store.apply_patch(id, &patch).await? else {
        // The guarded write refused: the row changed since it was read.
        let latest = store
            .find(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Complaint {id} not found")))?;
        let reason = patch
            .conflict_with(&latest)
            .unwrap_or("Complaint was modified concurrently");
        return Err(AppError::Conflict(reason.to_string()));
    };

    info!(
        "Complaint {id} updated: status={}, feedback_helpful={:?}",
        updated.status, updated.feedback_helpful
    );
    Ok(updated)
}

pub async fn is_admin(store: &dyn ComplaintStore, identity: &Identity) -> Result<bool, AppError> {
    Ok(store.is_admin(identity.id).await?)
}

/// Dashboard counters over the complaints visible to a principal.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComplaintStats {
    pub total: usize,
    pub pending: usize,
    pub resolved: usize,
    pub by_category: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub by_sentiment: BTreeMap<String, usize>,
    pub feedback_helpful: usize,
    pub feedback_not_helpful: usize,
    pub average_confidence: f64,
}

pub fn summarize(complaints: &[Complaint]) -> ComplaintStats {
    let mut stats = ComplaintStats {
        total: complaints.len(),
        ..Default::default()
    };

    let mut confidence_sum = 0_i64;
    for complaint in complaints {
        match complaint.status() {
            ComplaintStatus::Pending => stats.pending += 1,
            ComplaintStatus::Resolved => stats.resolved += 1,
        }
        *stats.by_category.entry(complaint.category.clone()).or_default() += 1;
        *stats.by_priority.entry(complaint.priority.clone()).or_default() += 1;
        *stats.by_sentiment.entry(complaint.sentiment.clone()).or_default() += 1;
        match complaint.feedback_helpful {
            Some(true) => stats.feedback_helpful += 1,
            Some(false) => stats.feedback_not_helpful += 1,
            None => {}
        }
        confidence_sum += i64::from(complaint.ai_confidence_score);
    }

    if !complaints.is_empty() {
        stats.average_confidence = confidence_sum as f64 / complaints.len() as f64;
    }
    stats
}

pub async fn complaint_stats(
    store: &dyn ComplaintStore,
    principal: &Principal,
) -> Result<ComplaintStats, AppError> {
    let visible = list_complaints(store, principal, &ComplaintFilter::default()).await?;
    Ok(summarize(&visible))
}
