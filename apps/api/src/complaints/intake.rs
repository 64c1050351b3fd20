//! Complaint intake: validate → resolve identity → classify → persist → notify.
//!
//! Only validation and the store write can fail a submission. Identity and
//! inference failures degrade to a guest submission and the fallback
//! classification; notification runs detached after the write.

use tracing::info;

use crate::complaints::store::ComplaintStore;
use crate::errors::AppError;
use crate::identity::{resolve_principal, Principal};
use crate::inference::Classifier;
use crate::models::complaint::{Complaint, NewComplaint};
use crate::notify::{dispatch, render_new_complaint};
use crate::state::AppState;

pub const MAX_COMPLAINT_CHARS: usize = 5000;

/// Returns the trimmed complaint text, or `Validation` if it is blank or too long.
pub fn validate_complaint_text(raw: Option<&str>) -> Result<&str, AppError> {
    let text = raw.map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(AppError::Validation(
            "complaint_text is required".to_string(),
        ));
    }
    if text.chars().count() > MAX_COMPLAINT_CHARS {
        return Err(AppError::Validation(format!(
            "complaint_text must be at most {MAX_COMPLAINT_CHARS} characters"
        )));
    }
    Ok(text)
}

/// Classifies and stores a complaint on behalf of the credential holder.
pub async fn submit_complaint(
    state: &AppState,
    complaint_text: Option<&str>,
    auth_credential: Option<&str>,
) -> Result<Complaint, AppError> {
    let text = validate_complaint_text(complaint_text)?;

    let principal = resolve_principal(
        state.identity.as_ref(),
        state.config.service_role_key.as_deref(),
        auth_credential,
    )
    .await;

    let complaint = classify_and_store(
        state.store.as_ref(),
        state.classifier.as_ref(),
        &principal,
        text,
    )
    .await?;

    match state.config.notify_recipient.as_deref() {
        Some(recipient) => dispatch(
            state.notifier.clone(),
            render_new_complaint(&complaint, recipient),
        ),
        None => tracing::debug!("No notification recipient configured; skipping"),
    }

    Ok(complaint)
}

async fn classify_and_store(
    store: &dyn ComplaintStore,
    classifier: &dyn Classifier,
    principal: &Principal,
    text: &str,
) -> Result<Complaint, AppError> {
    let prediction = classifier.classify(text).await;

    let identity = principal.identity();
    let new = NewComplaint {
        complaint_text: text.to_string(),
        category: prediction.category,
        sentiment: prediction.sentiment,
        priority: prediction.priority,
        ai_response: prediction.ai_response,
        ai_confidence_score: prediction.confidence_score,
        ai_explanation: prediction.explanation,
        user_id: identity.map(|i| i.id),
        user_email: identity.map(|i| i.email.clone()).filter(|e| !e.is_empty()),
    };

    let complaint = store.insert(new).await?;
    info!(
        "Complaint {} stored: category={}, priority={}, guest={}",
        complaint.id,
        complaint.category,
        complaint.priority,
        complaint.user_id.is_none()
    );
    Ok(complaint)
}
