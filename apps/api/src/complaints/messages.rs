//! Conversation thread attached to a complaint. Append-only.
//!
//! Thread access follows complaint access: the owner and the service
//! principal may read and post, nobody else.

use tracing::info;
use uuid::Uuid;

use crate::complaints::access::load_accessible;
use crate::complaints::store::ComplaintStore;
use crate::errors::AppError;
use crate::identity::Principal;
use crate::models::complaint::{Message, SenderRole};

pub const MAX_MESSAGE_CHARS: usize = 2000;

pub async fn list_messages(
    store: &dyn ComplaintStore,
    principal: &Principal,
    complaint_id: Uuid,
) -> Result<Vec<Message>, AppError> {
    load_accessible(store, principal, complaint_id).await?;
    Ok(store.list_messages(complaint_id).await?)
}

pub async fn post_message(
    store: &dyn ComplaintStore,
    principal: &Principal,
    complaint_id: Uuid,
    message_text: Option<&str>,
) -> Result<Message, AppError> {
    let text = message_text.map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(AppError::Validation("message_text is required".to_string()));
    }
    if text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::Validation(format!(
            "message_text must be at most {MAX_MESSAGE_CHARS} characters"
        )));
    }

    let complaint = load_accessible(store, principal, complaint_id).await?;

    // Past the access check the caller is either the service or the owner.
    let role = match principal.identity() {
        Some(identity) if complaint.is_owned_by(identity.id) => SenderRole::User,
        _ => SenderRole::Admin,
    };
    let message = store.append_message(complaint_id, text, role).await?;
    info!(
        "Message {} appended to complaint {complaint_id} by {}",
        message.id, message.sender_role
    );
    Ok(message)
}
