use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle state of a complaint. Stored as TEXT ("Pending" / "Resolved").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplaintStatus {
    Pending,
    Resolved,
}

impl ComplaintStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ComplaintStatus::Pending => "Pending",
            ComplaintStatus::Resolved => "Resolved",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Pending" => Some(ComplaintStatus::Pending),
            "Resolved" => Some(ComplaintStatus::Resolved),
            _ => None,
        }
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Complaint {
    pub id: Uuid,
    pub complaint_text: String,
    pub category: String,
    pub sentiment: String,
    pub priority: String,
    pub ai_response: String,
    pub ai_confidence_score: i32,
    pub ai_explanation: String,
    pub status: String,
    pub feedback_helpful: Option<bool>,
    pub user_id: Option<Uuid>,
    pub user_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Complaint {
    /// Unknown status strings are treated as Pending; the table CHECK
    /// constraint keeps them from existing in practice.
    pub fn status(&self) -> ComplaintStatus {
        ComplaintStatus::parse(&self.status).unwrap_or(ComplaintStatus::Pending)
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == Some(user_id)
    }
}

/// Values written by the intake handler when a complaint is first stored.
#[derive(Debug, Clone)]
pub struct NewComplaint {
    pub complaint_text: String,
    pub category: String,
    pub sentiment: String,
    pub priority: String,
    pub ai_response: String,
    pub ai_confidence_score: i32,
    pub ai_explanation: String,
    pub user_id: Option<Uuid>,
    pub user_email: Option<String>,
}

/// Partial update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComplaintPatch {
    pub status: Option<ComplaintStatus>,
    pub feedback_helpful: Option<bool>,
}

impl ComplaintPatch {
    /// Why this patch cannot be applied on top of `current`, if it can't.
    ///
    /// Status only moves Pending → Resolved and feedback only moves from unset
    /// to a value. Repeating the current value is never a conflict.
    pub fn conflict_with(&self, current: &Complaint) -> Option<&'static str> {
        if self.status == Some(ComplaintStatus::Pending)
            && current.status() == ComplaintStatus::Resolved
        {
            return Some("A resolved complaint cannot be reopened");
        }
        match (current.feedback_helpful, self.feedback_helpful) {
            (Some(recorded), Some(requested)) if recorded != requested => {
                Some("Feedback has already been recorded for this complaint")
            }
            _ => None,
        }
    }

    /// The status to write, if any. Pending is never written: a complaint
    /// starts Pending and cannot return to it.
    pub fn status_to_write(&self) -> Option<ComplaintStatus> {
        self.status.filter(|s| *s == ComplaintStatus::Resolved)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    User,
    Admin,
}

impl SenderRole {
    pub fn as_str(self) -> &'static str {
        match self {
            SenderRole::User => "user",
            SenderRole::Admin => "admin",
        }
    }
}

/// Thread entry attached to a complaint. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub complaint_id: Uuid,
    pub message_text: String,
    pub sender_role: String,
    pub created_at: DateTime<Utc>,
}
