//! Persistence boundary for complaints, messages and admin markers.
//!
//! The store performs raw row operations only. Visibility and ownership
//! rules live in `complaints::access`, which is the only caller allowed to
//! decide which [`ListScope`] a principal gets.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::complaint::{
    Complaint, ComplaintPatch, ComplaintStatus, Message, NewComplaint, SenderRole,
};
use crate::models::user::AdminMarker;

const COMPLAINT_COLUMNS: &str = "id, complaint_text, category, sentiment, priority, ai_response, \
     ai_confidence_score, ai_explanation, status, feedback_helpful, user_id, user_email, \
     created_at, updated_at";

/// Which rows a listing may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    All,
    Owner(Uuid),
}

/// Exact-match filters applied within a scope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComplaintFilter {
    pub status: Option<ComplaintStatus>,
    pub category: Option<String>,
    pub priority: Option<String>,
}

/// Carried in `AppState` as `Arc<dyn ComplaintStore>`.
#[async_trait]
pub trait ComplaintStore: Send + Sync {
    async fn insert(&self, new: NewComplaint) -> Result<Complaint, sqlx::Error>;

    async fn find(&self, id: Uuid) -> Result<Option<Complaint>, sqlx::Error>;

    /// Newest first; rows with equal `created_at` keep insertion order.
    async fn list(
        &self,
        scope: ListScope,
        filter: &ComplaintFilter,
    ) -> Result<Vec<Complaint>, sqlx::Error>;

    /// Applies `patch` and refreshes `updated_at` in a single guarded write.
    ///
    /// Returns `None` if the row does not exist or if the patch conflicts with
    /// the row as stored at write time (see [`ComplaintPatch::conflict_with`]).
    /// Pending is never written.
    async fn apply_patch(
        &self,
        id: Uuid,
        patch: &ComplaintPatch,
    ) -> Result<Option<Complaint>, sqlx::Error>;

    async fn is_admin(&self, user_id: Uuid) -> Result<bool, sqlx::Error>;

    async fn append_message(
        &self,
        complaint_id: Uuid,
        message_text: &str,
        sender_role: SenderRole,
    ) -> Result<Message, sqlx::Error>;

    /// Oldest first.
    async fn list_messages(&self, complaint_id: Uuid) -> Result<Vec<Message>, sqlx::Error>;
}

pub struct PgComplaintStore {
    pool: PgPool,
}

impl PgComplaintStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ComplaintStore for PgComplaintStore {
    async fn insert(&self, new: NewComplaint) -> Result<Complaint, sqlx::Error> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let complaint = sqlx::query_as::<_, Complaint>(&format!(
            r#"
            INSERT INTO complaints
                (id, complaint_text, category, sentiment, priority, ai_response,
                 ai_confidence_score, ai_explanation, status, user_id, user_email,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
            RETURNING {COMPLAINT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&new.complaint_text)
        .bind(&new.category)
        .bind(&new.sentiment)
        .bind(&new.priority)
        .bind(&new.ai_response)
        .bind(new.ai_confidence_score)
        .bind(&new.ai_explanation)
        .bind(ComplaintStatus::Pending.as_str())
        .bind(new.user_id)
        .bind(&new.user_email)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        info!("Inserted complaint {id}");
        Ok(complaint)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Complaint>, sqlx::Error> {
        sqlx::query_as::<_, Complaint>(&format!(
            "SELECT {COMPLAINT_COLUMNS} FROM complaints WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list(
        &self,
        scope: ListScope,
        filter: &ComplaintFilter,
    ) -> Result<Vec<Complaint>, sqlx::Error> {
        let owner = match scope {
            ListScope::All => None,
            ListScope::Owner(user_id) => Some(user_id),
        };

        sqlx::query_as::<_, Complaint>(&format!(
            r#"
            SELECT {COMPLAINT_COLUMNS}
            FROM complaints
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR category = $3)
              AND ($4::text IS NULL OR priority = $4)
            ORDER BY created_at DESC, seq ASC
            "#
        ))
        .bind(owner)
        .bind(filter.status.map(ComplaintStatus::as_str))
        .bind(filter.category.as_deref())
        .bind(filter.priority.as_deref())
        .fetch_all(&self.pool)
        .await
    }

    async fn apply_patch(
        &self,
        id: Uuid,
        patch: &ComplaintPatch,
    ) -> Result<Option<Complaint>, sqlx::Error> {
        let updated = sqlx::query_as::<_, Complaint>(&format!(
            r#"
            UPDATE complaints
            SET status = COALESCE($2, status),
                feedback_helpful = COALESCE($3, feedback_helpful),
                updated_at = $4
            WHERE id = $1
              AND ($5::text IS DISTINCT FROM 'Pending' OR status <> 'Resolved')
              AND ($3::boolean IS NULL OR feedback_helpful IS NULL OR feedback_helpful = $3)
            RETURNING {COMPLAINT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.status_to_write().map(ComplaintStatus::as_str))
        .bind(patch.feedback_helpful)
        .bind(Utc::now())
        .bind(patch.status.map(ComplaintStatus::as_str))
        .fetch_optional(&self.pool)
        .await?;

        if updated.is_some() {
            info!("Updated complaint {id}: {patch:?}");
        }
        Ok(updated)
    }

    async fn is_admin(&self, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let marker = sqlx::query_as::<_, AdminMarker>(
            "SELECT user_id, email FROM admins WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(marker.is_some())
    }

    async fn append_message(
        &self,
        complaint_id: Uuid,
        message_text: &str,
        sender_role: SenderRole,
    ) -> Result<Message, sqlx::Error> {
        sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO complaint_messages (id, complaint_id, message_text, sender_role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, complaint_id, message_text, sender_role, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(complaint_id)
        .bind(message_text)
        .bind(sender_role.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
    }

    async fn list_messages(&self, complaint_id: Uuid) -> Result<Vec<Message>, sqlx::Error> {
        sqlx::query_as::<_, Message>(
            r#"
            SELECT id, complaint_id, message_text, sender_role, created_at
            FROM complaint_messages
            WHERE complaint_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(complaint_id)
        .fetch_all(&self.pool)
        .await
    }
}
