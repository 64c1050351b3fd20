use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An authenticated end user, as reported by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
}

/// Presence of a row grants admin capability to `user_id`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AdminMarker {
    pub user_id: Uuid,
    pub email: String,
}
