use serde::Serialize;
use sqlx::FromRow;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Password reset credential issued to one user.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ResetToken {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(skip_serializing)]
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ResetToken {
    pub fn is_expired(&self, ttl: Duration, now: OffsetDateTime) -> bool {
        self.created_at + ttl < now
    }
}
