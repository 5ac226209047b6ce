use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, not exposed in JSON
    pub is_admin: bool,
    #[sqlx(skip)]
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    pub fn enrollment(&self, tutorial_id: Uuid) -> Option<&Enrollment> {
        self.enrollments.iter().find(|e| e.tutorial_id == tutorial_id)
    }

    pub fn is_following(&self, tutorial_id: Uuid) -> bool {
        self.enrollment(tutorial_id).is_some()
    }
}

/// A user's follow of one tutorial; owned by the user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct Enrollment {
    pub tutorial_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    pub is_completed: bool,
}

/// Enrollment joined with the tutorial fields shown in a user's list.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EnrollmentView {
    pub tutorial_id: Uuid,
    pub title: String,
    pub slug: String,
    pub technology: String,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    pub is_completed: bool,
}

/// Registration input. `password` is plaintext; the repository hashes it.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct UserNames {
    pub first_name: String,
    pub last_name: String,
}
