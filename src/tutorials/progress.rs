//! Follow/complete state of a user's tutorials.
//!
//! Every transition is a single conditional write against `UserRepo`, so two
//! concurrent follows of the same pair cannot both create an enrollment.

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use super::repo_types::Tutorial;
use crate::{
    error::AppError,
    store::StoreError,
    users::{
        repo::UserRepo,
        repo_types::{Enrollment, EnrollmentView, User},
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowOutcome {
    Followed(Enrollment),
    AlreadyFollowing(Enrollment),
}

impl FollowOutcome {
    pub fn enrollment(&self) -> &Enrollment {
        match self {
            Self::Followed(e) | Self::AlreadyFollowing(e) => e,
        }
    }
}

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("Not following this tutorial")]
    NotFollowing,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ProgressError> for AppError {
    fn from(e: ProgressError) -> Self {
        match e {
            ProgressError::NotFollowing => AppError::validation("Not following this tutorial"),
            ProgressError::Store(e) => e.into(),
        }
    }
}

pub async fn follow(
    users: &dyn UserRepo,
    user_id: Uuid,
    tutorial_id: Uuid,
) -> Result<FollowOutcome, ProgressError> {
    follow_at(users, user_id, tutorial_id, OffsetDateTime::now_utc()).await
}

/// `follow` with an explicit start time.
pub async fn follow_at(
    users: &dyn UserRepo,
    user_id: Uuid,
    tutorial_id: Uuid,
    started_at: OffsetDateTime,
) -> Result<FollowOutcome, ProgressError> {
    if let Some(created) = users.add_enrollment(user_id, tutorial_id, started_at).await? {
        info!(%user_id, %tutorial_id, "tutorial followed");
        return Ok(FollowOutcome::Followed(created));
    }
    // The pair already existed; report it instead of writing again.
    let existing = users
        .find_enrollment(user_id, tutorial_id)
        .await?
        .ok_or_else(|| {
            StoreError::Other(anyhow::anyhow!(
                "enrollment {user_id}/{tutorial_id} vanished during follow"
            ))
        })?;
    debug!(%user_id, %tutorial_id, "tutorial already followed");
    Ok(FollowOutcome::AlreadyFollowing(existing))
}

pub async fn complete(
    users: &dyn UserRepo,
    user_id: Uuid,
    tutorial_id: Uuid,
) -> Result<Enrollment, ProgressError> {
    let enrollment = users
        .complete_enrollment(user_id, tutorial_id)
        .await?
        .ok_or(ProgressError::NotFollowing)?;
    info!(%user_id, %tutorial_id, "tutorial completed");
    Ok(enrollment)
}

pub async fn is_completed(
    users: &dyn UserRepo,
    user_id: Uuid,
    tutorial_id: Uuid,
) -> Result<bool, ProgressError> {
    Ok(users
        .find_enrollment(user_id, tutorial_id)
        .await?
        .is_some_and(|e| e.is_completed))
}

/// Enrollments with tutorial title, slug and technology, newest first.
pub async fn list_for_user(
    users: &dyn UserRepo,
    user_id: Uuid,
) -> Result<Vec<EnrollmentView>, ProgressError> {
    Ok(users.list_enrollments(user_id).await?)
}

/// Full content is for admins and for users following the tutorial.
pub fn ensure_can_read(user: &User, tutorial: &Tutorial) -> Result<(), AppError> {
    if user.is_admin || user.is_following(tutorial.id) {
        Ok(())
    } else {
        Err(AppError::not_allowed())
    }
}
