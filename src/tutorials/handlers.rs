use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{CompletedResponse, CreateTutorialRequest, UpdateTutorialRequest},
    progress::{self, FollowOutcome},
    repo_types::{Tutorial, TutorialPreview},
};
use crate::{
    auth::{AdminUser, CurrentUser},
    error::{AppError, AppResult},
    response::Reply,
    state::AppState,
    users::repo_types::Enrollment,
};

async fn find_tutorial(state: &AppState, slug: &str) -> AppResult<Tutorial> {
    state.tutorials.find_by_slug(slug).await?.ok_or_else(|| {
        warn!(slug, "tutorial not found");
        AppError::not_found("Tutorial not found")
    })
}

#[instrument(skip_all)]
pub async fn list_tutorials(State(state): State<AppState>) -> AppResult<Reply<Vec<TutorialPreview>>> {
    let previews: Vec<TutorialPreview> = state
        .tutorials
        .list()
        .await?
        .into_iter()
        .map(TutorialPreview::from)
        .collect();
    Ok(Reply::ok("Got tutorials", previews))
}

#[instrument(skip_all)]
pub async fn create_tutorial(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    payload: Result<Json<CreateTutorialRequest>, JsonRejection>,
) -> AppResult<Reply<Tutorial>> {
    let Json(payload) = payload?;
    let tutorial = state.tutorials.create(payload.validate()?).await?;
    info!(slug = %tutorial.slug, by = %admin.id, "tutorial created");
    Ok(Reply::created("Tutorial created", tutorial))
}

#[instrument(skip_all)]
pub async fn get_tutorial(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<Reply<Tutorial>> {
    let Path(slug) = path?;
    let tutorial = find_tutorial(&state, &slug).await?;
    progress::ensure_can_read(&user, &tutorial).map_err(|e| {
        warn!(user_id = %user.id, %slug, "read of unfollowed tutorial refused");
        e
    })?;
    Ok(Reply::ok("Got tutorial", tutorial))
}

#[instrument(skip_all)]
pub async fn preview_tutorial(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<Reply<TutorialPreview>> {
    let Path(slug) = path?;
    let tutorial = find_tutorial(&state, &slug).await?;
    Ok(Reply::ok("Got tutorial preview", tutorial.into()))
}

#[instrument(skip_all)]
pub async fn update_tutorial(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<UpdateTutorialRequest>, JsonRejection>,
) -> AppResult<Reply<Tutorial>> {
    let Path(slug) = path?;
    let Json(payload) = payload?;
    let tutorial = state
        .tutorials
        .update(&slug, payload.validate()?)
        .await?
        .ok_or_else(|| AppError::not_found("Tutorial not found"))?;
    info!(%slug, by = %admin.id, "tutorial updated");
    Ok(Reply::ok("Tutorial updated", tutorial))
}

#[instrument(skip_all)]
pub async fn delete_tutorial(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<Reply<()>> {
    let Path(slug) = path?;
    if !state.tutorials.delete(&slug).await? {
        return Err(AppError::not_found("Tutorial not found"));
    }
    info!(%slug, by = %admin.id, "tutorial deleted");
    Ok(Reply::done("Tutorial deleted"))
}

#[instrument(skip_all)]
pub async fn follow_tutorial(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<Reply<Enrollment>> {
    let Path(slug) = path?;
    let tutorial = find_tutorial(&state, &slug).await?;
    let reply = match progress::follow(state.users.as_ref(), user.id, tutorial.id).await? {
        FollowOutcome::Followed(e) => Reply::created("Tutorial followed", e),
        FollowOutcome::AlreadyFollowing(e) => Reply::ok("Already following this tutorial", e),
    };
    Ok(reply)
}

#[instrument(skip_all)]
pub async fn complete_tutorial(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<Reply<Enrollment>> {
    let Path(slug) = path?;
    let tutorial = find_tutorial(&state, &slug).await?;
    let enrollment = progress::complete(state.users.as_ref(), user.id, tutorial.id).await?;
    Ok(Reply::ok("Tutorial completed", enrollment))
}

#[instrument(skip_all)]
pub async fn tutorial_completed(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<Reply<CompletedResponse>> {
    let Path(slug) = path?;
    let tutorial = find_tutorial(&state, &slug).await?;
    let completed = progress::is_completed(state.users.as_ref(), user.id, tutorial.id).await?;
    Ok(Reply::ok("Got completion", CompletedResponse { completed }))
}
