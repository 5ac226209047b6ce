use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        ChangePasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
        UpdateUserRequest,
    },
    repo_types::{EnrollmentView, User},
    services,
};
use crate::{
    auth::{
        cookie::{removal_cookie, session_cookie},
        jwt::JwtKeys,
        AdminUser, CurrentUser,
    },
    error::{AppError, AppResult},
    response::Reply,
    state::AppState,
    tutorials::progress,
};

/// Callers may act on their own account; admins on any.
fn ensure_self_or_admin(caller: &User, target: Uuid) -> AppResult<()> {
    if caller.id == target || caller.is_admin {
        Ok(())
    } else {
        warn!(caller = %caller.id, %target, "cross-account access refused");
        Err(AppError::not_allowed())
    }
}

#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<Reply<User>> {
    let Json(payload) = payload?;
    let user = services::register(&state, payload.validate()?).await?;
    Ok(Reply::created("User registered", user))
}

#[instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
) -> AppResult<Reply<Vec<User>>> {
    let users = state.users.list().await?;
    Ok(Reply::ok("Got users", users))
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    State(keys): State<JwtKeys>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Reply<User>> {
    let Json(payload) = payload?;
    let (user, session) =
        services::login(&state, &keys, &payload.email, &payload.password).await?;
    let cookie = session_cookie(&state.config.session, &session)?;
    Ok(Reply::ok("Logged in", user).headers(cookie))
}

#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> AppResult<Reply<()>> {
    let cookie = removal_cookie(&state.config.session)?;
    Ok(Reply::done("Logged out").headers(cookie))
}

#[instrument(skip_all)]
pub async fn current_user(CurrentUser(user): CurrentUser) -> AppResult<Reply<User>> {
    Ok(Reply::ok("Authenticated", user))
}

#[instrument(skip_all)]
pub async fn my_tutorials(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Reply<Vec<EnrollmentView>>> {
    let list = progress::list_for_user(state.users.as_ref(), user.id).await?;
    Ok(Reply::ok("Got tutorials", list))
}

#[instrument(skip_all)]
pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Reply<User>> {
    let Path(id) = path?;
    ensure_self_or_admin(&caller, id)?;
    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Reply::ok("Got user", user))
}

#[instrument(skip_all)]
pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> AppResult<Reply<User>> {
    let Path(id) = path?;
    let Json(payload) = payload?;
    ensure_self_or_admin(&caller, id)?;
    let user = state
        .users
        .update_names(id, payload.validate()?)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    info!(user_id = %id, "user updated");
    Ok(Reply::ok("User updated", user))
}

#[instrument(skip_all)]
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Reply<()>> {
    let Path(id) = path?;
    ensure_self_or_admin(&caller, id)?;
    if !state.users.delete(id).await? {
        return Err(AppError::not_found("User not found"));
    }
    info!(user_id = %id, by = %caller.id, "user deleted");
    Ok(Reply::done("User deleted"))
}

#[instrument(skip_all)]
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> AppResult<Reply<()>> {
    let Path(id) = path?;
    let Json(payload) = payload?;
    ensure_self_or_admin(&caller, id)?;
    payload.validate()?;
    services::change_password(&state, id, &payload.old_password, &payload.new_password).await?;
    Ok(Reply::done("Password changed"))
}

#[instrument(skip_all)]
pub async fn request_password_reset(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Reply<()>> {
    let Path(id) = path?;
    services::request_password_reset(&state, id).await?;
    Ok(Reply::with_status(
        axum::http::StatusCode::CREATED,
        "Password reset link sent",
        None,
    ))
}

#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    path: Result<Path<(Uuid, String)>, PathRejection>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> AppResult<Reply<()>> {
    let Path((id, token)) = path?;
    let Json(payload) = payload?;
    payload.validate()?;
    services::reset_password(&state, id, &token, &payload.new_password).await?;
    Ok(Reply::done("Password reset"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn user(is_admin: bool) -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            password_hash: String::new(),
            is_admin,
            enrollments: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn self_or_admin() {
        let me = user(false);
        let admin = user(true);
        assert!(ensure_self_or_admin(&me, me.id).is_ok());
        assert!(ensure_self_or_admin(&me, admin.id).is_err());
        assert!(ensure_self_or_admin(&admin, me.id).is_ok());
    }
}
