use time::{Duration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{is_valid_email, normalize_email},
    repo_types::{NewUser, User},
};
use crate::{
    auth::{
        jwt::{JwtKeys, SessionToken},
        password::{issue_reset_token, verify_password},
    },
    error::{AppError, AppResult},
    state::AppState,
};

fn wrong_input() -> AppError {
    AppError::validation("Wrong input")
}

pub async fn register(state: &AppState, new_user: NewUser) -> AppResult<User> {
    // The unique index settles races; this only gives the common case a clean answer.
    if state.users.find_by_email(&new_user.email).await?.is_some() {
        warn!(email = %new_user.email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }
    let user = state.users.create(new_user).await?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Unknown email and wrong password fail the same way.
pub async fn login(
    state: &AppState,
    keys: &JwtKeys,
    email: &str,
    password: &str,
) -> AppResult<(User, SessionToken)> {
    let email = normalize_email(email);
    if !is_valid_email(&email) || password.is_empty() {
        return Err(wrong_input());
    }

    let Some(user) = state.users.find_by_email(&email).await? else {
        warn!(%email, "login unknown email");
        return Err(wrong_input());
    };
    if !verify_password(password, &user.password_hash)? {
        warn!(%email, user_id = %user.id, "login invalid password");
        return Err(wrong_input());
    }

    let session = keys.sign(user.id)?;
    info!(user_id = %user.id, %email, "user logged in");
    Ok((user, session))
}

pub async fn change_password(
    state: &AppState,
    user_id: Uuid,
    old_password: &str,
    new_password: &str,
) -> AppResult<()> {
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    if !verify_password(old_password, &user.password_hash)? {
        warn!(%user_id, "change password with wrong old password");
        return Err(wrong_input());
    }
    state.users.set_password(user_id, new_password).await?;
    info!(%user_id, "password changed");
    Ok(())
}

/// Issues a reset token and mails the link. Delivery failure is logged, not returned.
pub async fn request_password_reset(state: &AppState, user_id: Uuid) -> AppResult<()> {
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let token = state
        .reset_tokens
        .insert(user.id, &issue_reset_token())
        .await?;
    let link = format!(
        "{}/users/{}/reset-password/{}",
        state.config.base_url.trim_end_matches('/'),
        user.id,
        token.token
    );

    if let Err(e) = state
        .mailer
        .send(&user.email, "Password reset", &format!("Follow this url : {link}"))
        .await
    {
        warn!(error = %e, user_id = %user.id, "password reset mail not delivered");
    }
    info!(user_id = %user.id, "password reset requested");
    Ok(())
}

/// No check that the new password differs from the old one on this path.
pub async fn reset_password(
    state: &AppState,
    user_id: Uuid,
    token: &str,
    new_password: &str,
) -> AppResult<()> {
    let Some(reset) = state.reset_tokens.find(user_id, token).await? else {
        warn!(%user_id, "reset with unknown token");
        return Err(AppError::ResetTokenInvalid);
    };
    let ttl = Duration::minutes(state.config.reset_token_ttl_minutes);
    if reset.is_expired(ttl, OffsetDateTime::now_utc()) {
        warn!(%user_id, "reset with expired token");
        state.reset_tokens.delete(reset.id).await?;
        return Err(AppError::ResetTokenInvalid);
    }
    // The token is consumed only once the new password is stored.
    if !state.users.set_password(user_id, new_password).await? {
        return Err(AppError::not_found("User not found"));
    }
    state.reset_tokens.delete(reset.id).await?;
    info!(%user_id, "password reset");
    Ok(())
}
