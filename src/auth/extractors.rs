use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use thiserror::Error;
use tracing::warn;

use super::{cookie::read_token, jwt::JwtKeys};
use crate::{
    error::AppError,
    state::AppState,
    users::{repo::UserRepo, repo_types::User},
};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No session token")]
    NoToken,
    #[error("Invalid or expired session token")]
    InvalidToken,
    #[error("Unknown user")]
    UserNotFound,
    #[error("Not allowed")]
    Forbidden,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Resolves a session token to the full user record.
pub async fn authenticate(
    keys: &JwtKeys,
    users: &dyn UserRepo,
    token: Option<&str>,
) -> Result<User, AuthError> {
    let token = token.ok_or(AuthError::NoToken)?;
    let claims = keys.verify(token).map_err(|e| {
        warn!(error = %e, "session token rejected");
        AuthError::InvalidToken
    })?;
    users
        .find_by_id(claims.sub)
        .await
        .map_err(|e| AuthError::Internal(e.into()))?
        .ok_or(AuthError::UserNotFound)
}

/// Fails closed: anything but an explicit admin flag is rejected.
pub fn require_admin(user: &User) -> Result<(), AuthError> {
    if user.is_admin {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

/// The authenticated caller, enrollments included.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = read_token(&parts.headers, &state.config.session.cookie_name);
        let user = authenticate(&state.keys, state.users.as_ref(), token.as_deref())
            .await
            .map_err(|e| {
                warn!(reason = %e, "unauthenticated request");
                e
            })?;
        Ok(CurrentUser(user))
    }
}

/// An authenticated caller that passed `require_admin`.
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        require_admin(&user).map_err(|e| {
            warn!(user_id = %user.id, "admin route refused");
            e
        })?;
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, store::MemoryStore, users::repo_types::NewUser};
    use uuid::Uuid;

    async fn setup() -> (JwtKeys, MemoryStore, User) {
        let keys = JwtKeys::from_config(&AppConfig::for_tests());
        let store = MemoryStore::new();
        let user = store
            .create(NewUser {
                first_name: "Grace".into(),
                last_name: "Hopper".into(),
                email: "grace@example.com".into(),
                password: "password123".into(),
            })
            .await
            .unwrap();
        (keys, store, user)
    }

    #[tokio::test]
    async fn missing_token_is_no_token() {
        let (keys, store, _) = setup().await;
        let err = authenticate(&keys, &store, None).await.unwrap_err();
        assert!(matches!(err, AuthError::NoToken));
    }

    #[tokio::test]
    async fn garbage_token_is_invalid() {
        let (keys, store, _) = setup().await;
        let err = authenticate(&keys, &store, Some("not-a-jwt")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn token_for_deleted_user_is_user_not_found() {
        let (keys, store, _) = setup().await;
        let signed = keys.sign(Uuid::new_v4()).unwrap();
        let err = authenticate(&keys, &store, Some(&signed.token)).await.unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));
    }

    #[tokio::test]
    async fn valid_token_resolves_user() {
        let (keys, store, user) = setup().await;
        let signed = keys.sign(user.id).unwrap();
        let resolved = authenticate(&keys, &store, Some(&signed.token)).await.unwrap();
        assert_eq!(resolved.id, user.id);
        assert!(!resolved.is_admin);
    }

    #[tokio::test]
    async fn require_admin_rejects_non_admins() {
        let (_, store, mut user) = setup().await;
        assert!(matches!(require_admin(&user), Err(AuthError::Forbidden)));

        store.set_admin(user.id, true).await.unwrap();
        user = store.find_by_id(user.id).await.unwrap().unwrap();
        assert!(require_admin(&user).is_ok());
    }
}
