use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::ResetToken;
use crate::store::{MemoryStore, PgStore, StoreResult};

#[async_trait]
pub trait ResetTokenRepo: Send + Sync {
    async fn insert(&self, user_id: Uuid, token: &str) -> StoreResult<ResetToken>;
    /// Lookup scoped to the owning user.
    async fn find(&self, user_id: Uuid, token: &str) -> StoreResult<Option<ResetToken>>;
    /// Returns false when the token was already consumed.
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
impl ResetTokenRepo for PgStore {
    async fn insert(&self, user_id: Uuid, token: &str) -> StoreResult<ResetToken> {
        let row = sqlx::query_as::<_, ResetToken>(
            r#"
            INSERT INTO reset_tokens (id, user_id, token)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, token, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(token)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find(&self, user_id: Uuid, token: &str) -> StoreResult<Option<ResetToken>> {
        let row = sqlx::query_as::<_, ResetToken>(
            r#"
            SELECT id, user_id, token, created_at
            FROM reset_tokens
            WHERE user_id = $1 AND token = $2
            "#,
        )
        .bind(user_id)
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM reset_tokens WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

#[async_trait]
impl ResetTokenRepo for MemoryStore {
    async fn insert(&self, user_id: Uuid, token: &str) -> StoreResult<ResetToken> {
        let mut inner = self.lock();
        if !inner.users.contains_key(&user_id) {
            return Err(anyhow::anyhow!("reset token for unknown user {user_id}").into());
        }
        let row = ResetToken {
            id: Uuid::new_v4(),
            user_id,
            token: token.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        inner.reset_tokens.push(row.clone());
        Ok(row)
    }

    async fn find(&self, user_id: Uuid, token: &str) -> StoreResult<Option<ResetToken>> {
        Ok(self
            .lock()
            .reset_tokens
            .iter()
            .find(|t| t.user_id == user_id && t.token == token)
            .cloned())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let mut inner = self.lock();
        let before = inner.reset_tokens.len();
        inner.reset_tokens.retain(|t| t.id != id);
        Ok(inner.reset_tokens.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::{repo::UserRepo, repo_types::NewUser};

    async fn store_with_user() -> (MemoryStore, Uuid) {
        let store = MemoryStore::new();
        let user = UserRepo::create(
            &store,
            NewUser {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                email: "ada@example.com".into(),
                password: "password123".into(),
            },
        )
        .await
        .unwrap();
        (store, user.id)
    }

    #[tokio::test]
    async fn lookup_is_scoped_to_owner() {
        let (store, user_id) = store_with_user().await;
        ResetTokenRepo::insert(&store, user_id, "abc").await.unwrap();

        assert!(ResetTokenRepo::find(&store, user_id, "abc").await.unwrap().is_some());
        assert!(ResetTokenRepo::find(&store, Uuid::new_v4(), "abc").await.unwrap().is_none());
        assert!(ResetTokenRepo::find(&store, user_id, "other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_consumes_once() {
        let (store, user_id) = store_with_user().await;
        let row = ResetTokenRepo::insert(&store, user_id, "abc").await.unwrap();
        assert!(ResetTokenRepo::delete(&store, row.id).await.unwrap());
        assert!(!ResetTokenRepo::delete(&store, row.id).await.unwrap());
        assert!(ResetTokenRepo::find(&store, user_id, "abc").await.unwrap().is_none());
    }

    #[test]
    fn expiry_is_relative_to_creation() {
        let created_at = OffsetDateTime::now_utc();
        let row = ResetToken {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token: "t".into(),
            created_at,
        };
        let ttl = time::Duration::minutes(60);
        assert!(!row.is_expired(ttl, created_at + time::Duration::minutes(59)));
        assert!(row.is_expired(ttl, created_at + time::Duration::minutes(61)));
    }
}
