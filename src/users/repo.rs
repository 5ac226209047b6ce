use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Enrollment, EnrollmentView, NewUser, User, UserNames};
use crate::{
    auth::password::hash_password,
    store::{MemoryStore, PgStore, StoreError, StoreResult},
};

/// Users and their embedded enrollments.
///
/// Writes that carry a password take the plaintext and hash it here, so a
/// stored password is always a hash no matter which caller changed it.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create(&self, user: NewUser) -> StoreResult<User>;
    async fn list(&self) -> StoreResult<Vec<User>>;
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn update_names(&self, id: Uuid, names: UserNames) -> StoreResult<Option<User>>;
    async fn set_password(&self, id: Uuid, plain: &str) -> StoreResult<bool>;
    async fn set_admin(&self, id: Uuid, is_admin: bool) -> StoreResult<bool>;
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;

    /// Inserts the enrollment only if the pair is absent; `None` means it
    /// already existed and nothing was written.
    async fn add_enrollment(
        &self,
        user_id: Uuid,
        tutorial_id: Uuid,
        started_at: OffsetDateTime,
    ) -> StoreResult<Option<Enrollment>>;
    async fn find_enrollment(&self, user_id: Uuid, tutorial_id: Uuid) -> StoreResult<Option<Enrollment>>;
    /// `None` when the user does not follow the tutorial.
    async fn complete_enrollment(&self, user_id: Uuid, tutorial_id: Uuid) -> StoreResult<Option<Enrollment>>;
    /// Most recently started first.
    async fn list_enrollments(&self, user_id: Uuid) -> StoreResult<Vec<EnrollmentView>>;
}

const USER_COLUMNS: &str =
    "id, first_name, last_name, email, password_hash, is_admin, created_at, updated_at";

impl PgStore {
    async fn load_enrollments(&self, user: &mut User) -> StoreResult<()> {
        user.enrollments = sqlx::query_as::<_, Enrollment>(
            r#"
            SELECT tutorial_id, started_at, is_completed
            FROM enrollments
            WHERE user_id = $1
            ORDER BY started_at ASC
            "#,
        )
        .bind(user.id)
        .fetch_all(&self.pool)
        .await?;
        Ok(())
    }

    async fn with_enrollments(&self, user: Option<User>) -> StoreResult<Option<User>> {
        match user {
            Some(mut user) => {
                self.load_enrollments(&mut user).await?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl UserRepo for PgStore {
    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let password_hash = hash_password(&user.password)?;
        let row = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, first_name, last_name, email, password_hash, is_admin)
            VALUES ($1, $2, $3, $4, $5, FALSE)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        let mut users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
        let rows = sqlx::query_as::<_, (Uuid, Uuid, OffsetDateTime, bool)>(
            r#"
            SELECT user_id, tutorial_id, started_at, is_completed
            FROM enrollments
            WHERE user_id = ANY($1)
            ORDER BY started_at ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_user: HashMap<Uuid, Vec<Enrollment>> = HashMap::new();
        for (user_id, tutorial_id, started_at, is_completed) in rows {
            by_user.entry(user_id).or_default().push(Enrollment {
                tutorial_id,
                started_at,
                is_completed,
            });
        }
        for user in &mut users {
            user.enrollments = by_user.remove(&user.id).unwrap_or_default();
        }
        Ok(users)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        self.with_enrollments(user).await
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        self.with_enrollments(user).await
    }

    async fn update_names(&self, id: Uuid, names: UserNames) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET first_name = $2, last_name = $3, updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&names.first_name)
        .bind(&names.last_name)
        .fetch_optional(&self.pool)
        .await?;
        self.with_enrollments(user).await
    }

    async fn set_password(&self, id: Uuid, plain: &str) -> StoreResult<bool> {
        let password_hash = hash_password(plain)?;
        let res = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(&password_hash)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn set_admin(&self, id: Uuid, is_admin: bool) -> StoreResult<bool> {
        let res = sqlx::query("UPDATE users SET is_admin = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(is_admin)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        // enrollments and reset tokens cascade
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn add_enrollment(
        &self,
        user_id: Uuid,
        tutorial_id: Uuid,
        started_at: OffsetDateTime,
    ) -> StoreResult<Option<Enrollment>> {
        let row = sqlx::query_as::<_, Enrollment>(
            r#"
            INSERT INTO enrollments (user_id, tutorial_id, started_at, is_completed)
            VALUES ($1, $2, $3, FALSE)
            ON CONFLICT (user_id, tutorial_id) DO NOTHING
            RETURNING tutorial_id, started_at, is_completed
            "#,
        )
        .bind(user_id)
        .bind(tutorial_id)
        .bind(started_at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_enrollment(&self, user_id: Uuid, tutorial_id: Uuid) -> StoreResult<Option<Enrollment>> {
        let row = sqlx::query_as::<_, Enrollment>(
            r#"
            SELECT tutorial_id, started_at, is_completed
            FROM enrollments
            WHERE user_id = $1 AND tutorial_id = $2
            "#,
        )
        .bind(user_id)
        .bind(tutorial_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn complete_enrollment(&self, user_id: Uuid, tutorial_id: Uuid) -> StoreResult<Option<Enrollment>> {
        let row = sqlx::query_as::<_, Enrollment>(
            r#"
            UPDATE enrollments
            SET is_completed = TRUE
            WHERE user_id = $1 AND tutorial_id = $2
            RETURNING tutorial_id, started_at, is_completed
            "#,
        )
        .bind(user_id)
        .bind(tutorial_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_enrollments(&self, user_id: Uuid) -> StoreResult<Vec<EnrollmentView>> {
        let rows = sqlx::query_as::<_, EnrollmentView>(
            r#"
            SELECT e.tutorial_id, t.title, t.slug, t.technology, e.started_at, e.is_completed
            FROM enrollments e
            JOIN tutorials t ON t.id = e.tutorial_id
            WHERE e.user_id = $1
            ORDER BY e.started_at DESC, t.title ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let password_hash = hash_password(&user.password)?;
        let mut inner = self.lock();
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email"));
        }
        let now = OffsetDateTime::now_utc();
        let row = User {
            id: Uuid::new_v4(),
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            password_hash,
            is_admin: false,
            enrollments: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.lock().users.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.lock().users.values().find(|u| u.email == email).cloned())
    }

    async fn update_names(&self, id: Uuid, names: UserNames) -> StoreResult<Option<User>> {
        let mut inner = self.lock();
        Ok(inner.users.get_mut(&id).map(|u| {
            u.first_name = names.first_name;
            u.last_name = names.last_name;
            u.updated_at = OffsetDateTime::now_utc();
            u.clone()
        }))
    }

    async fn set_password(&self, id: Uuid, plain: &str) -> StoreResult<bool> {
        let password_hash = hash_password(plain)?;
        let mut inner = self.lock();
        Ok(inner
            .users
            .get_mut(&id)
            .map(|u| {
                u.password_hash = password_hash;
                u.updated_at = OffsetDateTime::now_utc();
            })
            .is_some())
    }

    async fn set_admin(&self, id: Uuid, is_admin: bool) -> StoreResult<bool> {
        let mut inner = self.lock();
        Ok(inner
            .users
            .get_mut(&id)
            .map(|u| {
                u.is_admin = is_admin;
                u.updated_at = OffsetDateTime::now_utc();
            })
            .is_some())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let mut inner = self.lock();
        inner.reset_tokens.retain(|t| t.user_id != id);
        Ok(inner.users.remove(&id).is_some())
    }

    async fn add_enrollment(
        &self,
        user_id: Uuid,
        tutorial_id: Uuid,
        started_at: OffsetDateTime,
    ) -> StoreResult<Option<Enrollment>> {
        let mut inner = self.lock();
        if !inner.tutorials.contains_key(&tutorial_id) {
            return Err(anyhow::anyhow!("enrollment for unknown tutorial {tutorial_id}").into());
        }
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or_else(|| anyhow::anyhow!("enrollment for unknown user {user_id}"))?;
        if user.is_following(tutorial_id) {
            return Ok(None);
        }
        let enrollment = Enrollment {
            tutorial_id,
            started_at,
            is_completed: false,
        };
        user.enrollments.push(enrollment.clone());
        Ok(Some(enrollment))
    }

    async fn find_enrollment(&self, user_id: Uuid, tutorial_id: Uuid) -> StoreResult<Option<Enrollment>> {
        Ok(self
            .lock()
            .users
            .get(&user_id)
            .and_then(|u| u.enrollment(tutorial_id).cloned()))
    }

    async fn complete_enrollment(&self, user_id: Uuid, tutorial_id: Uuid) -> StoreResult<Option<Enrollment>> {
        let mut inner = self.lock();
        Ok(inner
            .users
            .get_mut(&user_id)
            .and_then(|u| u.enrollments.iter_mut().find(|e| e.tutorial_id == tutorial_id))
            .map(|e| {
                e.is_completed = true;
                e.clone()
            }))
    }

    async fn list_enrollments(&self, user_id: Uuid) -> StoreResult<Vec<EnrollmentView>> {
        let inner = self.lock();
        let Some(user) = inner.users.get(&user_id) else {
            return Ok(Vec::new());
        };
        let mut views: Vec<EnrollmentView> = user
            .enrollments
            .iter()
            .filter_map(|e| {
                inner.tutorials.get(&e.tutorial_id).map(|t| EnrollmentView {
                    tutorial_id: e.tutorial_id,
                    title: t.title.clone(),
                    slug: t.slug.clone(),
                    technology: t.technology.clone(),
                    started_at: e.started_at,
                    is_completed: e.is_completed,
                })
            })
            .collect();
        views.sort_by(|a, b| b.started_at.cmp(&a.started_at).then_with(|| a.title.cmp(&b.title)));
        Ok(views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            first_name: "Alan".into(),
            last_name: "Turing".into(),
            email: email.into(),
            password: "password123".into(),
        }
    }

    #[tokio::test]
    async fn create_stores_a_hash_not_the_plaintext() {
        let store = MemoryStore::new();
        let user = UserRepo::create(&store, new_user("alan@example.com")).await.unwrap();
        assert_ne!(user.password_hash, "password123");
        assert!(verify_password("password123", &user.password_hash).unwrap());
        assert!(!user.is_admin);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        UserRepo::create(&store, new_user("alan@example.com")).await.unwrap();
        let err = UserRepo::create(&store, new_user("alan@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("email")));
    }

    #[tokio::test]
    async fn set_password_rehashes() {
        let store = MemoryStore::new();
        let user = UserRepo::create(&store, new_user("alan@example.com")).await.unwrap();
        assert!(store.set_password(user.id, "another-secret").await.unwrap());
        let user = store.find_by_id(user.id).await.unwrap().unwrap();
        assert!(verify_password("another-secret", &user.password_hash).unwrap());
        assert!(!verify_password("password123", &user.password_hash).unwrap());
    }

    #[tokio::test]
    async fn update_names_leaves_password_alone() {
        let store = MemoryStore::new();
        let user = UserRepo::create(&store, new_user("alan@example.com")).await.unwrap();
        let updated = store
            .update_names(
                user.id,
                UserNames {
                    first_name: "Alonzo".into(),
                    last_name: "Church".into(),
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.first_name, "Alonzo");
        assert_eq!(updated.password_hash, user.password_hash);
    }

    #[tokio::test]
    async fn delete_is_hard() {
        let store = MemoryStore::new();
        let user = UserRepo::create(&store, new_user("alan@example.com")).await.unwrap();
        assert!(UserRepo::delete(&store, user.id).await.unwrap());
        assert!(store.find_by_id(user.id).await.unwrap().is_none());
        assert!(!UserRepo::delete(&store, user.id).await.unwrap());
    }
}
