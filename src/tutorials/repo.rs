use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{NewTutorial, Tutorial, TutorialPatch};
use crate::store::{MemoryStore, PgStore, StoreError, StoreResult};

#[async_trait]
pub trait TutorialRepo: Send + Sync {
    /// Fails with `Duplicate("slug")` or `Duplicate("title")`; nothing is written.
    async fn create(&self, tutorial: NewTutorial) -> StoreResult<Tutorial>;
    async fn list(&self) -> StoreResult<Vec<Tutorial>>;
    async fn find_by_slug(&self, slug: &str) -> StoreResult<Option<Tutorial>>;
    async fn update(&self, slug: &str, patch: TutorialPatch) -> StoreResult<Option<Tutorial>>;
    /// Enrollments pointing at the tutorial are removed with it.
    async fn delete(&self, slug: &str) -> StoreResult<bool>;
}

const TUTORIAL_COLUMNS: &str = "id, slug, title, description, summary, content, technology, \
     hours_to_learn, is_premium, created_at, updated_at";

#[async_trait]
impl TutorialRepo for PgStore {
    async fn create(&self, t: NewTutorial) -> StoreResult<Tutorial> {
        let row = sqlx::query_as::<_, Tutorial>(&format!(
            r#"
            INSERT INTO tutorials
                (id, slug, title, description, summary, content, technology, hours_to_learn, is_premium)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {TUTORIAL_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&t.slug)
        .bind(&t.title)
        .bind(&t.description)
        .bind(&t.summary)
        .bind(&t.content)
        .bind(&t.technology)
        .bind(t.hours_to_learn)
        .bind(t.is_premium)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list(&self) -> StoreResult<Vec<Tutorial>> {
        let rows = sqlx::query_as::<_, Tutorial>(&format!(
            "SELECT {TUTORIAL_COLUMNS} FROM tutorials ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find_by_slug(&self, slug: &str) -> StoreResult<Option<Tutorial>> {
        let row = sqlx::query_as::<_, Tutorial>(&format!(
            "SELECT {TUTORIAL_COLUMNS} FROM tutorials WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update(&self, slug: &str, p: TutorialPatch) -> StoreResult<Option<Tutorial>> {
        let row = sqlx::query_as::<_, Tutorial>(&format!(
            r#"
            UPDATE tutorials SET
                slug           = COALESCE($2, slug),
                title          = COALESCE($3, title),
                description    = COALESCE($4, description),
                summary        = COALESCE($5, summary),
                content        = COALESCE($6, content),
                technology     = COALESCE($7, technology),
                hours_to_learn = COALESCE($8, hours_to_learn),
                is_premium     = COALESCE($9, is_premium),
                updated_at     = now()
            WHERE slug = $1
            RETURNING {TUTORIAL_COLUMNS}
            "#
        ))
        .bind(slug)
        .bind(&p.slug)
        .bind(&p.title)
        .bind(&p.description)
        .bind(&p.summary)
        .bind(&p.content)
        .bind(&p.technology)
        .bind(p.hours_to_learn)
        .bind(p.is_premium)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete(&self, slug: &str) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM tutorials WHERE slug = $1")
            .bind(slug)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

#[async_trait]
impl TutorialRepo for MemoryStore {
    async fn create(&self, t: NewTutorial) -> StoreResult<Tutorial> {
        let mut inner = self.lock();
        if inner.tutorials.values().any(|x| x.slug == t.slug) {
            return Err(StoreError::Duplicate("slug"));
        }
        if inner.tutorials.values().any(|x| x.title == t.title) {
            return Err(StoreError::Duplicate("title"));
        }
        let now = OffsetDateTime::now_utc();
        let row = Tutorial {
            id: Uuid::new_v4(),
            slug: t.slug,
            title: t.title,
            description: t.description,
            summary: t.summary,
            content: t.content,
            technology: t.technology,
            hours_to_learn: t.hours_to_learn,
            is_premium: t.is_premium,
            created_at: now,
            updated_at: now,
        };
        inner.tutorials.insert(row.id, row.clone());
        Ok(row)
    }

    async fn list(&self) -> StoreResult<Vec<Tutorial>> {
        let mut rows: Vec<Tutorial> = self.lock().tutorials.values().cloned().collect();
        rows.sort_by_key(|t| t.created_at);
        Ok(rows)
    }

    async fn find_by_slug(&self, slug: &str) -> StoreResult<Option<Tutorial>> {
        Ok(self.lock().tutorials.values().find(|t| t.slug == slug).cloned())
    }

    async fn update(&self, slug: &str, patch: TutorialPatch) -> StoreResult<Option<Tutorial>> {
        let mut inner = self.lock();
        let Some(id) = inner.tutorials.values().find(|t| t.slug == slug).map(|t| t.id) else {
            return Ok(None);
        };
        if let Some(v) = &patch.slug {
            if inner.tutorials.values().any(|t| t.id != id && &t.slug == v) {
                return Err(StoreError::Duplicate("slug"));
            }
        }
        if let Some(v) = &patch.title {
            if inner.tutorials.values().any(|t| t.id != id && &t.title == v) {
                return Err(StoreError::Duplicate("title"));
            }
        }
        let Some(row) = inner.tutorials.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply(row);
        row.updated_at = OffsetDateTime::now_utc();
        Ok(Some(row.clone()))
    }

    async fn delete(&self, slug: &str) -> StoreResult<bool> {
        let mut inner = self.lock();
        let Some(id) = inner.tutorials.values().find(|t| t.slug == slug).map(|t| t.id) else {
            return Ok(false);
        };
        inner.tutorials.remove(&id);
        for user in inner.users.values_mut() {
            user.enrollments.retain(|e| e.tutorial_id != id);
        }
        Ok(true)
    }
}
