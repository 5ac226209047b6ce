use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Tutorial record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Tutorial {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub summary: Vec<String>,
    pub content: String,
    pub technology: String,
    pub hours_to_learn: i32,
    pub is_premium: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Everything but the body; readable without following.
#[derive(Debug, Clone, Serialize)]
pub struct TutorialPreview {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub summary: Vec<String>,
    pub technology: String,
    pub hours_to_learn: i32,
    pub is_premium: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Tutorial> for TutorialPreview {
    fn from(t: Tutorial) -> Self {
        Self {
            id: t.id,
            slug: t.slug,
            title: t.title,
            description: t.description,
            summary: t.summary,
            technology: t.technology,
            hours_to_learn: t.hours_to_learn,
            is_premium: t.is_premium,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewTutorial {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub summary: Vec<String>,
    pub content: String,
    pub technology: String,
    pub hours_to_learn: i32,
    pub is_premium: bool,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct TutorialPatch {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub summary: Option<Vec<String>>,
    pub content: Option<String>,
    pub technology: Option<String>,
    pub hours_to_learn: Option<i32>,
    pub is_premium: Option<bool>,
}

impl TutorialPatch {
    pub fn apply(self, t: &mut Tutorial) {
        if let Some(v) = self.slug {
            t.slug = v;
        }
        if let Some(v) = self.title {
            t.title = v;
        }
        if let Some(v) = self.description {
            t.description = v;
        }
        if let Some(v) = self.summary {
            t.summary = v;
        }
        if let Some(v) = self.content {
            t.content = v;
        }
        if let Some(v) = self.technology {
            t.technology = v;
        }
        if let Some(v) = self.hours_to_learn {
            t.hours_to_learn = v;
        }
        if let Some(v) = self.is_premium {
            t.is_premium = v;
        }
    }
}
