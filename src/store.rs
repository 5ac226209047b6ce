use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    auth::repo_types::ResetToken, config::AppConfig, tutorials::repo_types::Tutorial,
    users::repo_types::User,
};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique field (email, slug, title) is already taken.
    #[error("{0} already exists")]
    Duplicate(&'static str),
    #[error(transparent)]
    Database(sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return match db.constraint() {
                    Some("users_email_key") => StoreError::Duplicate("email"),
                    Some("tutorials_slug_key") => StoreError::Duplicate("slug"),
                    Some("tutorials_title_key") => StoreError::Duplicate("title"),
                    _ => StoreError::Duplicate("value"),
                };
            }
        }
        StoreError::Database(e)
    }
}

/// Postgres-backed implementation of every repository trait.
#[derive(Clone)]
pub struct PgStore {
    pub(crate) pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(Duration::from_secs(config.database_acquire_timeout_secs))
            .connect(&config.database_url)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct MemoryInner {
    pub users: HashMap<Uuid, User>,
    pub tutorials: HashMap<Uuid, Tutorial>,
    pub reset_tokens: Vec<ResetToken>,
}

/// In-process store used by `AppState::fake()`.
///
/// Every repository call runs under one lock, which gives the same atomicity as
/// the conditional statements `PgStore` issues.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
