use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use crate::{
    auth::{jwt::JwtKeys, repo::ResetTokenRepo},
    config::{AdminSeed, AppConfig},
    mail::{LogMailer, Mailer, SmtpMailer},
    store::{MemoryStore, PgStore},
    tutorials::repo::TutorialRepo,
    users::{repo::UserRepo, repo_types::NewUser},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub keys: JwtKeys,
    pub users: Arc<dyn UserRepo>,
    pub tutorials: Arc<dyn TutorialRepo>,
    pub reset_tokens: Arc<dyn ResetTokenRepo>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Production wiring: Postgres, migrations, SMTP if configured, admin seed.
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let store = Arc::new(PgStore::connect(&config).await?);
        store.migrate().await?;

        let mailer: Arc<dyn Mailer> = match &config.smtp {
            Some(smtp) => Arc::new(SmtpMailer::new(smtp).context("configure SMTP")?),
            None => {
                warn!("SMTP_HOST not set; outgoing mail will only be logged");
                Arc::new(LogMailer::new())
            }
        };

        let state = Self::from_parts(config, store.clone(), store.clone(), store, mailer);
        if let Some(seed) = state.config.admin.clone() {
            state.seed_admin(&seed).await?;
        }
        Ok(state)
    }

    pub fn from_parts(
        config: AppConfig,
        users: Arc<dyn UserRepo>,
        tutorials: Arc<dyn TutorialRepo>,
        reset_tokens: Arc<dyn ResetTokenRepo>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let keys = JwtKeys::from_config(&config);
        Self {
            config: Arc::new(config),
            keys,
            users,
            tutorials,
            reset_tokens,
            mailer,
        }
    }

    /// In-memory state for tests; the mailer is returned so tests can read it.
    pub fn fake() -> (Self, Arc<LogMailer>) {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(LogMailer::new());
        let state = Self::from_parts(
            AppConfig::for_tests(),
            store.clone(),
            store.clone(),
            store,
            mailer.clone(),
        );
        (state, mailer)
    }

    /// Creates the configured admin account if missing and makes sure it is admin.
    pub async fn seed_admin(&self, seed: &AdminSeed) -> anyhow::Result<()> {
        let email = seed.email.trim().to_lowercase();
        let user = match self.users.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                let user = self
                    .users
                    .create(NewUser {
                        first_name: "Admin".into(),
                        last_name: "Admin".into(),
                        email: email.clone(),
                        password: seed.password.clone(),
                    })
                    .await?;
                info!(user_id = %user.id, %email, "admin account created");
                user
            }
        };
        if !user.is_admin {
            self.users.set_admin(user.id, true).await?;
            info!(user_id = %user.id, %email, "admin flag granted");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seed_admin_creates_then_promotes_idempotently() {
        let (state, _) = AppState::fake();
        let seed = AdminSeed {
            email: "Root@Example.com".into(),
            password: "administrator".into(),
        };
        state.seed_admin(&seed).await.unwrap();
        state.seed_admin(&seed).await.unwrap();

        let users = state.users.list().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email, "root@example.com");
        assert!(users[0].is_admin);
    }
}
