use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::auth::password::CredentialHasher;
use crate::config::AppConfig;
use crate::storage::{ObjectStore, Storage};
use crate::users::repo::{PgUserDirectory, UserDirectory};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub hasher: CredentialHasher,
    pub users: Arc<dyn UserDirectory>,
    pub storage: Arc<dyn ObjectStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .context("run migrations")?;

        let hasher = CredentialHasher::new(config.hash_work_factor)?;

        let storage = Arc::new(
            Storage::new(
                &config.storage.endpoint,
                &config.storage.bucket,
                &config.storage.access_key,
                &config.storage.secret_key,
                "us-east-1",
            )
            .await?,
        ) as Arc<dyn ObjectStore>;

        Ok(Self {
            config,
            hasher,
            users: Arc::new(PgUserDirectory::new(db)),
            storage,
        })
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        hasher: CredentialHasher,
        users: Arc<dyn UserDirectory>,
        storage: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            config,
            hasher,
            users,
            storage,
        }
    }
}
