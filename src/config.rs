use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    /// Argon2 time cost. Fixed at startup so clients cannot downgrade it;
    /// already-stored hashes keep their own embedded parameters.
    pub hash_work_factor: u32,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is required")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is required")?,
            ttl_hours: std::env::var("JWT_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(24),
        };
        let hash_work_factor = std::env::var("HASH_WORK_FACTOR")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(2);
        let storage = StorageConfig {
            endpoint: std::env::var("MINIO_ENDPOINT").context("MINIO_ENDPOINT is required")?,
            bucket: std::env::var("MINIO_BUCKET").context("MINIO_BUCKET is required")?,
            access_key: std::env::var("MINIO_ACCESS_KEY")
                .context("MINIO_ACCESS_KEY is required")?,
            secret_key: std::env::var("MINIO_SECRET_KEY")
                .context("MINIO_SECRET_KEY is required")?,
        };
        Ok(Self {
            database_url,
            jwt,
            hash_work_factor,
            storage,
        })
    }
}
