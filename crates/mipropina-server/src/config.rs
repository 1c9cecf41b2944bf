//! Server configuration.
//!
//! Every setting has a default suitable for local development and can be
//! overridden through a `MIPROPINA_*` environment variable. A `.env` file
//! is honoured when present.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use mipropina_db::{DbConfig, StorageConfig};
use mipropina_identity::{IdentityConfig, SessionAlgorithm};

/// Default request body cap for uploads (5 MiB).
const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub db: DbConfig,
    pub identity: IdentityConfig,
    pub storage: StorageConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            db: DbConfig::default(),
            identity: IdentityConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup. Blank values are
    /// treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match var("MIPROPINA_PORT") {
            Some(raw) => raw.trim().parse().context("Invalid MIPROPINA_PORT")?,
            None => defaults.port,
        };
        let max_upload_bytes = match var("MIPROPINA_MAX_UPLOAD_BYTES") {
            Some(raw) => raw
                .trim()
                .parse()
                .context("Invalid MIPROPINA_MAX_UPLOAD_BYTES")?,
            None => defaults.max_upload_bytes,
        };
        let webhook_tolerance_secs = match var("MIPROPINA_WEBHOOK_TOLERANCE_SECS") {
            Some(raw) => raw
                .trim()
                .parse()
                .context("Invalid MIPROPINA_WEBHOOK_TOLERANCE_SECS")?,
            None => defaults.identity.webhook_tolerance_secs,
        };

        let session_algorithm: SessionAlgorithm = match var("MIPROPINA_SESSION_ALGORITHM") {
            Some(raw) => raw.parse().context("Invalid MIPROPINA_SESSION_ALGORITHM")?,
            None => defaults.identity.session_algorithm,
        };

        let db = DbConfig {
            url: var("MIPROPINA_DB_URL").unwrap_or(defaults.db.url),
            namespace: var("MIPROPINA_DB_NAMESPACE").unwrap_or(defaults.db.namespace),
            database: var("MIPROPINA_DB_DATABASE").unwrap_or(defaults.db.database),
            username: var("MIPROPINA_DB_USER").or(defaults.db.username),
            password: var("MIPROPINA_DB_PASSWORD").or(defaults.db.password),
        };

        let identity = IdentityConfig {
            // PEM keys passed through env files often have escaped newlines.
            session_public_key_pem: var("MIPROPINA_SESSION_PUBLIC_KEY")
                .map(|pem| pem.replace("\\n", "\n"))
                .unwrap_or_default(),
            session_algorithm,
            session_issuer: var("MIPROPINA_SESSION_ISSUER")
                .unwrap_or(defaults.identity.session_issuer),
            api_base_url: var("MIPROPINA_IDENTITY_API_URL")
                .unwrap_or(defaults.identity.api_base_url),
            api_secret_key: var("MIPROPINA_IDENTITY_SECRET_KEY"),
            webhook_secret: var("MIPROPINA_WEBHOOK_SECRET"),
            webhook_tolerance_secs,
            ..defaults.identity
        };

        let storage = StorageConfig {
            root: var("MIPROPINA_ASSETS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage.root),
            public_base_url: var("MIPROPINA_ASSETS_BASE_URL")
                .unwrap_or(defaults.storage.public_base_url),
            bucket: var("MIPROPINA_ASSETS_BUCKET").unwrap_or(defaults.storage.bucket),
            prefix: var("MIPROPINA_ASSETS_PREFIX").unwrap_or(defaults.storage.prefix),
        };

        let config = Self {
            host: var("MIPROPINA_HOST").unwrap_or(defaults.host),
            port,
            max_upload_bytes,
            db,
            identity,
            storage,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("MIPROPINA_PORT must be greater than 0");
        }
        if self.identity.session_public_key_pem.trim().is_empty() {
            anyhow::bail!("MIPROPINA_SESSION_PUBLIC_KEY is required");
        }
        if self.storage.bucket.contains('/') {
            anyhow::bail!("MIPROPINA_ASSETS_BUCKET must be a single path segment");
        }
        Ok(())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
