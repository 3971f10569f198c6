pub mod csv;
pub mod file;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;

use crate::config::{Config, StorageBackend};
use crate::models::{NewResponse, ResponseRecord};

pub use file::{FileCredentialStore, FileResponseStore};
pub use postgres::{PgCredentialStore, PgResponseStore};

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Database(sqlx::Error),
    Migration(sqlx::migrate::MigrateError),
    Corrupt(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "I/O error: {err}"),
            StorageError::Database(err) => write!(f, "Database error: {err}"),
            StorageError::Migration(err) => write!(f, "Migration error: {err}"),
            StorageError::Corrupt(msg) => write!(f, "Corrupt data: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err)
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::Database(err)
    }
}

impl From<sqlx::migrate::MigrateError> for StorageError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StorageError::Migration(err)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Corrupt(err.to_string())
    }
}

/// Append-only store of survey responses.
///
/// Implementations must return identical `list_all` results for the same
/// sequence of `append` calls.
#[async_trait]
pub trait ResponseStore: Send + Sync {
    fn kind(&self) -> &'static str;

    /// Prepare the medium. Called once at startup; must be idempotent.
    async fn init(&self) -> Result<(), StorageError>;

    /// Store a new response under a fresh, never reused id.
    async fn append(&self, response: &NewResponse) -> Result<ResponseRecord, StorageError>;

    /// Every stored response in insertion order. Empty when nothing was stored yet.
    async fn list_all(&self) -> Result<Vec<ResponseRecord>, StorageError>;
}

/// Read-only lookup of pre-provisioned login credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Argon2 PHC hash for `user`, if the user exists.
    async fn password_hash(&self, user: &str) -> Result<Option<String>, StorageError>;
}

pub struct Stores {
    pub responses: Arc<dyn ResponseStore>,
    pub credentials: Arc<dyn CredentialStore>,
}

/// Build and initialize the backend selected by the configuration.
pub async fn open(config: &Config) -> Result<Stores, StorageError> {
    let stores = match config.storage {
        StorageBackend::File => Stores {
            responses: Arc::new(FileResponseStore::new(&config.responses_file)),
            credentials: Arc::new(FileCredentialStore::new(&config.users_file)),
        },
        StorageBackend::Postgres { ref database_url } => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await?;
            Stores {
                responses: Arc::new(PgResponseStore::new(pool.clone())),
                credentials: Arc::new(PgCredentialStore::new(pool)),
            }
        }
    };

    stores.responses.init().await?;
    tracing::info!("Storage backend ready: {}", stores.responses.kind());

    Ok(stores)
}
