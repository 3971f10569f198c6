use async_trait::async_trait;
use sqlx::PgPool;

use super::{CredentialStore, ResponseStore, StorageError};
use crate::models::{Answers, NewResponse, ResponseRecord};

const SCHEMA: &str = include_str!("../../migrations/0001_create_survey_tables.sql");

/// SQLSTATE for "relation does not exist".
const UNDEFINED_TABLE: &str = "42P01";

/// Responses kept in `survey_responses`, answers serialized into one JSON text column.
pub struct PgResponseStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct ResponseRow {
    id: i64,
    name: Option<String>,
    date: Option<String>,
    answers: String,
    comment: String,
}

impl TryFrom<ResponseRow> for ResponseRecord {
    type Error = StorageError;

    fn try_from(row: ResponseRow) -> Result<Self, Self::Error> {
        let answers: Answers = serde_json::from_str(&row.answers).map_err(|e| {
            StorageError::Corrupt(format!("answers of response {}: {e}", row.id))
        })?;

        Ok(ResponseRecord {
            id: row.id,
            name: row.name,
            date: row.date,
            answers,
            comment: row.comment,
        })
    }
}

impl PgResponseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, record: &ResponseRecord, answers: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO survey_responses (name, date, answers, comment)
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&record.name)
        .bind(&record.date)
        .bind(answers)
        .bind(&record.comment)
        .fetch_one(&self.pool)
        .await
    }
}

fn is_undefined_table(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|e| e.code())
        .is_some_and(|code| code == UNDEFINED_TABLE)
}

#[async_trait]
impl ResponseStore for PgResponseStore {
    fn kind(&self) -> &'static str {
        "postgres"
    }

    async fn init(&self) -> Result<(), StorageError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn append(&self, response: &NewResponse) -> Result<ResponseRecord, StorageError> {
        let record = ResponseRecord::from_new(0, response);
        let serialized = serde_json::to_string(&record.answers)?;

        let id = match self.insert(&record, &serialized).await {
            // The migration history may already list the table, so recreate it directly.
            Err(e) if is_undefined_table(&e) => {
                tracing::warn!("survey_responses missing, creating it");
                sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
                self.insert(&record, &serialized).await?
            }
            other => other?,
        };

        Ok(ResponseRecord { id, ..record })
    }

    async fn list_all(&self) -> Result<Vec<ResponseRecord>, StorageError> {
        let rows = sqlx::query_as::<_, ResponseRow>(
            "SELECT id, name, date, answers, comment FROM survey_responses ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await;

        match rows {
            Ok(rows) => rows.into_iter().map(ResponseRecord::try_from).collect(),
            Err(e) if is_undefined_table(&e) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn password_hash(&self, user: &str) -> Result<Option<String>, StorageError> {
        let hash = sqlx::query_scalar::<_, String>(
            "SELECT password_hash FROM survey_users WHERE username = $1",
        )
        .bind(user)
        .fetch_optional(&self.pool)
        .await;

        match hash {
            Ok(hash) => Ok(hash),
            Err(e) if is_undefined_table(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
