use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use indexmap::IndexSet;
use tokio::sync::Mutex;

use super::csv::{self, Cell};
use super::{CredentialStore, ResponseStore, StorageError};
use crate::models::response::RESERVED_COLUMNS;
use crate::models::{Answer, Answers, NewResponse, ResponseRecord};

/// Responses kept as one wide CSV file: the reserved columns followed by one
/// column per question key ever seen, in first-seen order.
///
/// Records are only ever added, but a new question key widens the header and
/// every earlier row with it, so each append rewrites the whole file.
pub struct FileResponseStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

#[derive(Default)]
struct Table {
    questions: IndexSet<String>,
    records: Vec<ResponseRecord>,
}

impl FileResponseStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    async fn read_table(&self) -> Result<Table, StorageError> {
        let Some(text) = read_optional(&self.path).await? else {
            return Ok(Table::default());
        };

        let mut rows = csv::parse(&text)
            .map_err(|e| StorageError::Corrupt(format!("{}: {e}", self.path.display())))?
            .into_iter();

        let Some(header) = rows.next() else {
            return Ok(Table::default());
        };
        let columns: Vec<String> = header
            .iter()
            .map(|cell| cell.text().unwrap_or_default().to_string())
            .collect();
        if columns.len() < RESERVED_COLUMNS.len()
            || columns[..RESERVED_COLUMNS.len()] != RESERVED_COLUMNS
        {
            return Err(StorageError::Corrupt(format!(
                "{}: unexpected header {columns:?}",
                self.path.display()
            )));
        }
        let questions: IndexSet<String> =
            columns[RESERVED_COLUMNS.len()..].iter().cloned().collect();
        if questions.len() + RESERVED_COLUMNS.len() != columns.len() {
            return Err(StorageError::Corrupt(format!(
                "{}: duplicate column in header {columns:?}",
                self.path.display()
            )));
        }

        let records = rows
            .enumerate()
            .map(|(index, row)| {
                if row.len() != columns.len() {
                    return Err(StorageError::Corrupt(format!(
                        "{}: row {} has {} cells, expected {}",
                        self.path.display(),
                        index + 2,
                        row.len(),
                        columns.len()
                    )));
                }
                decode_row(&questions, row)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Table { questions, records })
    }

    async fn write_table(&self, table: &Table) -> Result<(), StorageError> {
        let mut out = String::new();

        let header: Vec<Cell> = RESERVED_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(table.questions.iter().cloned())
            .map(Cell::Bare)
            .collect();
        csv::write_record(&mut out, &header);

        for record in &table.records {
            csv::write_record(&mut out, &encode_row(&table.questions, record));
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Replace the file in one rename so readers never see a half-written table.
        let mut tmp_name = self.path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(format!(".{}.tmp", uuid::Uuid::now_v7().simple()));
        let tmp_path = self.path.with_file_name(tmp_name);

        tokio::fs::write(&tmp_path, out).await?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl ResponseStore for FileResponseStore {
    fn kind(&self) -> &'static str {
        "file"
    }

    async fn init(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn append(&self, response: &NewResponse) -> Result<ResponseRecord, StorageError> {
        let _guard = self.write_lock.lock().await;

        let mut table = self.read_table().await?;
        let id = table.records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let record = ResponseRecord::from_new(id, response);

        table.questions.extend(record.answers.keys().cloned());
        table.records.push(record.clone());

        self.write_table(&table).await?;
        tracing::debug!("Appended response {id} to {}", self.path.display());

        Ok(record)
    }

    async fn list_all(&self) -> Result<Vec<ResponseRecord>, StorageError> {
        Ok(self.read_table().await?.records)
    }
}

fn optional_text(value: &Option<String>) -> Cell {
    match value {
        Some(s) => Cell::Quoted(s.clone()),
        None => Cell::Empty,
    }
}

fn encode_row(questions: &IndexSet<String>, record: &ResponseRecord) -> Vec<Cell> {
    let mut cells = vec![
        Cell::Bare(record.id.to_string()),
        optional_text(&record.name),
        optional_text(&record.date),
        Cell::Quoted(record.comment.clone()),
    ];

    cells.extend(questions.iter().map(|q| match record.answers.get(q) {
        None => Cell::Empty,
        Some(Answer::Text(s)) => Cell::Quoted(s.clone()),
        Some(Answer::Number(n)) => Cell::Bare(n.to_string()),
    }));

    cells
}

fn decode_row(questions: &IndexSet<String>, row: Vec<Cell>) -> Result<ResponseRecord, StorageError> {
    let mut cells = row.into_iter();
    let mut next = || cells.next().unwrap_or(Cell::Empty);

    let id = match next() {
        Cell::Bare(s) => s
            .parse::<i64>()
            .map_err(|e| StorageError::Corrupt(format!("invalid id {s:?}: {e}")))?,
        other => return Err(StorageError::Corrupt(format!("invalid id cell {other:?}"))),
    };
    let name = next().text().map(str::to_string);
    let date = next().text().map(str::to_string);
    let comment = next().text().unwrap_or_default().to_string();

    let mut answers = Answers::new();
    for question in questions {
        let answer = match next() {
            Cell::Empty => continue,
            Cell::Quoted(s) => Answer::Text(s),
            Cell::Bare(s) => match s.parse::<serde_json::Number>() {
                Ok(n) => Answer::Number(n),
                Err(_) => Answer::Text(s),
            },
        };
        answers.insert(question.clone(), answer);
    }

    Ok(ResponseRecord {
        id,
        name,
        date,
        answers,
        comment,
    })
}

/// Credentials kept as a `user,password_hash` CSV file provisioned out of band.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn password_hash(&self, user: &str) -> Result<Option<String>, StorageError> {
        let Some(text) = read_optional(&self.path).await? else {
            tracing::warn!("Credential file {} does not exist", self.path.display());
            return Ok(None);
        };

        let rows = csv::parse(&text)
            .map_err(|e| StorageError::Corrupt(format!("{}: {e}", self.path.display())))?;

        // PHC strings contain commas, so an unquoted hash spans the rest of the row.
        let hash = rows
            .iter()
            .skip(1)
            .find(|row| row.first().and_then(Cell::text) == Some(user))
            .map(|row| {
                row[1..]
                    .iter()
                    .map(|cell| cell.text().unwrap_or_default())
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .filter(|hash| !hash.is_empty());

        Ok(hash)
    }
}

async fn read_optional(path: &Path) -> Result<Option<String>, StorageError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
