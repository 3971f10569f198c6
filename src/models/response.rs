use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Column names every stored row carries besides its answers.
pub const RESERVED_COLUMNS: [&str; 4] = ["id", "name", "date", "comment"];

/// Answer keys matching a reserved column would collide with it in the
/// tabular store, so they are never persisted.
pub fn is_reserved(key: &str) -> bool {
    RESERVED_COLUMNS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(key))
}

/// A single answer as submitted by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Number(serde_json::Number),
    Text(String),
}

impl Answer {
    /// Best-effort conversion of an arbitrary JSON value. `null` means "no answer".
    pub fn from_json(value: serde_json::Value) -> Option<Answer> {
        use serde_json::Value;

        match value {
            Value::Null => None,
            Value::Number(n) => Some(Answer::Number(n)),
            Value::String(s) => Some(Answer::Text(s)),
            Value::Bool(b) => Some(Answer::Text(b.to_string())),
            other => Some(Answer::Text(other.to_string())),
        }
    }

    /// Numeric reading used for averaging. Free text and blanks yield `None`.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Answer::Number(n) => n.as_f64()?,
            Answer::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Number(n) => write!(f, "{n}"),
            Answer::Text(s) => f.write_str(s),
        }
    }
}

/// Question key to answer, in the order the client sent them.
pub type Answers = IndexMap<String, Answer>;

/// A submission that has not been stored yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewResponse {
    pub name: Option<String>,
    pub date: Option<String>,
    #[serde(default)]
    pub answers: Answers,
    #[serde(default)]
    pub comment: String,
}

/// One stored survey submission. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub id: i64,
    pub name: Option<String>,
    pub date: Option<String>,
    pub answers: Answers,
    pub comment: String,
}

impl ResponseRecord {
    /// The record as every backend persists it: NUL characters removed from
    /// all text (Postgres TEXT cannot hold them) and reserved answer keys dropped.
    pub fn from_new(id: i64, response: &NewResponse) -> Self {
        let answers = response
            .answers
            .iter()
            .filter_map(|(key, answer)| {
                let key = strip_nul(key);
                if is_reserved(&key) {
                    return None;
                }
                let answer = match answer {
                    Answer::Text(s) => Answer::Text(strip_nul(s)),
                    number => number.clone(),
                };
                Some((key, answer))
            })
            .collect();

        ResponseRecord {
            id,
            name: response.name.as_deref().map(strip_nul),
            date: response.date.as_deref().map(strip_nul),
            answers,
            comment: strip_nul(&response.comment),
        }
    }
}

fn strip_nul(text: &str) -> String {
    text.replace('\0', "")
}
