use serde_json::{Map, Value};

use crate::models::response::is_reserved;
use crate::models::{Answer, Answers, NewResponse};

/// Turn a parsed `/save` body into a storable response.
///
/// Missing or oddly typed fields are defaulted instead of rejected so that a
/// partially filled survey is never lost. Only a body that is not an object
/// at all is refused.
///
/// Answers come from the `answers` object when present. Without it, every
/// non-reserved top-level key is taken as an answer, which is what a plain
/// HTML form post produces.
pub fn normalize(body: Value) -> Result<NewResponse, String> {
    let Value::Object(mut fields) = body else {
        return Err("Submission must be an object".to_string());
    };

    let name = fields.shift_remove("name").and_then(scalar_text);
    let date = fields.shift_remove("date").and_then(scalar_text);
    let comment = fields
        .shift_remove("comment")
        .and_then(scalar_text)
        .unwrap_or_default();
    fields.shift_remove("id");

    let raw_answers = match fields.shift_remove("answers") {
        Some(Value::Object(answers)) => answers,
        Some(other) => {
            tracing::debug!("Ignoring non-object answers field: {other}");
            Map::new()
        }
        None => fields,
    };

    Ok(NewResponse {
        name,
        date,
        answers: collect_answers(raw_answers),
        comment,
    })
}

fn collect_answers(raw: Map<String, Value>) -> Answers {
    let mut answers = Answers::new();
    for (key, value) in raw {
        if is_reserved(&key) {
            tracing::warn!("Dropping answer with reserved key '{key}'");
            continue;
        }
        if let Some(answer) = Answer::from_json(value) {
            answers.insert(key, answer);
        }
    }
    answers
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
