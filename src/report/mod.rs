pub mod aggregate;
pub mod export;

use indexmap::IndexSet;

use crate::models::{Answer, ResponseRecord};

pub use aggregate::aggregate;
pub use export::{ExportTable, materialize};

/// Every answer key seen across `records`, in first-seen order.
pub fn question_universe(records: &[ResponseRecord]) -> Vec<String> {
    let keys: IndexSet<&String> = records
        .iter()
        .flat_map(|record| record.answers.keys())
        .collect();
    keys.into_iter().cloned().collect()
}

/// One row per record, one column per question; a missing key stays `None`.
pub fn flatten<'a>(
    records: &'a [ResponseRecord],
    questions: &[String],
) -> Vec<Vec<Option<&'a Answer>>> {
    records
        .iter()
        .map(|record| questions.iter().map(|q| record.answers.get(q)).collect())
        .collect()
}
