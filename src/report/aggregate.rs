use super::{flatten, question_universe};
use crate::models::{AggregateResult, QuestionAverage, ResponseRecord};

/// Average every question over the answers that read as numbers.
///
/// Absent and non-numeric answers are left out of the mean rather than
/// counted as zero. A question without a single numeric answer reports `0`.
pub fn aggregate(records: &[ResponseRecord]) -> AggregateResult {
    let questions = question_universe(records);
    let rows = flatten(records, &questions);

    let averages = questions
        .into_iter()
        .enumerate()
        .map(|(column, question)| {
            let values: Vec<f64> = rows
                .iter()
                .filter_map(|row| row[column].and_then(|answer| answer.as_f64()))
                .collect();

            let average = if values.is_empty() {
                0.0
            } else {
                round2(values.iter().sum::<f64>() / values.len() as f64)
            };

            QuestionAverage { question, average }
        })
        .collect();

    AggregateResult {
        count: records.len(),
        averages,
    }
}

/// Halves go to the even neighbour, so 1.125 reports as 1.12.
fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
