use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionAverage {
    pub question: String,
    pub average: f64,
}

/// Per-question averages over every stored response. Recomputed on each request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub count: usize,
    pub averages: Vec<QuestionAverage>,
}
