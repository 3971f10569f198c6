pub mod report;
pub mod response;

pub use report::{AggregateResult, QuestionAverage};
pub use response::{Answer, Answers, NewResponse, ResponseRecord};
