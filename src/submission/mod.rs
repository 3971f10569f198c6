pub mod intake;
pub mod parser;
