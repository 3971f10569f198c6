use indexmap::IndexMap;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde_json::Value;

use super::{flatten, question_universe};
use crate::models::response::RESERVED_COLUMNS;
use crate::models::{Answer, ResponseRecord};
use crate::storage::csv::{self, Cell};

const FIRST_ANSWER_COLUMN: u16 = RESERVED_COLUMNS.len() as u16;

/// Every stored response flattened into fixed columns plus one column per question.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportTable {
    pub questions: Vec<String>,
    pub rows: Vec<ExportRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub id: i64,
    pub name: Option<String>,
    pub date: Option<String>,
    pub comment: String,
    /// Raw answers aligned with `ExportTable::questions`.
    pub answers: Vec<Option<Answer>>,
}

/// Build the export table. Returns `None` when there is nothing to export.
pub fn materialize(records: &[ResponseRecord]) -> Option<ExportTable> {
    if records.is_empty() {
        return None;
    }

    let questions = question_universe(records);
    let rows = records
        .iter()
        .zip(flatten(records, &questions))
        .map(|(record, answers)| ExportRow {
            id: record.id,
            name: record.name.clone(),
            date: record.date.clone(),
            comment: record.comment.clone(),
            answers: answers.into_iter().map(|a| a.cloned()).collect(),
        })
        .collect();

    Some(ExportTable { questions, rows })
}

impl ExportTable {
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        RESERVED_COLUMNS
            .iter()
            .copied()
            .chain(self.questions.iter().map(String::as_str))
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::new();

        let header: Vec<Cell> = self.columns().map(|c| Cell::Bare(c.to_string())).collect();
        csv::write_record(&mut out, &header);

        for row in &self.rows {
            let mut cells = vec![
                Cell::Bare(row.id.to_string()),
                Cell::Bare(row.name.clone().unwrap_or_default()),
                Cell::Bare(row.date.clone().unwrap_or_default()),
                Cell::Bare(row.comment.clone()),
            ];
            cells.extend(
                row.answers
                    .iter()
                    .map(|a| a.as_ref().map_or(Cell::Empty, |a| Cell::Bare(a.to_string()))),
            );
            csv::write_record(&mut out, &cells);
        }

        out
    }

    /// Single-sheet workbook: bold header row, numbers as numeric cells,
    /// text as string cells, absent values as blank cells.
    pub fn to_xlsx(&self) -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Responses")?;

        let bold = Format::new().set_bold();
        for (col, column) in (0u16..).zip(self.columns()) {
            sheet.write_string_with_format(0, col, column, &bold)?;
        }

        for (row_index, row) in (1u32..).zip(&self.rows) {
            sheet.write_number(row_index, 0, row.id as f64)?;
            if let Some(name) = &row.name {
                sheet.write_string(row_index, 1, name)?;
            }
            if let Some(date) = &row.date {
                sheet.write_string(row_index, 2, date)?;
            }
            sheet.write_string(row_index, 3, &row.comment)?;

            for (col, answer) in (FIRST_ANSWER_COLUMN..).zip(&row.answers) {
                match answer {
                    Some(Answer::Number(n)) => match n.as_f64() {
                        Some(value) => sheet.write_number(row_index, col, value)?,
                        None => sheet.write_string(row_index, col, n.to_string())?,
                    },
                    Some(Answer::Text(s)) => sheet.write_string(row_index, col, s)?,
                    None => continue,
                };
            }
        }

        workbook.save_to_buffer()
    }

    /// Rows as JSON objects in column order. Absent answers are omitted.
    pub fn to_json(&self) -> Vec<IndexMap<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                let mut object = IndexMap::new();
                object.insert("id".to_string(), Value::from(row.id));
                object.insert("name".to_string(), Value::from(row.name.clone()));
                object.insert("date".to_string(), Value::from(row.date.clone()));
                object.insert("comment".to_string(), Value::from(row.comment.clone()));

                for (question, answer) in self.questions.iter().zip(&row.answers) {
                    if let Some(answer) = answer {
                        let value = match answer {
                            Answer::Number(n) => Value::Number(n.clone()),
                            Answer::Text(s) => Value::String(s.clone()),
                        };
                        object.insert(question.clone(), value);
                    }
                }
                object
            })
            .collect()
    }
}
