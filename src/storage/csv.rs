//! Minimal CSV codec for the tabular file store and the export artifact.
//!
//! Unlike a plain CSV reader this keeps track of whether a field was quoted,
//! so the file store can tell text (`"5"`) from numbers (`5`) and an absent
//! value (empty, unquoted) from empty text (`""`).

use std::mem;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Bare(String),
    Quoted(String),
}

impl Cell {
    /// Cell content regardless of quoting. `None` only for an empty unquoted cell.
    pub fn text(&self) -> Option<&str> {
        match self {
            Cell::Empty => None,
            Cell::Bare(s) | Cell::Quoted(s) => Some(s),
        }
    }
}

/// Quote a value only when it contains a delimiter, a quote or a line break.
pub fn escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        quote(s)
    } else {
        s.to_string()
    }
}

pub fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn encode(cell: &Cell) -> String {
    match cell {
        Cell::Empty => String::new(),
        Cell::Bare(s) => escape(s),
        Cell::Quoted(s) => quote(s),
    }
}

/// Append one record terminated by `\n`.
pub fn write_record(out: &mut String, cells: &[Cell]) {
    let line = cells.iter().map(encode).collect::<Vec<_>>().join(",");
    out.push_str(&line);
    out.push('\n');
}

/// Parse a whole document. Blank lines are skipped; CRLF line endings are accepted.
pub fn parse(input: &str) -> Result<Vec<Vec<Cell>>, String> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut line = 1;

    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                if c == '\n' {
                    line += 1;
                }
                field.push(c);
            }
            continue;
        }

        match c {
            '"' if field.is_empty() && !quoted => {
                in_quotes = true;
                quoted = true;
            }
            '"' => return Err(format!("unexpected quote on line {line}")),
            ',' => record.push(finish_field(&mut field, &mut quoted)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(finish_field(&mut field, &mut quoted));
                finish_record(&mut records, &mut record);
                line += 1;
            }
            _ if quoted => {
                return Err(format!("unexpected character after closing quote on line {line}"));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(format!("unterminated quoted field starting before line {line}"));
    }
    if quoted || !field.is_empty() || !record.is_empty() {
        record.push(finish_field(&mut field, &mut quoted));
        finish_record(&mut records, &mut record);
    }

    Ok(records)
}

fn finish_field(field: &mut String, quoted: &mut bool) -> Cell {
    let text = mem::take(field);
    let cell = if *quoted {
        Cell::Quoted(text)
    } else if text.is_empty() {
        Cell::Empty
    } else {
        Cell::Bare(text)
    };
    *quoted = false;
    cell
}

fn finish_record(records: &mut Vec<Vec<Cell>>, record: &mut Vec<Cell>) {
    let cells = mem::take(record);
    if cells != [Cell::Empty] {
        records.push(cells);
    }
}
