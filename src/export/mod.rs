//! File renderings of exported rows.
//! Used by: handlers::export, handlers::timeseries.

pub mod csv;
pub mod xlsx;

use std::collections::BTreeSet;

use chrono::NaiveDateTime;

use crate::error::{Error, Result};
use crate::query::columns::COLUMNS;
use crate::query::params::is_sentinel;
use crate::store::sqlite::{Cell, Record};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Xlsx,
}

impl Format {
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        match raw.map(|r| r.trim().to_ascii_lowercase()).as_deref() {
            None | Some("csv") => Ok(Format::Csv),
            Some("xlsx") => Ok(Format::Xlsx),
            Some(other) => Err(Error::Validation(format!("unsupported export format: {other}"))),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Xlsx => "xlsx",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Format::Csv => "text/csv; charset=utf-8",
            Format::Xlsx => XLSX_CONTENT_TYPE,
        }
    }

    pub fn render(self, rows: &[Record], columns: &[usize]) -> Result<Vec<u8>> {
        match self {
            Format::Csv => csv::write_records(rows, columns),
            Format::Xlsx => xlsx::write_records(rows, columns),
        }
    }
}

/// Column-table indices to emit, in table order. Unknown indices are
/// dropped; nothing valid means every column.
pub fn visible_columns(raw: Option<&str>) -> Vec<usize> {
    let all = || (0..COLUMNS.len()).collect();
    let Some(raw) = raw.filter(|r| !is_sentinel(r)) else {
        return all();
    };
    let mut picked = BTreeSet::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.parse::<usize>() {
            Ok(i) if i < COLUMNS.len() => {
                picked.insert(i);
            }
            _ => tracing::warn!(value = part, "ignoring unknown export column"),
        }
    }
    if picked.is_empty() {
        all()
    } else {
        picked.into_iter().collect()
    }
}

pub fn export_filename(format: Format, now: NaiveDateTime) -> String {
    format!(
        "historian_export_{}.{}",
        now.format("%Y-%m-%d_%H-%M-%S"),
        format.extension()
    )
}

/// Keeps `[A-Za-z0-9_-]`, replaces anything else with `_`, and cuts to `max` chars.
pub fn safe_name(raw: &str, max: usize) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .take(max)
        .collect()
}

pub(crate) fn timestamp_text(t: NaiveDateTime) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub(crate) fn cell_text(cell: Cell<'_>) -> String {
    match cell {
        Cell::Integer(i) => i.to_string(),
        Cell::Real(f) => f.to_string(),
        Cell::Text(s) => s.to_owned(),
        Cell::Timestamp(t) => timestamp_text(t),
        Cell::Empty => String::new(),
    }
}
