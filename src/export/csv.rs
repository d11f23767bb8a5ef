//! Semicolon-delimited CSV with a UTF-8 byte order mark, readable by
//! spreadsheet tools in locales that use a decimal comma.

use csv::{QuoteStyle, WriterBuilder};

use crate::error::{Error, Result};
use crate::export::cell_text;
use crate::query::columns::COLUMNS;
use crate::store::sqlite::Record;

const BOM: &[u8] = b"\xEF\xBB\xBF";

pub fn write_records(rows: &[Record], columns: &[usize]) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .delimiter(b';')
        .quote_style(QuoteStyle::NonNumeric)
        .from_writer(BOM.to_vec());

    writer.write_record(columns.iter().map(|&i| COLUMNS[i].label))?;
    for record in rows {
        writer.write_record(columns.iter().map(|&i| cell_text(record.cell(i))))?;
    }
    writer.into_inner().map_err(|e| Error::Internal(e.to_string()))
}
