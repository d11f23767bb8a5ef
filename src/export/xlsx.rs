//! XLSX workbooks for the grid export and the chart export.

use chrono::NaiveDateTime;
use rust_xlsxwriter::{Color, Format, Workbook, Worksheet};

use crate::error::Result;
use crate::export::timestamp_text;
use crate::query::columns::{COLUMNS, MODIFIED_ON, NAME};
use crate::store::sqlite::{Cell, Point, Record};

pub const RECORDS_SHEET: &str = "Device Data";
pub const CHART_SHEET: &str = "Chart Data";

const CHART_HEADERS: [&str; 4] = ["Device", "Property", "Time (UTC)", "New Value"];
const CHART_WIDTHS: [f64; 4] = [35.0, 20.0, 22.0, 16.0];

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xE0E0E0))
}

pub fn write_records(rows: &[Record], columns: &[usize]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header = header_format();
    let sheet = workbook.add_worksheet();
    sheet.set_name(RECORDS_SHEET)?;

    for (col, &index) in (0u16..).zip(columns) {
        sheet.write_string_with_format(0, col, COLUMNS[index].label, &header)?;
        let width = if index == MODIFIED_ON || index == NAME { 25.0 } else { 15.0 };
        sheet.set_column_width(col, width)?;
    }
    sheet.set_freeze_panes(1, 0)?;

    for (row, record) in (1u32..).zip(rows) {
        for (col, &index) in (0u16..).zip(columns) {
            write_cell(sheet, row, col, record.cell(index))?;
        }
    }
    Ok(workbook.save_to_buffer()?)
}

fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, cell: Cell<'_>) -> Result<()> {
    match cell {
        Cell::Integer(i) => {
            sheet.write_number(row, col, i as f64)?;
        }
        Cell::Real(f) => {
            sheet.write_number(row, col, f)?;
        }
        Cell::Text(s) => {
            sheet.write_string(row, col, s)?;
        }
        Cell::Timestamp(t) => {
            sheet.write_string(row, col, timestamp_text(t))?;
        }
        Cell::Empty => {}
    }
    Ok(())
}

/// One row per point under a filterable header.
pub fn write_series(device: &str, property: &str, points: &[Point]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header = header_format();
    let sheet = workbook.add_worksheet();
    sheet.set_name(CHART_SHEET)?;

    for (col, (title, width)) in (0u16..).zip(CHART_HEADERS.iter().zip(CHART_WIDTHS)) {
        sheet.write_string_with_format(0, col, *title, &header)?;
        sheet.set_column_width(col, width)?;
    }
    sheet.set_freeze_panes(1, 0)?;

    let mut last_row = 0;
    for (row, point) in (1u32..).zip(points) {
        sheet.write_string(row, 0, device)?;
        sheet.write_string(row, 1, property)?;
        sheet.write_string(row, 2, timestamp_text(point.timestamp))?;
        sheet.write_number(row, 3, point.value)?;
        last_row = row;
    }
    sheet.autofilter(0, 0, last_row, 3)?;
    Ok(workbook.save_to_buffer()?)
}

pub fn chart_filename(device: &str, property: &str, now: NaiveDateTime) -> String {
    format!(
        "chart_{}_{}_{}.xlsx",
        super::safe_name(device, 30),
        super::safe_name(property, 20),
        now.format("%Y-%m-%d")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::builder::Predicate;
    use crate::query::request::Sort;
    use crate::store::sqlite::fixtures::seeded;
    use calamine::{open_workbook_from_rs, Data, Range, Reader, Xlsx};
    use std::io::Cursor;

    fn sheet(bytes: Vec<u8>, name: &str) -> Range<Data> {
        let mut book: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).expect("readable workbook");
        book.worksheet_range(name).expect("sheet present")
    }

    fn row_text(range: &Range<Data>, row: usize) -> Vec<String> {
        range.rows().nth(row).map(|r| r.iter().map(|c| c.to_string()).collect()).unwrap_or_default()
    }

    #[test]
    fn records_sheet_has_selected_headers() -> Result<()> {
        let store = seeded()?;
        let (rows, _) = store.export_rows(&Predicate::default(), Sort::default(), 100)?;
        let range = sheet(write_records(&rows, &[0, 2, 4])?, RECORDS_SHEET);
        assert_eq!(row_text(&range, 0), ["Id", "Device", "Locality"]);
        assert_eq!(range.height(), rows.len() + 1);
        assert_eq!(range.get((1, 0)), Some(&Data::Float(400.0)));
        Ok(())
    }

    #[test]
    fn empty_export_still_has_header() -> Result<()> {
        let range = sheet(write_records(&[], &[1, 7])?, RECORDS_SHEET);
        assert_eq!(row_text(&range, 0), ["Modified On", "Property"]);
        assert_eq!(range.height(), 1);
        Ok(())
    }

    #[test]
    fn chart_sheet_lists_points() -> Result<()> {
        let t = NaiveDateTime::parse_from_str("2024-01-02 09:45:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let points = [Point { timestamp: t, value: 21.5 }];
        let range = sheet(write_series("Ostrava Relay", "Temperature", &points)?, CHART_SHEET);
        assert_eq!(row_text(&range, 0), CHART_HEADERS);
        assert_eq!(row_text(&range, 1)[..3], ["Ostrava Relay", "Temperature", "2024-01-02 09:45:00"]);
        assert_eq!(range.get((1, 3)), Some(&Data::Float(21.5)));
        Ok(())
    }

    #[test]
    fn chart_filename_is_sanitised() {
        let now = NaiveDateTime::parse_from_str("2024-03-09 07:05:01", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(
            chart_filename("Praha Vysílač", "Power/W", now),
            "chart_Praha_Vys_la__Power_W_2024-03-09.xlsx"
        );
    }
}
