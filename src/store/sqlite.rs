//! SQLite-backed reader for the device data view.
//! Used by: store::registry, executor.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{NaiveDateTime, TimeDelta};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, OpenFlags, OptionalExtension, Row, ToSql};
use serde::Serialize;

use crate::error::{lock_err, Result};
use crate::query::builder::{build_page, order_clause, Param, Predicate};
use crate::query::columns::{FilterField, COLUMNS, MODIFIED_ON, NEW_VALUE_REAL, VIEW};
use crate::query::escape::fold;
use crate::query::request::{Page, Sort};

pub struct Store {
    conn: Mutex<Connection>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Record {
    pub id: i64,
    pub modified_on: NaiveDateTime,
    pub name: Option<String>,
    pub device_region: Option<String>,
    pub device_locality: Option<String>,
    pub frequency: Option<String>,
    pub device_type: Option<String>,
    pub device_property: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub old_value_real: Option<f64>,
    pub new_value_real: Option<f64>,
}

/// One cell of a [`Record`], addressed by column-table index.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell<'a> {
    Integer(i64),
    Real(f64),
    Text(&'a str),
    Timestamp(NaiveDateTime),
    Empty,
}

impl Record {
    pub fn cell(&self, index: usize) -> Cell<'_> {
        let real = |v: Option<f64>| v.map_or(Cell::Empty, Cell::Real);
        match index {
            0 => Cell::Integer(self.id),
            1 => Cell::Timestamp(self.modified_on),
            2 => text_cell(&self.name),
            3 => text_cell(&self.device_region),
            4 => text_cell(&self.device_locality),
            5 => text_cell(&self.frequency),
            6 => text_cell(&self.device_type),
            7 => text_cell(&self.device_property),
            8 => text_cell(&self.old_value),
            9 => text_cell(&self.new_value),
            10 => real(self.old_value_real),
            11 => real(self.new_value_real),
            _ => Cell::Empty,
        }
    }
}

fn text_cell(value: &Option<String>) -> Cell<'_> {
    value.as_deref().map_or(Cell::Empty, Cell::Text)
}

#[derive(Debug)]
pub struct Listing {
    pub total: u64,
    pub filtered: u64,
    pub rows: Vec<Record>,
}

#[derive(Debug, Default, Serialize)]
pub struct Facets {
    pub regions: Vec<String>,
    pub localities: Vec<String>,
    pub devices: Vec<String>,
    pub frequencies: Vec<String>,
    pub types: Vec<String>,
    pub properties: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

#[derive(Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub count_1h: u64,
    pub count_24h: u64,
    pub top_device: Option<String>,
    pub top_property: Option<String>,
    pub top_frequency: Option<String>,
}

impl ToSql for Param {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Param::Text(s) => s.to_sql(),
            Param::Date(d) => d.to_sql(),
        }
    }
}

impl Store {
    /// Opens an existing database read-only.
    pub fn open(path: &str, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(busy_timeout)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        register_functions(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Total count, filtered count and one page, read in a single transaction.
    pub fn list(&self, predicate: &Predicate, sort: Sort, page: Page) -> Result<Listing> {
        let mut conn = self.conn.lock().map_err(lock_err("store"))?;
        let tx = conn.transaction()?;
        let total = count(&tx, &Predicate::default())?;
        let filtered = if predicate.is_empty() {
            total
        } else {
            count(&tx, predicate)?
        };
        let tail = format!("{} {}", order_clause(sort), build_page(page));
        let rows = select_records(&tx, predicate, &tail)?;
        Ok(Listing { total, filtered, rows })
    }

    /// All matching rows up to `cap`; the flag reports whether more existed.
    pub fn export_rows(&self, predicate: &Predicate, sort: Sort, cap: usize) -> Result<(Vec<Record>, bool)> {
        let conn = self.conn.lock().map_err(lock_err("store"))?;
        let tail = format!("{} LIMIT {}", order_clause(sort), cap.saturating_add(1));
        let mut rows = select_records(&conn, predicate, &tail)?;
        let truncated = rows.len() > cap;
        rows.truncate(cap);
        Ok((rows, truncated))
    }

    pub fn facets(&self) -> Result<Facets> {
        let conn = self.conn.lock().map_err(lock_err("store"))?;
        let distinct = |field: FilterField| distinct_values(&conn, field);
        Ok(Facets {
            regions: distinct(FilterField::Region)?,
            localities: distinct(FilterField::Locality)?,
            devices: distinct(FilterField::Device)?,
            frequencies: distinct(FilterField::Frequency)?,
            types: distinct(FilterField::Type)?,
            properties: distinct(FilterField::Property)?,
        })
    }

    pub fn time_series(&self, predicate: &Predicate, cap: usize) -> Result<Vec<Point>> {
        let conn = self.conn.lock().map_err(lock_err("store"))?;
        let modified_on = COLUMNS[MODIFIED_ON].name;
        let sql = format!(
            "SELECT {modified_on}, {} FROM {VIEW} {} ORDER BY {modified_on} ASC LIMIT {cap}",
            COLUMNS[NEW_VALUE_REAL].name,
            predicate.where_clause(),
        );
        let mut stmt = conn.prepare(&sql)?;
        let points = stmt
            .query_map(params_from_iter(predicate.params()), |row| {
                Ok(Point {
                    timestamp: row.get(0)?,
                    value: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(points)
    }

    /// Recent-activity counts relative to `now` plus the most frequent
    /// device, property and frequency among matching rows.
    pub fn stats(&self, predicate: &Predicate, now: NaiveDateTime) -> Result<Stats> {
        let mut conn = self.conn.lock().map_err(lock_err("store"))?;
        let tx = conn.transaction()?;
        let modified_on = COLUMNS[MODIFIED_ON].name;

        let mut windowed = predicate.clone();
        let hour_ago = windowed.bind(Param::Text(sqlite_datetime(now - TimeDelta::hours(1))));
        let day_ago = windowed.bind(Param::Text(sqlite_datetime(now - TimeDelta::days(1))));
        let sql = format!(
            "SELECT \
               COALESCE(SUM(CASE WHEN datetime({modified_on}) >= datetime({hour_ago}) THEN 1 ELSE 0 END), 0), \
               COALESCE(SUM(CASE WHEN datetime({modified_on}) >= datetime({day_ago}) THEN 1 ELSE 0 END), 0) \
             FROM {VIEW} {}",
            predicate.where_clause(),
        );
        let (count_1h, count_24h): (i64, i64) = tx.query_row(
            &sql,
            params_from_iter(windowed.params()),
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(Stats {
            count_1h: count_1h.max(0) as u64,
            count_24h: count_24h.max(0) as u64,
            top_device: top_value(&tx, predicate, FilterField::Device)?,
            top_property: top_value(&tx, predicate, FilterField::Property)?,
            top_frequency: top_value(&tx, predicate, FilterField::Frequency)?,
        })
    }
}

fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "fold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(value_text(ctx.get_raw(0)).map(|s| fold(&s))),
    )
}

fn value_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) | ValueRef::Blob(t) => Some(String::from_utf8_lossy(t).into_owned()),
    }
}

fn text_at(row: &Row<'_>, index: usize) -> rusqlite::Result<Option<String>> {
    Ok(value_text(row.get_ref(index)?))
}

fn sqlite_datetime(t: NaiveDateTime) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn select_list() -> String {
    COLUMNS.iter().map(|c| c.name).collect::<Vec<_>>().join(", ")
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        id: row.get(0)?,
        modified_on: row.get(1)?,
        name: text_at(row, 2)?,
        device_region: text_at(row, 3)?,
        device_locality: text_at(row, 4)?,
        frequency: text_at(row, 5)?,
        device_type: text_at(row, 6)?,
        device_property: text_at(row, 7)?,
        old_value: text_at(row, 8)?,
        new_value: text_at(row, 9)?,
        old_value_real: row.get(10)?,
        new_value_real: row.get(11)?,
    })
}

fn count(conn: &Connection, predicate: &Predicate) -> Result<u64> {
    let sql = format!("SELECT COUNT(*) FROM {VIEW} {}", predicate.where_clause());
    let n: i64 = conn.query_row(&sql, params_from_iter(predicate.params()), |row| row.get(0))?;
    Ok(n.max(0) as u64)
}

fn select_records(conn: &Connection, predicate: &Predicate, tail: &str) -> Result<Vec<Record>> {
    let sql = format!(
        "SELECT {} FROM {VIEW} {} {tail}",
        select_list(),
        predicate.where_clause()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(predicate.params()), record_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn distinct_values(conn: &Connection, field: FilterField) -> Result<Vec<String>> {
    let col = field.column().name;
    let sql = format!(
        "SELECT DISTINCT {col} FROM {VIEW} WHERE {col} IS NOT NULL AND {col} <> '' ORDER BY {col}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let values = stmt
        .query_map([], |row| text_at(row, 0))?
        .filter_map(|v| v.transpose())
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(values)
}

fn top_value(conn: &Connection, predicate: &Predicate, field: FilterField) -> Result<Option<String>> {
    let col = field.column().name;
    let sql = format!(
        "SELECT {col} FROM {VIEW} {} GROUP BY {col} ORDER BY COUNT(*) DESC LIMIT 1",
        predicate.where_clause()
    );
    let value = conn
        .query_row(&sql, params_from_iter(predicate.params()), |row| text_at(row, 0))
        .optional()?;
    Ok(value.flatten())
}
