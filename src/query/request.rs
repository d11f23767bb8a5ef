//! Per-call filter/sort/page request and its construction from query params.
//! Used by: query::builder, executor, handlers.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::Serialize;

use crate::query::columns::{column, FilterField, COLUMNS};
use crate::query::params::{is_sentinel, QueryParams};

pub const DEFAULT_LIMIT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    #[default]
    Primary,
    Secondary,
}

impl DataSource {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "primary" | "main" => Some(DataSource::Primary),
            "secondary" | "backup" => Some(DataSource::Secondary),
            _ => None,
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Primary => f.write_str("primary"),
            DataSource::Secondary => f.write_str("secondary"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

impl SortDir {
    pub fn sql(self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sort {
    pub column: usize,
    pub dir: SortDir,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: u64,
    pub limit: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self { offset: 0, limit: DEFAULT_LIMIT }
    }
}

/// Inclusive bounds; either side may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds<T> {
    pub from: Option<T>,
    pub to: Option<T>,
}

impl<T> Default for Bounds<T> {
    fn default() -> Self {
        Self { from: None, to: None }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterRequest {
    pub data_source: DataSource,
    pub multi_value: BTreeMap<FilterField, Vec<String>>,
    pub dates: Bounds<NaiveDate>,
    pub times: Bounds<NaiveTime>,
    pub search: Option<String>,
    pub column_filters: BTreeMap<usize, String>,
    pub sort: Sort,
    pub page: Page,
    pub draw: Option<i64>,
}

/// A request parameter that was ignored while building a [`FilterRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterIssue {
    InvalidFilterValue { param: String, value: String },
    UnknownColumnIndex { param: String, index: String },
}

impl fmt::Display for FilterIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFilterValue { param, value } => {
                write!(f, "invalid value {:?} for {}", value, param)
            }
            Self::UnknownColumnIndex { param, index } => {
                write!(f, "unknown column index {:?} for {}", index, param)
            }
        }
    }
}

#[derive(Debug)]
pub struct Parsed {
    pub request: FilterRequest,
    pub issues: Vec<FilterIssue>,
}

impl FilterRequest {
    pub fn with_values(mut self, field: FilterField, values: &[&str]) -> Self {
        let kept: Vec<String> = dedup_values(values.iter().copied());
        if !kept.is_empty() {
            self.multi_value.insert(field, kept);
        }
        self
    }

    pub fn from_params(params: &QueryParams, page_max_limit: u32) -> Parsed {
        let mut issues = Vec::new();
        let mut request = FilterRequest::default();

        if let Some(raw) = params.value("dataSource") {
            match DataSource::parse(raw) {
                Some(source) => request.data_source = source,
                None => issues.push(invalid("dataSource", raw)),
            }
        }

        for field in FilterField::ALL {
            let values = dedup_values(params.all(field.key()));
            if !values.is_empty() {
                request.multi_value.insert(field, values);
            }
        }

        request.dates = Bounds {
            from: parse_bound(params, "dateFrom", parse_date, &mut issues),
            to: parse_bound(params, "dateTo", parse_date, &mut issues),
        };
        request.times = Bounds {
            from: parse_bound(params, "timeFrom", parse_time, &mut issues),
            to: parse_bound(params, "timeTo", parse_time, &mut issues),
        };

        request.search = params.value("search").map(str::to_owned);
        request.column_filters = column_filters(params, &mut issues);
        request.sort = parse_sort(params, &mut issues);
        request.page = parse_page(params, page_max_limit, &mut issues);
        request.draw = params.value("draw").and_then(|d| d.trim().parse().ok());

        Parsed { request, issues }
    }
}

fn invalid(param: &str, value: &str) -> FilterIssue {
    FilterIssue::InvalidFilterValue { param: param.to_owned(), value: value.to_owned() }
}

fn dedup_values<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut kept: Vec<String> = Vec::new();
    for value in values.filter(|v| !is_sentinel(v)) {
        if !kept.iter().any(|k| k == value) {
            kept.push(value.to_owned());
        }
    }
    kept
}

fn parse_bound<T>(
    params: &QueryParams,
    key: &str,
    parse: fn(&str) -> Option<T>,
    issues: &mut Vec<FilterIssue>,
) -> Option<T> {
    let raw = params.value(key)?;
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        issues.push(invalid(key, raw));
    }
    parsed
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Accepts `HH:MM` or `HH:MM:SS`; seconds are discarded since bounds compare
/// at minute resolution.
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
        .and_then(|t| t.with_second(0))
}

fn column_filters(params: &QueryParams, issues: &mut Vec<FilterIssue>) -> BTreeMap<usize, String> {
    let mut filters = BTreeMap::new();
    let mut seen: Vec<&str> = Vec::new();
    for key in params_with_prefix(params, "col") {
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        let Some(value) = params.value(key) else {
            continue;
        };
        let index = &key["col".len()..];
        match index.parse::<usize>().ok().filter(|i| column(*i).is_some()) {
            Some(i) => {
                filters.insert(i, value.to_owned());
            }
            None => issues.push(FilterIssue::UnknownColumnIndex {
                param: key.to_owned(),
                index: index.to_owned(),
            }),
        }
    }
    filters
}

fn params_with_prefix<'a>(params: &'a QueryParams, prefix: &'a str) -> Vec<&'a str> {
    params
        .keys()
        .filter(|k| {
            k.strip_prefix(prefix)
                .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
        })
        .collect()
}

fn parse_sort(params: &QueryParams, issues: &mut Vec<FilterIssue>) -> Sort {
    let dir = match params.value("sortDir") {
        Some(d) if d.trim().eq_ignore_ascii_case("asc") => SortDir::Asc,
        _ => SortDir::Desc,
    };
    let Some(raw) = params.value("sortColumn") else {
        return Sort { column: 0, dir };
    };
    match raw.trim().parse::<usize>() {
        Ok(i) if i < COLUMNS.len() => Sort { column: i, dir },
        _ => {
            issues.push(FilterIssue::UnknownColumnIndex {
                param: "sortColumn".into(),
                index: raw.to_owned(),
            });
            Sort::default()
        }
    }
}

fn parse_page(params: &QueryParams, max_limit: u32, issues: &mut Vec<FilterIssue>) -> Page {
    let mut page = Page::default();
    if let Some(raw) = params.value("offset") {
        match raw.trim().parse::<i64>() {
            Ok(n) => page.offset = n.max(0) as u64,
            Err(_) => issues.push(invalid("offset", raw)),
        }
    }
    if let Some(raw) = params.value("limit") {
        match raw.trim().parse::<i64>() {
            Ok(n) => page.limit = n.clamp(1, i64::from(max_limit.max(1))) as u32,
            Err(_) => issues.push(invalid("limit", raw)),
        }
    }
    page
}
