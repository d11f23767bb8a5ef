//! Predicate, ordering and paging clauses for the device data view.
//!
//! Only identifiers from the fixed column table are ever written into SQL
//! text; every user-supplied value becomes a numbered bound parameter. The
//! same [`Predicate`] feeds the filtered count, the page query, exports,
//! statistics and the time series, so they cannot disagree about which rows
//! match.
//!
//! Used by: executor, store::sqlite.

use chrono::{NaiveDate, NaiveTime};

use crate::query::columns::{column, Column, COLUMNS, ID, MODIFIED_ON};
use crate::query::escape::{contains_pattern, LIKE_ESCAPE};
use crate::query::request::{FilterRequest, Page, Sort, SortDir};

#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Text(String),
    Date(NaiveDate),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    conditions: Vec<String>,
    params: Vec<Param>,
}

impl Predicate {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// `WHERE a AND b ...`, or an empty string when nothing constrains the rows.
    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }

    /// ANDs a server-owned condition that binds no parameters.
    pub fn and_static(mut self, condition: &'static str) -> Self {
        self.conditions.push(condition.to_owned());
        self
    }

    /// Binds `param` and returns its `?N` placeholder.
    pub fn bind(&mut self, param: Param) -> String {
        self.params.push(param);
        format!("?{}", self.params.len())
    }

    fn push(&mut self, condition: String) {
        self.conditions.push(condition);
    }
}

pub fn build_predicate(request: &FilterRequest) -> Predicate {
    let mut p = Predicate::default();

    for (field, values) in &request.multi_value {
        let name = field.column().name;
        match values.as_slice() {
            [] => {}
            [single] => {
                let ph = p.bind(Param::Text(single.clone()));
                p.push(format!("{name} = {ph}"));
            }
            many => {
                let phs: Vec<String> = many
                    .iter()
                    .map(|v| p.bind(Param::Text(v.clone())))
                    .collect();
                p.push(format!("{name} IN ({})", phs.join(", ")));
            }
        }
    }

    let modified_on = COLUMNS[MODIFIED_ON].name;
    if let Some(from) = request.dates.from {
        let ph = p.bind(Param::Date(from));
        p.push(format!("date({modified_on}) >= {ph}"));
    }
    if let Some(to) = request.dates.to {
        let ph = p.bind(Param::Date(to));
        p.push(format!("date({modified_on}) <= {ph}"));
    }
    if let Some(from) = request.times.from {
        let ph = p.bind(Param::Text(clock(from)));
        p.push(format!("strftime('%H:%M', {modified_on}) >= {ph}"));
    }
    if let Some(to) = request.times.to {
        let ph = p.bind(Param::Text(clock(to)));
        p.push(format!("strftime('%H:%M', {modified_on}) <= {ph}"));
    }

    if let Some(term) = &request.search {
        let ph = p.bind(Param::Text(contains_pattern(term)));
        let alternatives: Vec<String> = COLUMNS
            .iter()
            .filter(|c| c.globally_searchable())
            .map(|c| like(c, &ph))
            .collect();
        p.push(format!("({})", alternatives.join(" OR ")));
    }

    for (&index, value) in &request.column_filters {
        let Some(col) = column(index) else {
            tracing::warn!(index, "ignoring filter on unknown column");
            continue;
        };
        let ph = p.bind(Param::Text(contains_pattern(value)));
        p.push(like(col, &ph));
    }

    p
}

fn like(col: &Column, placeholder: &str) -> String {
    format!("{} LIKE {placeholder} ESCAPE '{LIKE_ESCAPE}'", col.text_expr())
}

fn clock(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

/// Resolves a sort index against the column table; unknown indices fall back
/// to the identifier column.
pub fn build_sort(column_index: usize) -> &'static Column {
    column(column_index).unwrap_or(&COLUMNS[ID])
}

pub fn order_clause(sort: Sort) -> String {
    let dir = if column(sort.column).is_some() { sort.dir } else { SortDir::Desc };
    format!("ORDER BY {} {}", build_sort(sort.column).name, dir.sql())
}

pub fn build_page(page: Page) -> String {
    format!("LIMIT {} OFFSET {}", page.limit.max(1), page.offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::columns::FilterField;
    use crate::query::request::Bounds;

    fn texts(p: &Predicate) -> Vec<&str> {
        p.params()
            .iter()
            .map(|param| match param {
                Param::Text(s) => s.as_str(),
                Param::Date(_) => "<date>",
            })
            .collect()
    }

    #[test]
    fn empty_request_matches_everything() {
        let p = build_predicate(&FilterRequest::default());
        assert!(p.is_empty());
        assert_eq!(p.where_clause(), "");
        assert!(p.params().is_empty());
    }

    #[test]
    fn single_value_is_equality() {
        let r = FilterRequest::default().with_values(FilterField::Region, &["Jih"]);
        let p = build_predicate(&r);
        assert_eq!(p.where_clause(), "WHERE DeviceRegion = ?1");
        assert_eq!(texts(&p), ["Jih"]);
    }

    #[test]
    fn multiple_values_bind_individually() {
        let r = FilterRequest::default().with_values(FilterField::Type, &["FM", "DAB", "TV"]);
        let p = build_predicate(&r);
        assert_eq!(p.conditions(), ["DeviceType IN (?1, ?2, ?3)"]);
        assert_eq!(texts(&p), ["FM", "DAB", "TV"]);
    }

    #[test]
    fn hostile_values_never_reach_sql_text() {
        let evil = "x'); DROP TABLE DeviceDataView; --";
        let mut r = FilterRequest::default().with_values(FilterField::Device, &[evil]);
        r.search = Some(evil.into());
        r.column_filters.insert(2, evil.into());
        let p = build_predicate(&r);
        let sql = p.where_clause();
        assert!(!sql.contains("DROP"));
        assert!(!sql.contains(evil));
        assert_eq!(p.params().len(), 3);
    }

    #[test]
    fn date_and_time_bounds() {
        let r = FilterRequest {
            dates: Bounds {
                from: NaiveDate::from_ymd_opt(2024, 1, 1),
                to: NaiveDate::from_ymd_opt(2024, 1, 31),
            },
            times: Bounds { from: NaiveTime::from_hms_opt(9, 0, 0), to: NaiveTime::from_hms_opt(10, 0, 0) },
            ..FilterRequest::default()
        };
        let p = build_predicate(&r);
        assert_eq!(
            p.conditions(),
            [
                "date(ModifiedOn) >= ?1",
                "date(ModifiedOn) <= ?2",
                "strftime('%H:%M', ModifiedOn) >= ?3",
                "strftime('%H:%M', ModifiedOn) <= ?4",
            ]
        );
        assert_eq!(p.params()[0], Param::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        assert_eq!(texts(&p)[2..], ["09:00", "10:00"]);
    }

    #[test]
    fn global_search_spans_display_columns_with_one_parameter() {
        let r = FilterRequest { search: Some("50%".into()), ..FilterRequest::default() };
        let p = build_predicate(&r);
        let cond = &p.conditions()[0];
        assert!(cond.starts_with("(CAST(Id AS TEXT) LIKE ?1 ESCAPE '\\'"));
        assert!(cond.contains("fold(Name) LIKE ?1"));
        assert!(cond.contains("strftime('%Y-%m-%d %H:%M:%f', ModifiedOn) LIKE ?1"));
        assert!(!cond.contains("NewValueReal"));
        assert_eq!(cond.matches(" OR ").count(), 9);
        assert_eq!(texts(&p), ["%50\\%%"]);
    }

    #[test]
    fn per_column_filters_cast_by_kind() {
        let mut r = FilterRequest::default();
        r.column_filters.insert(0, "12".into());
        r.column_filters.insert(1, "09:4".into());
        r.column_filters.insert(3, "Střed".into());
        r.column_filters.insert(11, "2.5".into());
        let p = build_predicate(&r);
        assert_eq!(
            p.conditions(),
            [
                "CAST(Id AS TEXT) LIKE ?1 ESCAPE '\\'",
                "strftime('%Y-%m-%d %H:%M:%f', ModifiedOn) LIKE ?2 ESCAPE '\\'",
                "fold(DeviceRegion) LIKE ?3 ESCAPE '\\'",
                "CAST(NewValueReal AS TEXT) LIKE ?4 ESCAPE '\\'",
            ]
        );
        assert_eq!(texts(&p), ["%12%", "%09:4%", "%stred%", "%2.5%"]);
    }

    #[test]
    fn unknown_column_filter_is_ignored() {
        let mut r = FilterRequest::default();
        r.column_filters.insert(999, "x".into());
        assert!(build_predicate(&r).is_empty());
    }

    #[test]
    fn fragments_join_with_and() {
        let mut r = FilterRequest::default().with_values(FilterField::Region, &["Jih"]);
        r.column_filters.insert(2, "Brno".into());
        let p = build_predicate(&r).and_static("NewValueReal IS NOT NULL");
        assert_eq!(
            p.where_clause(),
            "WHERE DeviceRegion = ?1 AND fold(Name) LIKE ?2 ESCAPE '\\' AND NewValueReal IS NOT NULL"
        );
    }

    #[test]
    fn sort_falls_back_to_id_desc() {
        assert_eq!(build_sort(2).name, "Name");
        assert_eq!(build_sort(999).name, "Id");
        assert_eq!(order_clause(Sort { column: 999, dir: SortDir::Asc }), "ORDER BY Id DESC");
        assert_eq!(order_clause(Sort { column: 1, dir: SortDir::Asc }), "ORDER BY ModifiedOn ASC");
        assert_eq!(order_clause(Sort::default()), "ORDER BY Id DESC");
    }

    #[test]
    fn page_clause_uses_offset_and_limit() {
        assert_eq!(build_page(Page { offset: 20, limit: 10 }), "LIMIT 10 OFFSET 20");
        assert_eq!(build_page(Page { offset: 0, limit: 0 }), "LIMIT 1 OFFSET 0");
    }
}
