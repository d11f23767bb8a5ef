//! Runs store work off the async runtime under a bounded timeout and shapes
//! the results for the HTTP layer.
//! Used by: handlers.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::query::builder::build_predicate;
use crate::query::request::{DataSource, FilterRequest};
use crate::state::AppStateInner;
use crate::store::sqlite::{Facets, Point, Record, Stats, Store};

const HAS_REAL_VALUE: &str = "NewValueReal IS NOT NULL";

#[derive(Debug, Serialize)]
pub struct ResultEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw: Option<i64>,
    pub offset: u64,
    pub limit: u32,
    pub total: u64,
    pub filtered: u64,
    pub rows: Vec<Record>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResultEnvelope {
    fn failed(request: &FilterRequest, error: String) -> Self {
        Self {
            draw: request.draw,
            offset: request.page.offset,
            limit: request.page.limit,
            total: 0,
            filtered: 0,
            rows: Vec::new(),
            error: Some(error),
        }
    }
}

#[derive(Debug)]
pub struct ExportRows {
    pub rows: Vec<Record>,
    pub truncated: bool,
}

/// Runs `work` against the store for `source` on the blocking pool. A call
/// that outlives the configured timeout fails with `StoreUnavailable`; the
/// blocking task itself runs to completion and its result is discarded.
pub async fn run<T, F>(state: &AppStateInner, source: DataSource, work: F) -> Result<T>
where
    F: FnOnce(&Store) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let store = state.sources.get(source).await?;
    let timeout = state.config.query_timeout;
    let task = tokio::task::spawn_blocking(move || work(&store));
    match tokio::time::timeout(timeout, task).await {
        Ok(joined) => joined.map_err(|e| Error::Internal(e.to_string()))?,
        Err(_) => {
            state.metrics.record_timeout();
            tracing::warn!(%source, timeout_secs = timeout.as_secs(), "store call timed out");
            Err(Error::StoreUnavailable(format!(
                "{source} did not answer within {}s",
                timeout.as_secs()
            )))
        }
    }
}

/// Grid listing. Never fails: store errors produce an empty envelope that
/// carries the error message.
pub async fn list(state: &AppStateInner, request: &FilterRequest) -> ResultEnvelope {
    state.metrics.record_list();
    let predicate = build_predicate(request);
    let (sort, page) = (request.sort, request.page);
    let outcome = run(state, request.data_source, move |store| {
        store.list(&predicate, sort, page)
    })
    .await;

    match outcome {
        Ok(listing) => ResultEnvelope {
            draw: request.draw,
            offset: page.offset,
            limit: page.limit,
            total: listing.total,
            filtered: listing.filtered,
            rows: listing.rows,
            error: None,
        },
        Err(e) => {
            state.metrics.record_store_failure();
            tracing::error!(source = %request.data_source, error = %e, "record listing failed");
            ResultEnvelope::failed(request, e.to_string())
        }
    }
}

/// Every matching row in grid order, capped at the configured export size.
pub async fn export(state: &AppStateInner, request: &FilterRequest) -> Result<ExportRows> {
    let predicate = build_predicate(request);
    let sort = request.sort;
    let cap = state.config.export_max_rows;
    let (rows, truncated) = run(state, request.data_source, move |store| {
        store.export_rows(&predicate, sort, cap)
    })
    .await
    .inspect_err(|_| state.metrics.record_store_failure())?;

    state.metrics.record_export(truncated);
    if truncated {
        tracing::warn!(cap, source = %request.data_source, "export truncated at row cap");
    }
    Ok(ExportRows { rows, truncated })
}

pub async fn facets(state: &AppStateInner, source: DataSource) -> Result<Facets> {
    run(state, source, |store| store.facets())
        .await
        .inspect_err(|_| state.metrics.record_store_failure())
}

/// Points with a real value, oldest first, capped at the configured count.
pub async fn time_series(state: &AppStateInner, request: &FilterRequest) -> Result<Vec<Point>> {
    let predicate = build_predicate(request).and_static(HAS_REAL_VALUE);
    let cap = state.config.chart_max_points;
    run(state, request.data_source, move |store| {
        store.time_series(&predicate, cap)
    })
    .await
    .inspect_err(|_| state.metrics.record_store_failure())
}

pub async fn stats(state: &AppStateInner, request: &FilterRequest) -> Result<Stats> {
    let predicate = build_predicate(request);
    let now = chrono::Utc::now().naive_utc();
    run(state, request.data_source, move |store| store.stats(&predicate, now))
        .await
        .inspect_err(|_| state.metrics.record_store_failure())
}
