//! Chart series for a single device and property, plus its XLSX download.
//! Used by: server.

use axum::extract::{RawQuery, State};
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::executor;
use crate::export::xlsx::{chart_filename, write_series};
use crate::export::XLSX_CONTENT_TYPE;
use crate::handlers::{attachment, parse_request};
use crate::query::columns::{FilterField, MODIFIED_ON};
use crate::query::params::QueryParams;
use crate::query::request::FilterRequest;
use crate::state::{AppState, AppStateInner};
use crate::store::sqlite::Point;

#[derive(Debug, Serialize)]
pub struct Series {
    pub device: String,
    pub property: String,
    pub count: usize,
    pub points: Vec<Point>,
}

/// Only the source, the date and time bounds and `colTimeSearch` carry over
/// from the grid; device and property are mandatory and single-valued.
fn series_request(base: FilterRequest, params: &QueryParams) -> Result<(String, String, FilterRequest)> {
    let required = |key: &str| {
        params
            .value(key)
            .map(|v| v.trim().to_owned())
            .ok_or_else(|| Error::Validation(format!("{key} is required")))
    };
    let device = required(FilterField::Device.key())?;
    let property = required(FilterField::Property.key())?;

    let mut request = FilterRequest {
        data_source: base.data_source,
        dates: base.dates,
        times: base.times,
        ..FilterRequest::default()
    }
    .with_values(FilterField::Device, &[device.as_str()])
    .with_values(FilterField::Property, &[property.as_str()]);
    if let Some(term) = params.value("colTimeSearch") {
        request.column_filters.insert(MODIFIED_ON, term.to_owned());
    }
    Ok((device, property, request))
}

async fn load(state: &AppStateInner, raw: Option<&str>) -> Result<Series> {
    let (base, params) = parse_request(state, raw);
    let (device, property, request) = series_request(base, &params)?;
    let points = executor::time_series(state, &request).await?;
    Ok(Series { device, property, count: points.len(), points })
}

pub async fn timeseries(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Result<Json<Series>> {
    Ok(Json(load(&state, raw.as_deref()).await?))
}

pub async fn export(State(state): State<AppState>, RawQuery(raw): RawQuery) -> Result<Response> {
    let series = load(&state, raw.as_deref()).await?;
    let filename = chart_filename(&series.device, &series.property, chrono::Utc::now().naive_utc());
    let body = tokio::task::spawn_blocking(move || write_series(&series.device, &series.property, &series.points))
        .await
        .map_err(|e| Error::Internal(e.to_string()))??;
    state.metrics.record_export(false);
    Ok(attachment(XLSX_CONTENT_TYPE, &filename, body, false))
}
