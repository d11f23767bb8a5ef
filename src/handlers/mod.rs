//! HTTP handler modules.
//! Used by: server.

pub mod export;
pub mod facets;
pub mod health;
pub mod metrics;
pub mod records;
pub mod stats;
pub mod timeseries;

use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};

use crate::query::params::QueryParams;
use crate::query::request::FilterRequest;
use crate::state::AppStateInner;

pub const TRUNCATED_HEADER: HeaderName = HeaderName::from_static("x-export-truncated");

/// Decodes the raw query string into a filter request. Ignored parameters
/// are logged and counted but never fail the request.
pub(crate) fn parse_request(state: &AppStateInner, raw: Option<&str>) -> (FilterRequest, QueryParams) {
    let params = QueryParams::parse(raw);
    let parsed = FilterRequest::from_params(&params, state.page_max_limit());
    if !parsed.issues.is_empty() {
        for issue in &parsed.issues {
            tracing::warn!(%issue, "ignoring request parameter");
        }
        state.metrics.record_dropped_filters(parsed.issues.len());
    }
    (parsed.request, params)
}

pub(crate) fn attachment(content_type: &'static str, filename: &str, body: Vec<u8>, truncated: bool) -> Response {
    let disposition = format!("attachment; filename=\"{filename}\"");
    let mut response = ([(CONTENT_TYPE, content_type.to_owned()), (CONTENT_DISPOSITION, disposition)], body)
        .into_response();
    if truncated {
        response
            .headers_mut()
            .insert(TRUNCATED_HEADER, HeaderValue::from_static("true"));
    }
    response
}
