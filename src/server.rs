//! Axum router and server setup.
//! Used by: main.

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/metrics", get(handlers::metrics::metrics))
        .route("/records", get(handlers::records::records))
        .route("/records/export", get(handlers::export::export))
        .route("/facets", get(handlers::facets::facets))
        .route("/timeseries", get(handlers::timeseries::timeseries))
        .route("/timeseries/export", get(handlers::timeseries::export))
        .route("/stats", get(handlers::stats::stats))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run(state: AppState, addr: &str) -> std::io::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", addr);
    axum::serve(listener, router).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, Bytes};
    use axum::http::{header, HeaderMap, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::error::Result;
    use crate::export::XLSX_CONTENT_TYPE;
    use crate::handlers::TRUNCATED_HEADER;
    use crate::state::{build_test_state, AppStateInner};
    use crate::store::registry::DataSources;
    use crate::store::sqlite::fixtures::{seeded, ROW_COUNT};
    use crate::telemetry::Metrics;

    async fn get(state: &AppState, uri: &str) -> (StatusCode, HeaderMap, Bytes) {
        let request = Request::builder().uri(uri).body(Body::empty()).expect("request");
        let response = build_router(Arc::clone(state)).oneshot(request).await.expect("infallible");
        let (parts, body) = response.into_parts();
        let bytes = body.collect().await.expect("body").to_bytes();
        (parts.status, parts.headers, bytes)
    }

    async fn get_json(state: &AppState, uri: &str) -> Result<(StatusCode, Value)> {
        let (status, _, body) = get(state, uri).await;
        Ok((status, serde_json::from_slice(&body)?))
    }

    fn header_str<'a>(headers: &'a HeaderMap, name: impl header::AsHeaderName) -> &'a str {
        headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or_default()
    }

    #[tokio::test]
    async fn health_lists_sources() -> Result<()> {
        let state = build_test_state()?;
        let (status, body) = get_json(&state, "/health").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["sources"][1]["source"], "secondary");
        assert_eq!(body["sources"][0]["connected"], true);
        Ok(())
    }

    #[tokio::test]
    async fn records_page_with_filters() -> Result<()> {
        let state = build_test_state()?;
        let (status, body) =
            get_json(&state, "/records?draw=4&region[]=Jih&limit=2&sortColumn=0&sortDir=asc").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["draw"], 4);
        assert_eq!(body["total"], ROW_COUNT);
        assert_eq!(body["filtered"], 3);
        assert_eq!(body["rows"][0]["Id"], 2);
        assert_eq!(body["rows"][1]["Id"], 41);
        assert!(body.get("error").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn hostile_filters_match_nothing_and_leave_data_intact() -> Result<()> {
        let state = build_test_state()?;
        let uri = "/records?device=x%27%29%3B%20DROP%20TABLE%20DeviceDataView%3B--&search=%27%20OR%201%3D1%20--";
        let (status, body) = get_json(&state, uri).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["filtered"], 0);
        let (_, body) = get_json(&state, "/records").await?;
        assert_eq!(body["total"], ROW_COUNT);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_parameters_are_counted_not_rejected() -> Result<()> {
        let state = build_test_state()?;
        let (status, body) = get_json(&state, "/records?col99=x&dateFrom=yesterday&limit=5").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["filtered"], ROW_COUNT);
        let (_, metrics) = get_json(&state, "/metrics").await?;
        assert_eq!(metrics["dropped_filters"], 2);
        assert_eq!(metrics["list_requests"], 1);
        assert_eq!(metrics["connected_sources"], serde_json::json!(["primary", "secondary"]));
        Ok(())
    }

    #[tokio::test]
    async fn csv_export_honours_visible_columns() -> Result<()> {
        let state = build_test_state()?;
        let (status, headers, body) =
            get(&state, "/records/export?format=csv&visibleColumns=0,2,4&region=Jih").await;
        assert_eq!(status, StatusCode::OK);
        assert!(header_str(&headers, header::CONTENT_TYPE).starts_with("text/csv"));
        let disposition = header_str(&headers, header::CONTENT_DISPOSITION);
        assert!(disposition.starts_with("attachment; filename=\"historian_export_"));
        assert!(disposition.ends_with(".csv\""));
        assert!(headers.get(TRUNCATED_HEADER).is_none());

        let text = String::from_utf8_lossy(&body);
        let mut lines = text.trim_start_matches('\u{feff}').lines();
        assert_eq!(lines.next(), Some("\"Id\";\"Device\";\"Locality\""));
        assert_eq!(lines.count(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn xlsx_export_accepts_short_alias() -> Result<()> {
        let state = build_test_state()?;
        let (status, headers, body) = get(&state, "/records/export?format=xlsx&visibleCols=1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(header_str(&headers, header::CONTENT_TYPE), XLSX_CONTENT_TYPE);
        assert!(body.starts_with(b"PK"));
        Ok(())
    }

    #[tokio::test]
    async fn unsupported_export_format_is_rejected() -> Result<()> {
        let state = build_test_state()?;
        let (status, body) = get_json(&state, "/records/export?format=pdf").await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap_or_default().contains("pdf"));
        Ok(())
    }

    #[tokio::test]
    async fn export_over_cap_is_flagged() -> Result<()> {
        let state = Arc::new(AppStateInner {
            config: Config { export_max_rows: 3, ..Config::default() },
            sources: DataSources::preloaded(seeded()?, seeded()?),
            metrics: Metrics::new(),
        });
        let (status, headers, body) = get(&state, "/records/export?visibleColumns=0").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(header_str(&headers, TRUNCATED_HEADER), "true");
        assert_eq!(String::from_utf8_lossy(&body).lines().count(), 4);
        assert_eq!(state.metrics.snapshot().exports_truncated, 1);
        Ok(())
    }

    #[tokio::test]
    async fn facets_for_backup_source() -> Result<()> {
        let state = build_test_state()?;
        let (status, body) = get_json(&state, "/facets?dataSource=backup").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["types"], serde_json::json!(["DAB", "FM", "TV"]));
        assert_eq!(body["frequencies"], serde_json::json!(["100", "200", "300"]));
        Ok(())
    }

    #[tokio::test]
    async fn timeseries_requires_device_and_property() -> Result<()> {
        let state = build_test_state()?;
        let (status, body) = get_json(&state, "/timeseries?device=Brno%20Hub").await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap_or_default().contains("property"));
        Ok(())
    }

    #[tokio::test]
    async fn timeseries_returns_ordered_points() -> Result<()> {
        let state = build_test_state()?;
        let (status, body) =
            get_json(&state, "/timeseries?device=Ostrava%20Relay&property=Temperature").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert_eq!(body["points"][0]["value"], 21.5);
        assert_eq!(body["points"][1]["value"], 22.0);

        let (_, body) = get_json(
            &state,
            "/timeseries?device=Ostrava%20Relay&property=Temperature&colTimeSearch=2024-01-05",
        )
        .await?;
        assert_eq!(body["count"], 1);
        Ok(())
    }

    #[tokio::test]
    async fn timeseries_export_is_named_after_series() -> Result<()> {
        let state = build_test_state()?;
        let (status, headers, _) =
            get(&state, "/timeseries/export?device=Ostrava%20Relay&property=Temperature").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(header_str(&headers, header::CONTENT_TYPE), XLSX_CONTENT_TYPE);
        assert!(header_str(&headers, header::CONTENT_DISPOSITION)
            .contains("filename=\"chart_Ostrava_Relay_Temperature_"));
        Ok(())
    }

    #[tokio::test]
    async fn stats_follow_filters() -> Result<()> {
        let state = build_test_state()?;
        let (status, body) = get_json(&state, "/stats?region=Jih").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count1h"], 0);
        assert_eq!(body["topDevice"], "Brno Hub");
        assert_eq!(body["topProperty"], "Power");
        assert_eq!(body["topFrequency"], "200");
        Ok(())
    }
}
