//! ==============================================================================
//! web.rs - dashboard and json api
//! ==============================================================================
//!
//! routes:
//!     GET /              summary page (indicators + per-channel table)
//!     GET /api/readings  buffer snapshot, oldest first
//!     GET /api/summary   latest summary published by the refresh loop
//!     GET /health        liveness
//!
//! ==============================================================================

use crate::buffer::SharedBuffer;
use crate::domain::{Reading, Summary};

use anyhow::{Context, Result};
use axum::{
    extract::State,
    response::{Html, Json},
    routing::get,
    Router,
};
use std::fmt::Write as _;
use std::net::SocketAddr;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct WebState {
    pub buffer: SharedBuffer,
    pub summary: watch::Receiver<Summary>,
    /// page auto-refresh period
    pub refresh_secs: u64,
}

pub fn router(state: WebState) -> Router {
    Router::new()
        .route("/", get(dashboard_handler))
        .route("/api/readings", get(readings_handler))
        .route("/api/summary", get(summary_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_server(addr: SocketAddr, state: WebState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind dashboard on {}", addr))?;
    tracing::info!("Dashboard live at http://{}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn dashboard_handler(State(state): State<WebState>) -> Html<String> {
    let summary = state.summary.borrow().clone();
    Html(render_dashboard(&summary, state.refresh_secs))
}

/// json snapshot of the buffer
async fn readings_handler(State(state): State<WebState>) -> Json<Vec<Reading>> {
    Json(state.buffer.snapshot().await)
}

async fn summary_handler(State(state): State<WebState>) -> Json<Summary> {
    Json(state.summary.borrow().clone())
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

fn fmt_opt(v: Option<f64>, unit: &str) -> String {
    match v {
        Some(v) => format!("{:.2} {}", v, unit),
        None => "N/A".to_string(),
    }
}

/// plain html rendering of one summary
pub fn render_dashboard(summary: &Summary, refresh_secs: u64) -> String {
    let mut rows = String::new();
    for c in &summary.channels {
        let _ = write!(
            rows,
            "<tr><td>{}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td></tr>",
            html_escape(c.channel.label()),
            c.mean,
            c.min,
            c.max
        );
    }
    if rows.is_empty() {
        rows.push_str(r#"<tr><td colspan="4">waiting for sensor data…</td></tr>"#);
    }

    format!(
        r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<meta http-equiv="refresh" content="{refresh}">
<title>Greenhouse Monitor</title>
</head>
<body style="font-family: system-ui; padding: 2rem; background: #303030; color: #fff;">
    <h1>Greenhouse Sensor Dashboard</h1>
    <div style="display: flex; justify-content: space-around;">
        <div><h4>Max Temperature</h4><p id="max-temp">{max_temp}</p></div>
        <div><h4>Avg Temperature</h4><p id="avg-temp">{avg_temp}</p></div>
        <div><h4>Avg Humidity</h4><p id="avg-humidity">{avg_hum}</p></div>
        <div><h4>Readings</h4><p id="data-count">{count}</p><small id="capacity">of {capacity}</small></div>
        <div><h4>Rejected</h4><p id="rejected">{rejected}</p></div>
    </div>
    <table style="width: 100%; border-collapse: collapse;">
        <thead><tr><th>Channel</th><th>Mean</th><th>Min</th><th>Max</th></tr></thead>
        <tbody>{rows}</tbody>
    </table>
</body>
</html>"#,
        refresh = refresh_secs.max(1),
        max_temp = html_escape(&fmt_opt(summary.max_temperature, "°C")),
        avg_temp = html_escape(&fmt_opt(summary.avg_temperature, "°C")),
        avg_hum = html_escape(&fmt_opt(summary.avg_humidity, "%")),
        count = summary.count,
        capacity = summary.capacity,
        rejected = summary.ingest.rejected,
        rows = rows,
    )
}

/// escape html special characters to prevent xss
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats;

    async fn state_with(lines: &[&str]) -> WebState {
        let buffer = SharedBuffer::default();
        for (i, l) in lines.iter().enumerate() {
            buffer.append(l, i as u64).await.unwrap();
        }
        let (snap, ingest) = buffer.snapshot_with_stats().await;
        let summary = stats::summarize(&snap, buffer.capacity().await, ingest, 0);
        let (_tx, rx) = watch::channel(summary);
        WebState { buffer, summary: rx, refresh_secs: 2 }
    }

    #[test]
    fn test_render_empty() {
        let html = render_dashboard(&Summary::default(), 2);
        assert!(html.contains(r#"<p id="max-temp">N/A</p>"#));
        assert!(html.contains(r#"<p id="data-count">0</p>"#));
        assert!(html.contains("waiting for sensor data"));
    }

    #[tokio::test]
    async fn test_render_with_data() {
        let state = state_with(&["20,21,22,23.456,40,41,42,50,51,21.5"]).await;
        let Html(html) = dashboard_handler(State(state)).await;
        assert!(html.contains("23.46 °C"));
        assert!(html.contains("Soil Moisture 1 (%)"));
        assert!(html.contains(r#"content="2""#));
        assert!(html.contains(r#"<small id="capacity">of 100</small>"#));
    }

    #[tokio::test]
    async fn test_api_handlers() {
        let state = state_with(&[
            "20,21,22,23,40,41,42,50,51,21.5",
            "24,25,26,27,44,45,46,54,55,25.5",
        ])
        .await;

        let Json(rows) = readings_handler(State(state.clone())).await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].temperature_dht22, 24.0);

        let Json(summary) = summary_handler(State(state)).await;
        assert_eq!(summary.count, 2);
        assert_eq!(summary.max_temperature, Some(27.0));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["channels"][0]["channel"], "temperature_dht22");
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }
}
