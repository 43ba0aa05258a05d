//! Status API route handlers.
//!
//! Every handler reads a snapshot from the shared `StationContext`; none of
//! them block ingestion for longer than one lock acquisition.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use chrono::DateTime;
use serde_json::json;

use aprs_core::StationContext;

use crate::web::AppState;

/// Content type for GraphViz DOT text.
const DOT_CONTENT_TYPE: &str = "text/vnd.graphviz; charset=utf-8";

// ---------------------------------------------------------------------------
// Text renderers
// ---------------------------------------------------------------------------

/// Unix seconds as `YYYY-MM-DDTHH:MM:SS` (UTC).
pub fn format_time(timestamp: f64) -> String {
    let secs = timestamp.floor() as i64;
    DateTime::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string())
        .unwrap_or_default()
}

fn format_distance(distance: Option<f64>) -> String {
    distance.map(|d| format!("{d:.4}")).unwrap_or_default()
}

/// Heard list as CSV: `MYCALL,<call>` then `call,last-heard,distance`.
pub fn render_mheard(station: &StationContext) -> String {
    let mut out = format!("MYCALL,{}\n", station.my_call());
    for h in station.heard() {
        out.push_str(&format!(
            "{},{},{}\n",
            h.call,
            format_time(h.last_heard),
            format_distance(h.distance)
        ));
    }
    out
}

/// Plain-text status summary.
pub fn render_status(station: &StationContext) -> String {
    format!(
        "NODES: {}\nSTATIONS: {}\nMAX_DISTANCE: {}\n",
        station.vertex_count(),
        station.heard_count(),
        format_distance(station.max_distance())
    )
}

// ---------------------------------------------------------------------------
// Text endpoints
// ---------------------------------------------------------------------------

/// GET /mheard: heard list CSV.
pub async fn mheard(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
        render_mheard(&state.station),
    )
}

/// GET /graph: station graph in DOT format.
pub async fn graph(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, DOT_CONTENT_TYPE)],
        state.station.graph().output_graph(),
    )
}

/// GET /status: node count and max distance.
pub async fn status(State(state): State<Arc<AppState>>) -> String {
    render_status(&state.station)
}

// ---------------------------------------------------------------------------
// JSON endpoints
// ---------------------------------------------------------------------------

/// GET /api/heard
pub async fn api_heard(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.station.heard())
}

/// GET /api/edges: edge list for graph renderers.
pub async fn api_edges(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.station.graph().edges())
}

/// GET /api/status
pub async fn api_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let station = &state.station;
    let position = station.position();
    Json(json!({
        "mycall": station.my_call(),
        "position": position,
        "units": station.radius_mode(),
        "nodes": station.vertex_count(),
        "vertices": station.graph().vertices(),
        "edges": station.graph().edge_count(),
        "stations": station.heard_count(),
        "max_distance": station.max_distance(),
        "ingest": station.stats(),
        "uptime_sec": crate::capture::now() - state.started,
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use aprs_core::{Position, RadiusMode};

    fn test_state() -> Arc<AppState> {
        let station = StationContext::new("N7MKO", Position::fixed(47.6, 122.3), RadiusMode::Miles);
        station
            .ingest_line("BALDI>APOT21,WIDE2-1:!4713.13N/12150.61W_PHG7830", 1714582931.0)
            .unwrap();
        station
            .ingest_line("W7OMR>TW5PPS,CRYSTL,ERINB,JUPITR*,WIDE2:`2?vm\"Ak/\"4u}13.2V", 1714582940.0)
            .unwrap();
        Arc::new(AppState {
            station: Arc::new(station),
            started: 0.0,
        })
    }

    async fn get(uri: &str) -> (StatusCode, String) {
        let app = crate::web::build_router(test_state());
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(1714582931.7), "2024-05-01T17:02:11");
        assert_eq!(format_time(0.0), "1970-01-01T00:00:00");
    }

    #[test]
    fn test_render_status_empty() {
        let station = StationContext::default();
        assert_eq!(
            render_status(&station),
            "NODES: 0\nSTATIONS: 0\nMAX_DISTANCE: \n"
        );
    }

    #[tokio::test]
    async fn test_mheard_csv() {
        let (status, body) = get("/mheard").await;
        assert_eq!(status, StatusCode::OK);
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines[0], "MYCALL,N7MKO");
        assert!(lines[1].starts_with("BALDI,2024-05-01T17:02:11,49.3"));
        assert_eq!(lines[2], "W7OMR,2024-05-01T17:02:20,");
        assert_eq!(lines.len(), 3);
    }

    #[tokio::test]
    async fn test_graph_dot() {
        let (status, body) = get("/graph").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("graph G {\n\n"));
        assert!(body.ends_with('}'));
        assert!(body.contains("\t\"BALDI\" -- \"N7MKO\";\n"));
        assert!(body.contains("\t\"JUPITR\" -- \"N7MKO\";\n"));
        assert_eq!(body.matches(" -- ").count(), 5);
    }

    #[tokio::test]
    async fn test_status_text() {
        let (status, body) = get("/status").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("NODES: 6\nSTATIONS: 2\nMAX_DISTANCE: 49.3"));
    }

    #[tokio::test]
    async fn test_api_edges() {
        let (status, body) = get("/api/edges").await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_str(&body).unwrap();
        let edges = json.as_array().unwrap();
        assert_eq!(edges.len(), 5);
        assert!(edges
            .iter()
            .any(|e| e["a"] == "CRYSTL" && e["b"] == "W7OMR"));
    }

    #[tokio::test]
    async fn test_api_status() {
        let (status, body) = get("/api/status").await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["mycall"], "N7MKO");
        assert_eq!(json["nodes"], 6);
        assert_eq!(json["vertices"].as_array().unwrap().len(), 6);
        assert_eq!(json["vertices"][0], "BALDI");
        assert_eq!(json["stations"], 2);
        assert_eq!(json["units"], "miles");
        assert_eq!(json["ingest"]["decoded"], 2);
    }

    #[tokio::test]
    async fn test_api_heard() {
        let (_, body) = get("/api/heard").await;
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json[0]["call"], "BALDI");
        assert_eq!(json[1]["distance"], Value::Null);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, _) = get("/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
