//! HTTP request handlers.

use std::time::Instant;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use prometheus::{Encoder, Registry, TextEncoder};
use tracing::{debug, error};

use crate::state::AppState;

const INDEX_HTML: &str = r#"<html>
<head><title>PgBouncer Metrics Exporter</title></head>
<body>
<h1>PgBouncer Metrics Exporter</h1>
<ul>
<li><a href='/metrics'>metrics</a></li>
<li><a href='/healthz'>healthz</a></li>
</ul>
</body>
</html>
"#;

// ============================================================
// Metrics
// ============================================================

/// Runs one scrape cycle and renders the text exposition format.
pub(crate) async fn handle_metrics(State(state): State<AppState>) -> Response {
    let registry = state.registry.clone();
    let t0 = Instant::now();

    // The console client blocks, keep it off the async workers.
    let result = tokio::task::spawn_blocking(move || encode(&registry)).await;

    match result {
        Ok(Ok((body, content_type))) => {
            debug!(
                bytes = body.len(),
                duration_ms = t0.elapsed().as_millis() as u64,
                "metrics served"
            );
            ([(header::CONTENT_TYPE, content_type)], body).into_response()
        }
        Ok(Err(e)) => {
            error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
        Err(e) => {
            error!(error = %e, "metrics gathering panicked");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "metrics gathering failed".to_string(),
            )
                .into_response()
        }
    }
}

fn encode(registry: &Registry) -> prometheus::Result<(Vec<u8>, String)> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    Ok((buffer, encoder.format_type().to_string()))
}

// ============================================================
// Health / index
// ============================================================

pub(crate) async fn handle_healthz() -> &'static str {
    "ok"
}

pub(crate) async fn handle_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
