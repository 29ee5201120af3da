use crate::server::AppState;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use beer_observability::CONTENT_TYPE;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

/// Header Prometheus sends with the scrape's own timeout, in seconds.
pub const SCRAPE_TIMEOUT_HEADER: &str = "x-prometheus-scrape-timeout-seconds";

pub async fn metrics(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let deadline = scrape_deadline(&headers, state.scrape_timeout, state.scrape_timeout_offset);
    match state.registry.render(deadline).await {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("# Error encoding metrics: {e}"),
            )
                .into_response()
        }
    }
}

/// Time budget for one scrape. Uses the scraper's advertised timeout minus
/// `offset` (when that stays positive), never more than `max`. Falls back to
/// `max` when the header is missing or unparsable.
pub fn scrape_deadline(headers: &HeaderMap, max: Duration, offset: Duration) -> Duration {
    let advertised = headers
        .get(SCRAPE_TIMEOUT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs > 0.0)
        .map(Duration::from_secs_f64);

    match advertised {
        Some(timeout) => {
            let budget = if timeout > offset { timeout - offset } else { timeout };
            budget.min(max)
        }
        None => max,
    }
}
