use crate::server::AppState;
use axum::extract::State;
use axum::response::Html;
use std::sync::Arc;

pub async fn landing(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(landing_page(&state.metrics_path))
}

/// Static landing page linking to the metrics path.
pub fn landing_page(metrics_path: &str) -> String {
    format!(
        r#"<html>
<head><title>Beer Exporter</title></head>
<body>
<h1>Beer Exporter</h1>
<p><a href='{path}'>Metrics</a></p>
</body>
</html>
"#,
        path = escape_html(metrics_path)
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
