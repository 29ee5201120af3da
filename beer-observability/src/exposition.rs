use prometheus::proto::MetricFamily;
use prometheus::{Encoder, TextEncoder};

/// `Content-Type` of the text exposition format.
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

/// Render metric families in the prometheus text exposition format.
pub fn encode_text(families: &[MetricFamily]) -> prometheus::Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
