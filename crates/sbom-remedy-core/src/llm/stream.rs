use serde_json::Value;
use tracing::{debug, warn};

/// Substituted when a completed stream carried no usable content.
pub const EMPTY_STREAM_PLACEHOLDER: &str =
    "No remediation script generated. Please verify the prompt or model.";

/// Reconstitute a model response from a newline-delimited JSON event stream.
///
/// Each line is expected to be a JSON object carrying a `message.content`
/// string; those fragments are concatenated in order. Lines that fail to
/// parse, or parse but lack the field, are logged and skipped rather than
/// aborting the stream. The result is never empty: a stream with zero usable
/// content yields [`EMPTY_STREAM_PLACEHOLDER`].
pub fn aggregate_response_lines<'a, I>(lines: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut aggregated = String::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(err) => {
                warn!(%err, "skipping unparseable stream line");
                continue;
            }
        };
        match value.pointer("/message/content").and_then(Value::as_str) {
            Some(content) => aggregated.push_str(content),
            None => debug!("stream line carried no message content"),
        }
    }

    if aggregated.is_empty() {
        warn!("stream completed with no content; substituting placeholder");
        return EMPTY_STREAM_PLACEHOLDER.to_string();
    }
    aggregated
}
