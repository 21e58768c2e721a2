//! Decode the compact encoding back to canonical JSON when the output
//! format calls for it and the payload looks like the compact form.
//! Decoding failure logs a warning and passes the raw payload through
//! unchanged rather than erroring the request.

use gateway_core::toon;
use gateway_core::types::OutputFormat;
use tracing::warn;

/// If `output_format == json` and `text` is recognizable as the compact
/// form, decode it to canonical JSON text. Otherwise return `text`
/// unchanged.
pub fn maybe_decode(text: &str, output_format: OutputFormat) -> String {
    if output_format != OutputFormat::Json {
        return text.to_string();
    }
    if !toon::looks_like_toon(text) {
        return text.to_string();
    }
    match toon::decode(text) {
        Some(value) => serde_json::to_string(&value).unwrap_or_else(|_| text.to_string()),
        None => {
            warn!("output looked like compact-encoded but failed to decode; passing through raw");
            text.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_recognizable_compact_payload() {
        let encoded = toon::encode(&serde_json::json!({"query": "hi", "response": "there"}));
        let decoded = maybe_decode(&encoded, OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&decoded).unwrap();
        assert_eq!(value["query"], "hi");
        assert_eq!(value["response"], "there");
    }

    #[test]
    fn leaves_plain_text_unchanged() {
        let text = "just a normal sentence.";
        assert_eq!(maybe_decode(text, OutputFormat::Json), text);
    }

    #[test]
    fn toon_output_format_skips_decode() {
        let encoded = toon::encode(&serde_json::json!({"query": "hi"}));
        assert_eq!(maybe_decode(&encoded, OutputFormat::Toon), encoded);
    }
}
