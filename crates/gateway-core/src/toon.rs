//! TOON ("token-oriented object notation") compact encode/decode
//! A lossless,
//! reversible shorthand for a JSON value that shortens a prompt by
//! abbreviating a fixed key dictionary, shrinking the three JSON scalar
//! sentinels, and dropping quotes around identifier-like keys.
//!
//! Encode lives here because Sentinel and Guardian must agree byte-for-byte
//! on the dictionary and token grammar — encode (Sentinel) and decode
//! (Guardian) are specified as exact inverses of each other.

use serde_json::Value;

/// Fixed key abbreviation dictionary. Order matters only for readability;
/// lookups are by exact key match in both directions.
const KEY_DICTIONARY: &[(&str, &str)] = &[
    ("query", "q"),
    ("response", "r"),
    ("message", "msg"),
    ("content", "c"),
    ("role", "rl"),
    ("system_prompt", "sp"),
    ("model", "m"),
    ("temperature", "tmp"),
    ("max_tokens", "mt"),
    ("metadata", "md"),
    ("timestamp", "ts"),
    ("user", "u"),
    ("assistant", "a"),
    ("settings", "st"),
    ("moderation", "mod"),
];

fn abbreviate(key: &str) -> &str {
    KEY_DICTIONARY
        .iter()
        .find(|(full, _)| *full == key)
        .map(|(_, short)| *short)
        .unwrap_or(key)
}

fn expand(key: &str) -> &str {
    KEY_DICTIONARY
        .iter()
        .find(|(_, short)| *short == key)
        .map(|(full, _)| *full)
        .unwrap_or(key)
}

/// An identifier-like key (`[A-Za-z_][A-Za-z0-9_]*`) can have its quotes
/// dropped in the encoded form.
fn is_identifier_like(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Encode a JSON value into its compact TOON form. Keys are abbreviated via
/// the dictionary, scalars are shortened (`null`->`~`, `true`->`T`,
/// `false`->`F`), identifier-like keys are unquoted, and insignificant
/// whitespace is removed.
pub fn encode(value: &Value) -> String {
    let mut out = String::new();
    encode_value(value, &mut out);
    out
}

fn encode_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push('~'),
        Value::Bool(true) => out.push('T'),
        Value::Bool(false) => out.push('F'),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => {
            out.push('"');
            out.push_str(&s.replace('\\', "\\\\").replace('"', "\\\""));
            out.push('"');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                encode_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, val)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let short = abbreviate(key);
                if is_identifier_like(short) {
                    out.push_str(short);
                } else {
                    out.push('"');
                    out.push_str(short);
                    out.push('"');
                }
                out.push(':');
                encode_value(val, out);
            }
            out.push('}');
        }
    }
}

/// Decode a TOON-encoded payload back to canonical JSON. Returns `None` if
/// the payload doesn't parse as valid TOON grammar; the caller (Guardian
/// §4.3.3) logs a warning and returns the raw payload unchanged in that case.
pub fn decode(input: &str) -> Option<Value> {
    let mut parser = Parser { chars: input.trim().chars().peekable(), };
    let value = parser.parse_value()?;
    parser.skip_whitespace();
    if parser.chars.peek().is_some() {
        return None;
    }
    Some(value)
}

/// Heuristic check used by Guardian to decide whether a payload looks like
/// TOON before attempting a full decode: recognizable as the compact form
/// by its unquoted keys and ~/T/F tokens.
pub fn looks_like_toon(input: &str) -> bool {
    let trimmed = input.trim();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return false;
    }
    trimmed.contains('~')
        || trimmed.contains(":T")
        || trimmed.contains(":F")
        || trimmed.contains(",T")
        || trimmed.contains(",F")
        || KEY_DICTIONARY.iter().any(|(_, short)| trimmed.contains(&format!("{short}:")))
}

struct Parser<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Parser<'a> {
    fn skip_whitespace(&mut self) {
        while matches!(self.chars.peek(), Some(c) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn parse_value(&mut self) -> Option<Value> {
        self.skip_whitespace();
        match self.chars.peek()? {
            '{' => self.parse_object(),
            '[' => self.parse_array(),
            '"' => self.parse_string().map(Value::String),
            '~' => {
                self.chars.next();
                Some(Value::Null)
            }
            'T' => {
                self.chars.next();
                Some(Value::Bool(true))
            }
            'F' => {
                self.chars.next();
                Some(Value::Bool(false))
            }
            c if c.is_ascii_digit() || *c == '-' => self.parse_number(),
            c if c.is_ascii_alphabetic() || *c == '_' => self.parse_bare_key().map(|s| Value::String(s)),
            _ => None,
        }
    }

    fn parse_object(&mut self) -> Option<Value> {
        self.chars.next();
        let mut map = serde_json::Map::new();
        self.skip_whitespace();
        if self.chars.peek() == Some(&'}') {
            self.chars.next();
            return Some(Value::Object(map));
        }
        loop {
            self.skip_whitespace();
            let key = if self.chars.peek() == Some(&'"') {
                self.parse_string()?
            } else {
                self.parse_bare_key()?
            };
            self.skip_whitespace();
            if self.chars.next() != Some(':') {
                return None;
            }
            let value = self.parse_value()?;
            map.insert(expand(&key).to_string(), value);
            self.skip_whitespace();
            match self.chars.next()? {
                ',' => continue,
                '}' => break,
                _ => return None,
            }
        }
        Some(Value::Object(map))
    }

    fn parse_array(&mut self) -> Option<Value> {
        self.chars.next();
        let mut items = Vec::new();
        self.skip_whitespace();
        if self.chars.peek() == Some(&']') {
            self.chars.next();
            return Some(Value::Array(items));
        }
        loop {
            items.push(self.parse_value()?);
            self.skip_whitespace();
            match self.chars.next()? {
                ',' => continue,
                ']' => break,
                _ => return None,
            }
        }
        Some(Value::Array(items))
    }

    fn parse_string(&mut self) -> Option<String> {
        self.chars.next();
        let mut s = String::new();
        loop {
            match self.chars.next()? {
                '"' => break,
                '\\' => match self.chars.next()? {
                    '"' => s.push('"'),
                    '\\' => s.push('\\'),
                    other => s.push(other),
                },
                c => s.push(c),
            }
        }
        Some(s)
    }

    fn parse_bare_key(&mut self) -> Option<String> {
        let mut s = String::new();
        while matches!(self.chars.peek(), Some(c) if c.is_ascii_alphanumeric() || *c == '_') {
            s.push(self.chars.next().unwrap());
        }
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    }

    fn parse_number(&mut self) -> Option<Value> {
        let mut s = String::new();
        if self.chars.peek() == Some(&'-') {
            s.push(self.chars.next().unwrap());
        }
        while matches!(self.chars.peek(), Some(c) if c.is_ascii_digit() || *c == '.') {
            s.push(self.chars.next().unwrap());
        }
        serde_json::Number::from_str_relaxed(&s).map(Value::Number)
    }
}

trait NumberExt {
    fn from_str_relaxed(s: &str) -> Option<serde_json::Number>;
}

impl NumberExt for serde_json::Number {
    fn from_str_relaxed(s: &str) -> Option<serde_json::Number> {
        if s.contains('.') {
            s.parse::<f64>().ok().and_then(serde_json::Number::from_f64)
        } else {
            s.parse::<i64>().ok().map(serde_json::Number::from)
        }
    }
}

/// `(orig_chars - encoded_chars) / 4`, clamped at 0.
pub fn tokens_saved(original: &str, encoded: &str) -> f64 {
    let saved_chars = original.chars().count() as f64 - encoded.chars().count() as f64;
    (saved_chars / 4.0).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encode_decode_roundtrip_is_semantically_equal() {
        let value = json!({
            "query": "hello",
            "model": "gpt-4o",
            "settings": {"moderation": "strict", "temperature": 0.5},
            "metadata": null,
        });
        let encoded = encode(&value);
        let decoded = decode(&encoded).expect("should decode");
        assert_eq!(decoded, value);
    }

    #[test]
    fn encode_abbreviates_known_keys_and_shrinks_scalars() {
        let value = json!({"query": "hi", "metadata": null});
        let encoded = encode(&value);
        assert!(encoded.contains("q:"));
        assert!(encoded.contains("md:~"));
        assert!(!encoded.contains("query"));
    }

    #[test]
    fn encode_decode_roundtrip_arrays_and_bools() {
        let value = json!({"flags": [true, false, null, "ok"]});
        let encoded = encode(&value);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn decode_invalid_payload_returns_none() {
        assert!(decode("not even close to toon").is_none());
    }

    #[test]
    fn tokens_saved_is_never_negative() {
        assert_eq!(tokens_saved("short", "this is way way way longer than short"), 0.0);
        assert!(tokens_saved("{\"query\":\"hello world\"}", "{q:\"hello world\"}") > 0.0);
    }

    #[test]
    fn looks_like_toon_detects_dictionary_keys() {
        assert!(looks_like_toon("{q:\"hi\",md:~}"));
        assert!(!looks_like_toon("plain text response"));
    }
}
