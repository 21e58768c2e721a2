//! Input sanitization. Pure-CPU, no suspension points.

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

const MAX_CHARS: usize = 10_000;

pub struct Sanitizer {
    path_traversal: Regex,
}

/// Outcome of sanitizing a single piece of text: the transformed text plus
/// any warnings raised along the way, appended to
/// `RequestState::sanitization_warnings`.
pub struct SanitizeOutcome {
    pub text: String,
    pub warnings: Vec<String>,
}

impl Sanitizer {
    pub fn new() -> Self {
        Self {
            // `../` or `..\` possibly percent-encoded; flagged here but not
            // blocked (blocking is threat-detect's job, §4.2.3).
            path_traversal: Regex::new(r"\.\.(?:/|\\|%2f|%5c)").unwrap(),
        }
    }

    pub fn sanitize(&self, input: &str) -> SanitizeOutcome {
        let mut warnings = Vec::new();

        // Unicode-normalize (compatibility form, NFKC).
        let normalized: String = input.nfkc().collect();

        // Strip NUL bytes, warning if any were present.
        let (stripped, had_nul) = strip_nul_bytes(&normalized);
        if had_nul {
            warnings.push("input contained NUL bytes; stripped".to_string());
        }

        // Flag path-traversal-looking sequences without blocking.
        if self.path_traversal.is_match(&stripped) {
            warnings.push("input contains path-traversal-like sequence".to_string());
        }

        // HTML-escape.
        let escaped = html_escape::encode_text(&stripped).into_owned();

        // Collapse whitespace runs to a single space.
        let collapsed = collapse_whitespace(&escaped);

        // Truncate to MAX_CHARS, warning if truncated.
        let (truncated, was_truncated) = truncate_chars(&collapsed, MAX_CHARS);
        if was_truncated {
            warnings.push(format!("input truncated to {MAX_CHARS} characters"));
        }

        SanitizeOutcome {
            text: truncated,
            warnings,
        }
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_nul_bytes(input: &str) -> (String, bool) {
    if input.contains('\0') {
        (input.replace('\0', ""), true)
    } else {
        (input.to_string(), false)
    }
}

fn collapse_whitespace(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_space = false;
    for c in input.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

fn truncate_chars(input: &str, max_chars: usize) -> (String, bool) {
    if input.chars().count() <= max_chars {
        (input.to_string(), false)
    } else {
        (input.chars().take(max_chars).collect(), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_nul_bytes_and_warns() {
        let out = Sanitizer::new().sanitize("hello\0world");
        assert_eq!(out.text, "helloworld");
        assert!(out.warnings.iter().any(|w| w.contains("NUL")));
    }

    #[test]
    fn html_escapes_angle_brackets() {
        let out = Sanitizer::new().sanitize("<script>alert(1)</script>");
        assert!(!out.text.contains('<'));
        assert!(!out.text.contains('>'));
    }

    #[test]
    fn collapses_whitespace_runs() {
        let out = Sanitizer::new().sanitize("hello    world\n\n\tfoo");
        assert_eq!(out.text, "hello world foo");
    }

    #[test]
    fn flags_path_traversal_without_blocking() {
        let out = Sanitizer::new().sanitize("open ../../etc/passwd");
        assert!(out.warnings.iter().any(|w| w.contains("path-traversal")));
    }

    #[test]
    fn truncates_long_input_and_warns() {
        let long = "a".repeat(MAX_CHARS + 500);
        let out = Sanitizer::new().sanitize(&long);
        assert_eq!(out.text.chars().count(), MAX_CHARS);
        assert!(out.warnings.iter().any(|w| w.contains("truncated")));
    }

    #[test]
    fn clean_input_produces_no_warnings() {
        let out = Sanitizer::new().sanitize("What is the capital of France?");
        assert!(out.warnings.is_empty());
        assert_eq!(out.text, "What is the capital of France?");
    }
}
