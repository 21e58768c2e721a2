//! PII pseudonymization: replace each distinct literal
//! with a stable opaque token, recording the mapping for later restoration.
//! Never logs a literal or token value — only type and count.

use std::collections::HashMap;

use gateway_core::pii::PiiDetector;
use gateway_core::types::{PiiDetection, PiiMap, PiiType};
use tracing::debug;

pub struct Pseudonymizer {
    detector: PiiDetector,
}

pub struct PseudonymizeOutcome {
    pub text: String,
    pub pii_map: PiiMap,
    pub detections: Vec<PiiDetection>,
}

impl Pseudonymizer {
    pub fn new() -> Self {
        Self {
            detector: PiiDetector::new(),
        }
    }

    /// Detect PII literals in `text`, substitute each with a stable
    /// `[<TYPE>_<n>]` token (unique per distinct literal, numbered per type
    /// within this call), and record the token->literal mapping.
    pub fn pseudonymize(&self, text: &str) -> PseudonymizeOutcome {
        let matches = self.detector.detect(text);
        let mut pii_map = PiiMap::new();
        let mut per_type_counter: HashMap<PiiType, u32> = HashMap::new();
        let mut literal_to_token: HashMap<&str, String> = HashMap::new();
        let mut detection_counts: HashMap<PiiType, u32> = HashMap::new();

        // Assign tokens left-to-right, reusing a token for a literal seen
        // more than once so `pii_map` stays a bijection.
        let mut tokens_by_position = Vec::with_capacity(matches.len());
        for m in &matches {
            let token = literal_to_token
                .entry(m.literal.as_str())
                .or_insert_with(|| {
                    let n = per_type_counter.entry(m.pii_type).or_insert(0);
                    *n += 1;
                    let token = format!("[{}_{}]", m.pii_type.token_prefix(), n);
                    pii_map.insert(token.clone(), m.literal.clone());
                    token
                })
                .clone();
            *detection_counts.entry(m.pii_type).or_insert(0) += 1;
            tokens_by_position.push((m.start, m.end, token));
        }

        let mut result = String::with_capacity(text.len());
        let mut cursor = 0;
        for (start, end, token) in &tokens_by_position {
            result.push_str(&text[cursor..*start]);
            result.push_str(token);
            cursor = *end;
        }
        result.push_str(&text[cursor..]);

        let keyword_hits = self.detector.detect_sensitive_keywords(text);
        if !keyword_hits.is_empty() {
            *detection_counts.entry(PiiType::SensitiveKeyword).or_insert(0) +=
                keyword_hits.len() as u32;
        }

        debug!(
            types = ?detection_counts.keys().collect::<Vec<_>>(),
            total = detection_counts.values().sum::<u32>(),
            "pii detections (types/counts only, no literals)"
        );

        let mut detections: Vec<PiiDetection> = detection_counts
            .into_iter()
            .map(|(pii_type, count)| PiiDetection {
                pii_type,
                token: None,
                count,
            })
            .collect();
        detections.sort_by_key(|d| format!("{:?}", d.pii_type));

        PseudonymizeOutcome {
            text: result,
            pii_map,
            detections,
        }
    }
}

impl Default for Pseudonymizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_ssn_and_email_with_stable_tokens() {
        let out = Pseudonymizer::new()
            .pseudonymize("My SSN is 123-45-6789 and email me at j@x.com");
        assert!(out.text.contains("[SSN_1]"));
        assert!(out.text.contains("[EMAIL_1]"));
        assert!(!out.text.contains("123-45-6789"));
        assert!(!out.text.contains("j@x.com"));
        assert_eq!(out.pii_map.get("[SSN_1]"), Some("123-45-6789"));
        assert_eq!(out.pii_map.get("[EMAIL_1]"), Some("j@x.com"));
    }

    #[test]
    fn repeated_literal_reuses_same_token() {
        let out = Pseudonymizer::new().pseudonymize("call 555-123-4567 or call 555-123-4567 again");
        let occurrences = out.text.matches("[PHONE_1]").count();
        assert_eq!(occurrences, 2);
        assert_eq!(out.pii_map.len(), 1);
    }

    #[test]
    fn distinct_literals_of_same_type_get_distinct_numbers() {
        let out = Pseudonymizer::new()
            .pseudonymize("emails: a@example.com and b@example.com");
        assert!(out.text.contains("[EMAIL_1]"));
        assert!(out.text.contains("[EMAIL_2]"));
    }

    #[test]
    fn clean_text_produces_empty_map() {
        let out = Pseudonymizer::new().pseudonymize("What is the capital of France?");
        assert!(out.pii_map.is_empty());
        assert!(out.detections.is_empty());
        assert_eq!(out.text, "What is the capital of France?");
    }

    #[test]
    fn sensitive_keyword_reported_without_substitution() {
        let out = Pseudonymizer::new().pseudonymize("please rotate the api_key soon");
        assert_eq!(out.text, "please rotate the api_key soon");
        assert!(out
            .detections
            .iter()
            .any(|d| d.pii_type == PiiType::SensitiveKeyword));
    }
}
