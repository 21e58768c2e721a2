//! PII pattern catalog shared by Sentinel's input pseudonymizer and
//! Guardian's output scanner. Kept in one place so the two stages cannot
//! drift apart on what counts as a match.

use regex::Regex;

use crate::types::PiiType;

/// A single literal match found in text, before tokenization/redaction
/// decisions are made by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PiiMatch {
    pub pii_type: PiiType,
    pub literal: String,
    pub start: usize,
    pub end: usize,
}

/// Lexicon of keywords that trigger a `SensitiveKeyword` detection without
/// any text substitution.
pub const SENSITIVE_KEYWORDS: &[&str] = &[
    "password",
    "secret",
    "api_key",
    "token",
    "private_key",
    "credential",
];

/// Compiled PII detectors, built once and reused across requests.
pub struct PiiDetector {
    ssn: Regex,
    credit_card: Regex,
    email: Regex,
    phone: Regex,
    api_key: Regex,
    ipv4: Regex,
}

impl PiiDetector {
    pub fn new() -> Self {
        Self {
            ssn: Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap(),
            credit_card: Regex::new(r"\b(?:\d[ -]?){13,16}\b").unwrap(),
            email: Regex::new(
                r"\b[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+\b",
            )
            .unwrap(),
            phone: Regex::new(r"\b(?:\+?1[-.\s]?)?\(?\d{3}\)?[-.\s]\d{3}[-.\s]\d{4}\b").unwrap(),
            api_key: Regex::new(r"\b[A-Za-z0-9_-]{32,}\b").unwrap(),
            ipv4: Regex::new(r"\b(?:(?:25[0-5]|2[0-4]\d|1?\d?\d)\.){3}(?:25[0-5]|2[0-4]\d|1?\d?\d)\b")
                .unwrap(),
        }
    }

    /// Find every PII literal in `text`, in left-to-right order. Overlap
    /// between detector classes is resolved by priority: SSN and credit-card
    /// (both digit-shaped) are checked before the looser API-key pattern so
    /// a 16-digit card number isn't also reported as a long token.
    pub fn detect(&self, text: &str) -> Vec<PiiMatch> {
        let mut matches = Vec::new();
        let mut covered: Vec<(usize, usize)> = Vec::new();

        let mut push = |pii_type: PiiType, regex: &Regex, text: &str, covered: &mut Vec<(usize, usize)>, matches: &mut Vec<PiiMatch>| {
            for m in regex.find_iter(text) {
                let (start, end) = (m.start(), m.end());
                if covered.iter().any(|&(s, e)| start < e && end > s) {
                    continue;
                }
                covered.push((start, end));
                matches.push(PiiMatch {
                    pii_type,
                    literal: m.as_str().to_string(),
                    start,
                    end,
                });
            }
        };

        push(PiiType::Ssn, &self.ssn, text, &mut covered, &mut matches);
        push(PiiType::CreditCard, &self.credit_card, text, &mut covered, &mut matches);
        push(PiiType::Email, &self.email, text, &mut covered, &mut matches);
        push(PiiType::Phone, &self.phone, text, &mut covered, &mut matches);
        push(PiiType::Ip, &self.ipv4, text, &mut covered, &mut matches);
        push(PiiType::ApiKey, &self.api_key, text, &mut covered, &mut matches);

        matches.sort_by_key(|m| m.start);
        matches
    }

    /// Sensitive keywords present in `text`, case-insensitively, without
    /// modifying it.
    pub fn detect_sensitive_keywords(&self, text: &str) -> Vec<&'static str> {
        let lower = text.to_lowercase();
        SENSITIVE_KEYWORDS
            .iter()
            .copied()
            .filter(|kw| lower.contains(kw))
            .collect()
    }
}

impl Default for PiiDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_ssn_and_email_distinctly() {
        let detector = PiiDetector::new();
        let matches = detector.detect("My SSN is 123-45-6789 and email me at j@x.com");
        assert!(matches.iter().any(|m| m.pii_type == PiiType::Ssn && m.literal == "123-45-6789"));
        assert!(matches.iter().any(|m| m.pii_type == PiiType::Email && m.literal == "j@x.com"));
    }

    #[test]
    fn detects_ipv4() {
        let detector = PiiDetector::new();
        let matches = detector.detect("connect to 192.168.1.10 please");
        assert!(matches.iter().any(|m| m.pii_type == PiiType::Ip));
    }

    #[test]
    fn ssn_not_double_counted_as_api_key() {
        let detector = PiiDetector::new();
        let matches = detector.detect("123-45-6789");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].pii_type, PiiType::Ssn);
    }

    #[test]
    fn sensitive_keyword_lexicon_matches_case_insensitively() {
        let detector = PiiDetector::new();
        let hits = detector.detect_sensitive_keywords("Please rotate your API_KEY and PASSWORD");
        assert!(hits.contains(&"api_key"));
        assert!(hits.contains(&"password"));
    }

    #[test]
    fn no_false_positive_on_clean_text() {
        let detector = PiiDetector::new();
        assert!(detector.detect("What is the capital of France?").is_empty());
    }
}
