//! Threat detection: SQLi, XSS, command injection, path traversal, plus
//! LDAP- and XML-injection detectors.

use gateway_core::types::{ThreatDetection, ThreatType};
use regex::Regex;

/// A single detector's verdict before it's wrapped into a `ThreatDetection`.
struct DetectorResult {
    threat_type: ThreatType,
    matches: Vec<String>,
}

impl DetectorResult {
    /// `confidence = min(0.3 * matches, 1.0)`, except path traversal which
    /// uses `0.4 * matches`.
    fn confidence(&self) -> f64 {
        let per_match = if self.threat_type == ThreatType::PathTraversal {
            0.4
        } else {
            0.3
        };
        (per_match * self.matches.len() as f64).min(1.0)
    }
}

pub struct ThreatDetector {
    sql_patterns: Vec<Regex>,
    xss_patterns: Vec<Regex>,
    command_patterns: Vec<Regex>,
    path_traversal_patterns: Vec<Regex>,
    ldap_patterns: Vec<Regex>,
    xml_patterns: Vec<Regex>,
}

/// Block threshold: any detector at or above this confidence blocks the
/// request.
pub const BLOCK_THRESHOLD: f64 = 0.7;

impl ThreatDetector {
    pub fn new() -> Self {
        Self {
            sql_patterns: compile(&[
                r"(?i)\bunion\b.{0,40}\bselect\b",
                r"(?i)\binsert\b.{0,20}\binto\b",
                r"(?i)\bupdate\b.{0,40}\bset\b",
                r"(?i)\bdelete\b.{0,20}\bfrom\b",
                r"(?i)\bdrop\b.{0,20}\btable\b",
                r"(?i)\bexec\s*\(",
                r"--",
                r"#",
                r"/\*",
                r"(?i)\bor\b\s+['\x22]?1['\x22]?\s*=\s*['\x22]?1['\x22]?",
                r"(?i)\b(sleep|benchmark|waitfor)\s*\(",
            ]),
            xss_patterns: compile(&[
                r"(?i)<script[\s>]",
                r"(?i)javascript:",
                r"(?i)vbscript:",
                r"(?i)\bon\w+\s*=",
                r"(?i)<iframe[\s>]",
                r"(?i)<object[\s>]",
                r"(?i)<embed[\s>]",
                r"(?i)eval\s*\(",
                r"(?i)expression\s*\(",
            ]),
            command_patterns: compile(&[
                r"[;&|`]",
                r"\$\([^)]*\)",
                r"&&|\|\|",
                r">\s*/",
                r"(?i)\b(rm|wget|curl|nc|bash|sh|chmod|chown)\b\s",
            ]),
            path_traversal_patterns: compile(&[
                r"\.\./",
                r"\.\.\\",
                r"(?i)%2e%2e(%2f|%5c)",
                r"(?i)\.\.%2f",
            ]),
            ldap_patterns: compile(&[
                r"\(\s*[|&]",
                r"\*\)\s*\(",
                r"(?i)objectclass\s*=",
            ]),
            xml_patterns: compile(&[
                r"(?i)<!entity",
                r"(?i)<!doctype[^>]*\[",
                r"(?i)SYSTEM\s+['\x22]file:",
            ]),
        }
    }

    /// Run every detector on `working_text`, in the fixed catalog order.
    /// Pure-CPU: no suspension points.
    pub fn detect(&self, text: &str) -> Vec<ThreatDetection> {
        let mut results = Vec::new();
        push_if_detected(&mut results, ThreatType::SqlInjection, &self.sql_patterns, text);
        push_if_detected(&mut results, ThreatType::Xss, &self.xss_patterns, text);
        push_if_detected(&mut results, ThreatType::CommandInjection, &self.command_patterns, text);
        push_if_detected(&mut results, ThreatType::PathTraversal, &self.path_traversal_patterns, text);
        push_if_detected(&mut results, ThreatType::LdapInjection, &self.ldap_patterns, text);
        push_if_detected(&mut results, ThreatType::XmlInjection, &self.xml_patterns, text);
        results
    }
}

impl Default for ThreatDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|p| Regex::new(p).unwrap()).collect()
}

fn push_if_detected(
    out: &mut Vec<ThreatDetection>,
    threat_type: ThreatType,
    patterns: &[Regex],
    text: &str,
) {
    let matches: Vec<String> = patterns
        .iter()
        .filter(|re| re.is_match(text))
        .map(|re| re.as_str().to_string())
        .collect();
    if matches.is_empty() {
        return;
    }
    let result = DetectorResult { threat_type, matches };
    let confidence = result.confidence();
    out.push(ThreatDetection {
        threat_type,
        confidence,
        matches: result.matches,
    });
}

/// Build the `block_reason` string from the detections at/above threshold.
pub fn block_reason(detections: &[ThreatDetection]) -> Option<String> {
    let types: Vec<String> = detections
        .iter()
        .filter(|d| d.confidence >= BLOCK_THRESHOLD)
        .map(|d| d.threat_type.to_string())
        .collect();
    if types.is_empty() {
        None
    } else {
        Some(format!("Security threats detected: {}", types.join(", ")))
    }
}

/// The maximum confidence across all detections, used to set
/// `security_score` on a block.
pub fn max_confidence(detections: &[ThreatDetection]) -> f64 {
    detections.iter().map(|d| d.confidence).fold(0.0, f64::max)
}
