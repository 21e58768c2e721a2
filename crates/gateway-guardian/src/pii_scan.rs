//! Output-side PII scan: the same detector catalog Sentinel uses on input,
//! run against the completion. High-severity types are redacted inline;
//! the rest are only reported.

use gateway_core::pii::PiiDetector;
use gateway_core::types::{PiiDetection, PiiType};
use std::collections::HashMap;

pub struct PiiScanOutcome {
    pub text: String,
    pub redacted: bool,
    pub detections: Vec<PiiDetection>,
}

pub struct OutputPiiScanner {
    detector: PiiDetector,
}

impl OutputPiiScanner {
    pub fn new() -> Self {
        Self {
            detector: PiiDetector::new(),
        }
    }

    pub fn scan(&self, text: &str) -> PiiScanOutcome {
        let matches = self.detector.detect(text);
        if matches.is_empty() {
            return PiiScanOutcome {
                text: text.to_string(),
                redacted: false,
                detections: Vec::new(),
            };
        }

        let mut counts: HashMap<PiiType, u32> = HashMap::new();
        let mut redacted = false;
        let mut result = String::with_capacity(text.len());
        let mut cursor = 0;

        for m in &matches {
            *counts.entry(m.pii_type).or_insert(0) += 1;
            result.push_str(&text[cursor..m.start]);
            if m.pii_type.is_high_severity() {
                result.push_str(&format!("[{}_REDACTED]", m.pii_type.token_prefix()));
                redacted = true;
            } else {
                result.push_str(&text[m.start..m.end]);
            }
            cursor = m.end;
        }
        result.push_str(&text[cursor..]);

        let mut detections: Vec<PiiDetection> = counts
            .into_iter()
            .map(|(pii_type, count)| PiiDetection {
                pii_type,
                token: None,
                count,
            })
            .collect();
        detections.sort_by_key(|d| format!("{:?}", d.pii_type));

        PiiScanOutcome {
            text: result,
            redacted,
            detections,
        }
    }
}

impl Default for OutputPiiScanner {
    fn default() -> Self {
        Self::new()
    }
}
