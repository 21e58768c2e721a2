//! Disclaimer injection: append a fixed disclaimer when the response
//! trips at least two keywords from one of the medical, financial or
//! legal lexicons.

const MEDICAL_KEYWORDS: &[&str] = &[
    "diagnosis", "treatment", "symptom", "medication", "dosage", "prescription", "disease", "therapy",
];
const FINANCIAL_KEYWORDS: &[&str] = &[
    "investment", "portfolio", "stock", "tax", "retirement", "interest rate", "mortgage", "dividend",
];
const LEGAL_KEYWORDS: &[&str] = &[
    "lawsuit", "contract", "liability", "statute", "plaintiff", "defendant", "attorney", "jurisdiction",
];

const MEDICAL_DISCLAIMER: &str = "This is not medical advice. Consult a qualified healthcare provider.";
const FINANCIAL_DISCLAIMER: &str = "This is not financial advice. Consult a licensed financial advisor.";
const LEGAL_DISCLAIMER: &str = "This is not legal advice. Consult a licensed attorney.";

pub struct DisclaimerOutcome {
    pub text: String,
    pub injected: bool,
    pub category: Option<&'static str>,
}

fn count_hits(lower: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|kw| lower.contains(*kw)).count()
}

/// Append the matching disclaimer to `text` if at least two keywords from
/// one lexicon are present. Lexicons are checked in a fixed order
/// (medical, financial, legal); only the first qualifying one applies.
pub fn inject_if_needed(text: &str) -> DisclaimerOutcome {
    let lower = text.to_lowercase();

    let lexicons: [(&str, &[&str], &str); 3] = [
        ("medical", MEDICAL_KEYWORDS, MEDICAL_DISCLAIMER),
        ("financial", FINANCIAL_KEYWORDS, FINANCIAL_DISCLAIMER),
        ("legal", LEGAL_KEYWORDS, LEGAL_DISCLAIMER),
    ];

    for (category, keywords, disclaimer) in lexicons {
        if count_hits(&lower, keywords) >= 2 {
            return DisclaimerOutcome {
                text: format!("{text}\n\n{disclaimer}"),
                injected: true,
                category: Some(category),
            };
        }
    }

    DisclaimerOutcome {
        text: text.to_string(),
        injected: false,
        category: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injects_medical_disclaimer_on_two_keyword_hits() {
        let out = inject_if_needed("Your diagnosis suggests adjusting the medication dosage.");
        assert!(out.injected);
        assert_eq!(out.category, Some("medical"));
        assert!(out.text.contains("not medical advice"));
    }

    #[test]
    fn single_keyword_does_not_trigger() {
        let out = inject_if_needed("This treatment is common.");
        assert!(!out.injected);
        assert_eq!(out.text, "This treatment is common.");
    }

    #[test]
    fn financial_lexicon_takes_effect_independently() {
        let out = inject_if_needed("Consider your portfolio and tax implications carefully.");
        assert!(out.injected);
        assert_eq!(out.category, Some("financial"));
    }

    #[test]
    fn clean_text_is_untouched() {
        let out = inject_if_needed("The capital of France is Paris.");
        assert!(!out.injected);
        assert!(out.category.is_none());
    }
}
