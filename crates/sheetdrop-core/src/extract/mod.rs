//! Field extraction: per-sender mapping rules first, generic fallbacks second.
//!
//! The ordering is deliberate: learned per-sender rules are more precise than
//! the generic heuristics, which exist only to bootstrap extraction before a
//! mapping exists.

pub mod learner;
pub mod patterns;

use regex::RegexBuilder;
use tracing::debug;

use crate::models::mapping::VendorMapping;
use patterns::{AMOUNT_BARE, AMOUNT_WITH_CURRENCY, FALLBACK_INVOICE_DATE, FALLBACK_INVOICE_NUMBER};

/// Candidate values for the three extracted fields. Loose strings: OCR output
/// is unnormalized text, not typed values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub invoice_number: String,
    pub invoice_date: String,
    pub total_amount: String,
}

/// Extract candidate field values from raw text.
///
/// Per field, first success wins: an active mapping's rule, then the generic
/// fallback pattern. A mapping that is inactive is ignored entirely.
pub fn extract_fields(text: &str, mapping: Option<&VendorMapping>) -> ExtractedFields {
    let mut fields = ExtractedFields::default();

    if let Some(mapping) = mapping.filter(|m| m.is_active) {
        let rules = &mapping.extraction_rules;
        if let Some(pattern) = &rules.invoice_number {
            fields.invoice_number = apply_rule(text, pattern);
        }
        if let Some(pattern) = &rules.invoice_date {
            fields.invoice_date = apply_rule(text, pattern);
        }
        if let Some(pattern) = &rules.total_amount {
            fields.total_amount = apply_rule(text, pattern);
        }
    }

    if fields.invoice_number.is_empty() {
        fields.invoice_number = capture_trimmed(&FALLBACK_INVOICE_NUMBER, text);
    }
    if fields.invoice_date.is_empty() {
        fields.invoice_date = capture_trimmed(&FALLBACK_INVOICE_DATE, text);
    }
    if fields.total_amount.is_empty() {
        fields.total_amount = extract_amount(text);
    }

    fields
}

/// Apply a vendor-supplied pattern case-insensitively; capture group 1,
/// trimmed. A malformed pattern is a miss, never an error.
fn apply_rule(text: &str, pattern: &str) -> String {
    let regex = match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(regex) => regex,
        Err(err) => {
            debug!("skipping malformed mapping pattern {:?}: {}", pattern, err);
            return String::new();
        }
    };

    regex
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

fn capture_trimmed(regex: &regex::Regex, text: &str) -> String {
    regex
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Currency-amount heuristic: a currency-prefixed amount anywhere in the
/// text, falling back to the first bare numeric token. Returns the full
/// matched substring, trimmed.
fn extract_amount(text: &str) -> String {
    if let Some(m) = AMOUNT_WITH_CURRENCY.find(text) {
        return m.as_str().trim().to_string();
    }
    AMOUNT_BARE
        .find(text)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::mapping::{ExtractionRules, FieldMappings, MappingSource};
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn mapping_with_rules(rules: ExtractionRules) -> VendorMapping {
        VendorMapping {
            sender_email: "billing@acme.test".to_string(),
            user_id: "u1".to_string(),
            vendor_name: None,
            field_mappings: FieldMappings::default(),
            extraction_rules: rules,
            mapping_source: MappingSource::Auto,
            is_active: true,
            version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn fallback_patterns_extract_labeled_fields() {
        let text = "Invoice Number: INV-42\nInvoice Date: 2024-05-01\nTotal: $1,250.00";
        let fields = extract_fields(text, None);

        assert_eq!(fields.invoice_number, "INV-42");
        assert_eq!(fields.invoice_date, "2024-05-01");
        assert_eq!(fields.total_amount, "$1,250.00");
    }

    #[test]
    fn mapping_rules_take_precedence_over_fallbacks() {
        let rules = ExtractionRules {
            invoice_number: Some(r"Ref[:\s]*([A-Z0-9-]+)".to_string()),
            invoice_date: None,
            total_amount: None,
        };
        let mapping = mapping_with_rules(rules);
        let text = "Ref: ACME-7\nInvoice Number: WRONG-1\nInvoice Date: 2024-05-01";

        let fields = extract_fields(text, Some(&mapping));
        assert_eq!(fields.invoice_number, "ACME-7");
        // Unmapped fields still use the fallback.
        assert_eq!(fields.invoice_date, "2024-05-01");
    }

    #[test]
    fn mapping_rules_match_case_insensitively() {
        let rules = ExtractionRules {
            invoice_number: Some(r"ref[:\s]*([a-z0-9-]+)".to_string()),
            invoice_date: None,
            total_amount: None,
        };
        let mapping = mapping_with_rules(rules);

        let fields = extract_fields("REF: ACME-9", Some(&mapping));
        assert_eq!(fields.invoice_number, "ACME-9");
    }

    #[test]
    fn malformed_mapping_rule_falls_back_instead_of_failing() {
        let rules = ExtractionRules {
            invoice_number: Some(r"Invoice Number[:\s]*((".to_string()),
            invoice_date: None,
            total_amount: None,
        };
        let mapping = mapping_with_rules(rules);

        let fields = extract_fields("Invoice Number: INV-8", Some(&mapping));
        assert_eq!(fields.invoice_number, "INV-8");
    }

    #[test]
    fn inactive_mapping_is_ignored() {
        let rules = ExtractionRules {
            invoice_number: Some(r"Ref[:\s]*([A-Z0-9-]+)".to_string()),
            invoice_date: None,
            total_amount: None,
        };
        let mut mapping = mapping_with_rules(rules);
        mapping.is_active = false;

        let fields = extract_fields("Ref: ACME-7\nInvoice Number: INV-1", Some(&mapping));
        assert_eq!(fields.invoice_number, "INV-1");
    }

    #[test]
    fn currency_amount_outranks_earlier_bare_digits() {
        let fields = extract_fields("Invoice Number: A1\nTotal: $50", None);
        assert_eq!(fields.invoice_number, "A1");
        assert_eq!(fields.invoice_date, "");
        assert_eq!(fields.total_amount, "$50");
    }

    #[test]
    fn bare_number_is_the_amount_of_last_resort() {
        let fields = extract_fields("Amount due 1,299.99 by friday", None);
        assert_eq!(fields.total_amount, "1,299.99");
    }

    #[test]
    fn empty_text_extracts_nothing() {
        assert_eq!(extract_fields("", None), ExtractedFields::default());
    }
}
