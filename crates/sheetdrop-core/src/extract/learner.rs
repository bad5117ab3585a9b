//! Heuristic vendor-mapping auto-learning.
//!
//! The first extraction for a previously unseen sender becomes the template
//! for subsequent ones: the learned rules echo the literal extracted values
//! as fixed patterns, OCR noise included. The heuristic lives behind
//! `MappingLearner` so a real template-inference algorithm can replace it
//! without touching the pipeline.

use tracing::debug;

use crate::error::StoreError;
use crate::extract::ExtractedFields;
use crate::models::mapping::{ExtractionRules, FieldMappings, MappingSource, NewMapping};
use crate::store::Store;

/// Learns new vendor mappings from first-time extractions.
pub trait MappingLearner {
    /// Synthesize and persist a mapping for (user, sender).
    ///
    /// Insert-if-absent: a concurrent upload from the same sender that won
    /// the race leaves the existing mapping alone. Returns whether a mapping
    /// was created.
    fn learn(
        &self,
        store: &dyn Store,
        user_id: &str,
        sender_email: &str,
        fields: &ExtractedFields,
    ) -> Result<bool, StoreError>;
}

/// Literal-echo learner: each rule pins the exact value just extracted.
/// Values are regex-escaped so the stored pattern always compiles.
pub struct LiteralEchoLearner;

impl LiteralEchoLearner {
    fn rules_from(fields: &ExtractedFields) -> ExtractionRules {
        ExtractionRules {
            invoice_number: non_empty(&fields.invoice_number)
                .map(|v| format!(r"Invoice Number[:\s]*({})", regex::escape(v))),
            invoice_date: non_empty(&fields.invoice_date)
                .map(|v| format!(r"Invoice Date[:\s]*({})", regex::escape(v))),
            total_amount: non_empty(&fields.total_amount)
                .map(|v| format!("({})", regex::escape(v))),
        }
    }
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

impl MappingLearner for LiteralEchoLearner {
    fn learn(
        &self,
        store: &dyn Store,
        user_id: &str,
        sender_email: &str,
        fields: &ExtractedFields,
    ) -> Result<bool, StoreError> {
        let created = store.create_mapping_if_absent(NewMapping {
            sender_email: sender_email.to_string(),
            user_id: user_id.to_string(),
            vendor_name: None,
            field_mappings: FieldMappings::default(),
            extraction_rules: Self::rules_from(fields),
            mapping_source: MappingSource::Auto,
        })?;

        if created {
            debug!("learned vendor mapping for ({user_id}, {sender_email})");
        }
        Ok(created)
    }
}
