//! Confidence scoring and status classification.

use crate::extract::ExtractedFields;
use crate::models::invoice::ProcessingStatus;

/// Score at or above which a record auto-processes.
pub const AUTO_PROCESS_THRESHOLD: f32 = 0.8;

/// Score extracted fields and assign a processing status.
///
/// Total amount carries the largest weight as the commercially important
/// field. With the 0.8 threshold, partial extractions always land in review:
/// only number + date + amount reaches it.
pub fn score(fields: &ExtractedFields) -> (f32, ProcessingStatus) {
    let mut confidence = 0.0_f32;
    if !fields.invoice_number.is_empty() {
        confidence += 0.3;
    }
    if !fields.invoice_date.is_empty() {
        confidence += 0.3;
    }
    if !fields.total_amount.is_empty() {
        confidence += 0.4;
    }

    let status = if confidence >= AUTO_PROCESS_THRESHOLD {
        ProcessingStatus::AutoProcessed
    } else {
        ProcessingStatus::NeedsReview
    };
    (confidence, status)
}
