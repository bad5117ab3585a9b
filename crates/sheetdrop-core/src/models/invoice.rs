//! Invoice extraction records and processing statuses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status assigned to a persisted extraction record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    /// Partial extraction, routed to human review.
    #[default]
    NeedsReview,
    /// Extraction failed permanently.
    Failed,
    /// All fields extracted; forwarded to the spreadsheet sink.
    AutoProcessed,
    /// Explicitly flagged for manual review by an operator.
    ManualReview,
}

impl ProcessingStatus {
    /// Wire representation, matching the serde encoding.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NeedsReview => "NEEDS_REVIEW",
            Self::Failed => "FAILED",
            Self::AutoProcessed => "AUTO_PROCESSED",
            Self::ManualReview => "MANUAL_REVIEW",
        }
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One extraction result, exclusively owned by the persistence store.
///
/// The extracted fields stay loosely-typed strings: OCR and text extraction
/// yield unnormalized text, not typed values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceRecord {
    /// System-generated identifier.
    pub id: u64,

    /// Owning user.
    pub user_id: String,

    /// Sender the invoice arrived from.
    pub sender_email: String,

    /// Original uploaded file name.
    pub file_name: String,

    /// Raw extracted text; a JSON-serialized row for tabular sources.
    pub extracted_text: String,

    /// Extracted invoice number.
    #[serde(default)]
    pub invoice_number: String,

    /// Extracted invoice date.
    #[serde(default)]
    pub invoice_date: String,

    /// Extracted total amount.
    #[serde(default)]
    pub total_amount: String,

    /// Extraction completeness score in [0, 1].
    pub confidence_score: f32,

    /// Processing status.
    pub status: ProcessingStatus,

    /// Spreadsheet the record was routed to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spreadsheet_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a new invoice record. The store assigns the id and
/// timestamps and enforces the sparse unique (user, invoice number)
/// constraint on non-empty numbers.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub user_id: String,
    pub sender_email: String,
    pub file_name: String,
    pub extracted_text: String,
    pub invoice_number: String,
    pub invoice_date: String,
    pub total_amount: String,
    pub confidence_score: f32,
    pub status: ProcessingStatus,
    pub spreadsheet_id: Option<String>,
}
