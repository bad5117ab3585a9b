//! Error types for the sheetdrop-core library.

use thiserror::Error;

use crate::models::user::Tier;

/// Errors from the document (PDF/OCR) text-extraction path.
///
/// Any of these is recorded as `OCR_FAILED` for the affected file; the batch
/// continues with the remaining files.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// PDF-to-image conversion produced no page images or could not run.
    #[error("PDF conversion failed for {file}: {reason}")]
    ConversionFailure { file: String, reason: String },

    /// The OCR collaborator failed on a page image.
    #[error("OCR failed: {0}")]
    OcrFailure(String),

    /// I/O while staging the upload buffer or page images.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from tabular (CSV/Excel) parsing. Fatal for the affected file only.
#[derive(Error, Debug)]
pub enum TabularError {
    /// The buffer is not valid CSV.
    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    /// The buffer is not a readable Excel workbook.
    #[error("invalid Excel workbook: {0}")]
    Excel(String),

    /// The workbook contains no sheets.
    #[error("workbook has no sheets")]
    NoSheets,
}

/// Errors from the persistence store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The sparse unique (user, invoice number) constraint was violated.
    #[error("duplicate invoice number {invoice_number} for user {user_id}")]
    DuplicateInvoice {
        user_id: String,
        invoice_number: String,
    },

    /// The referenced user is not known to the store.
    #[error("unknown user: {0}")]
    UnknownUser(String),

    /// The backing storage failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Errors from the external spreadsheet sink. Sink failures never roll back
/// the already-persisted record and never abort the batch.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The sink rejected the write; the spreadsheet must be shared with the
    /// named principal first.
    #[error("cannot write to spreadsheet {spreadsheet_id}: share it with {share_with}")]
    PermissionDenied {
        spreadsheet_id: String,
        share_with: String,
    },

    /// The sink request failed for another reason.
    #[error("sink request failed: {0}")]
    Request(String),
}

/// Batch-level precondition failures, surfaced to the caller as a single
/// error. Per-file failures never appear here; they are converted into
/// ordered outcome entries so the result array is always complete.
#[derive(Error, Debug)]
pub enum BatchError {
    /// The batch contained no files.
    #[error("no files supplied")]
    NoFiles,

    /// The account has no connected spreadsheet to route records to.
    #[error("no spreadsheet connected for this account")]
    NoSpreadsheetConnected,

    /// The caller selected a spreadsheet that is not connected.
    #[error("spreadsheet selection {requested:?} does not match a connected spreadsheet")]
    InvalidSpreadsheetSelection { requested: Option<String> },

    /// The tier's invoice ceiling was already reached at batch start.
    #[error("invoice upload limit reached for {tier} tier")]
    QuotaExhausted { tier: Tier },

    /// The persistence store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors from user-account mutations (spreadsheet bookkeeping).
#[derive(Error, Debug)]
pub enum AccountError {
    /// The tier's connected-spreadsheet ceiling was reached.
    #[error("spreadsheet limit reached for {tier} tier")]
    SpreadsheetLimitReached { tier: Tier },

    /// A spreadsheet with this id is already connected.
    #[error("spreadsheet {0} is already connected")]
    DuplicateSpreadsheetId(String),

    /// A spreadsheet with this name (case-insensitive) is already connected.
    #[error("a spreadsheet named {0:?} is already connected")]
    DuplicateSpreadsheetName(String),
}
