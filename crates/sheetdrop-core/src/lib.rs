//! Core library for the sheetdrop invoice pipeline.
//!
//! This crate provides:
//! - File classification (PDF / CSV / Excel / unknown)
//! - Text extraction (tabular row parsing, OCR orchestration for PDFs)
//! - Per-sender field extraction with learned regex rules and generic fallbacks
//! - Confidence scoring, duplicate detection, and per-tier quota enforcement
//! - Batch processing that persists records and forwards auto-processed ones
//!   to an external spreadsheet sink

pub mod classify;
pub mod error;
pub mod extract;
pub mod models;
pub mod pipeline;
pub mod score;
pub mod sink;
pub mod store;
pub mod text;

pub use classify::FileKind;
pub use error::{AccountError, BatchError, ExtractError, SinkError, StoreError, TabularError};
pub use extract::{ExtractedFields, extract_fields};
pub use models::invoice::{InvoiceRecord, NewInvoice, ProcessingStatus};
pub use models::mapping::{ExtractionRules, MappingSource, MappingUpdate, NewMapping, VendorMapping};
pub use models::user::{SelectionPolicy, SpreadsheetRef, Subscription, Tier, TierPolicy, UserAccount};
pub use pipeline::{BatchProcessor, FileOutcome, UploadedFile};
pub use score::score;
pub use sink::SpreadsheetSink;
pub use store::{InvoiceFilter, MemoryStore, Store};
pub use text::{DocumentTextExtractor, OcrEngine, PdfRenderer};
