//! Tier-dispatched batch processing.
//!
//! One generic pipeline serves all tiers; the per-tier differences (quota
//! ceiling, spreadsheet selection) come from the `TierPolicy` table, so the
//! extraction logic cannot drift between tiers.
//!
//! Files in a batch are processed one at a time, in input order, so the quota
//! counter and duplicate checks observe a consistent, monotonically-updated
//! view within one request. Concurrent requests for the same user can still
//! race the counter and the duplicate set; that is an accepted limitation,
//! not something this module hides.

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::classify::FileKind;
use crate::error::{BatchError, StoreError};
use crate::extract::learner::{LiteralEchoLearner, MappingLearner};
use crate::extract::{self, ExtractedFields};
use crate::models::invoice::{InvoiceRecord, NewInvoice, ProcessingStatus};
use crate::models::user::{SelectionPolicy, TierPolicy, UserAccount};
use crate::score::score;
use crate::sink::{self, SpreadsheetSink};
use crate::store::Store;
use crate::text::tabular::{self, InvoiceRow};
use crate::text::{DocumentTextExtractor, OcrEngine, PdfRenderer};

static LITERAL_ECHO: LiteralEchoLearner = LiteralEchoLearner;

/// One uploaded file: declared name, raw content, and optionally
/// pre-extracted text for formats the pipeline cannot read itself.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content: Vec<u8>,
    /// Pre-extracted text supplied by the caller for unknown formats.
    pub extracted_text: Option<String>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content,
            extracted_text: None,
        }
    }

    /// Attach caller-supplied text for the generic path.
    pub fn with_extracted_text(mut self, text: impl Into<String>) -> Self {
        self.extracted_text = Some(text.into());
        self
    }
}

/// Per-file (or per-row) processing outcome. The result array is always
/// complete and ordered: one entry per attempted file or row, in input order.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    /// A record was persisted; auto-processed records were also pushed to the
    /// sink unless `sink_error` is set.
    Processed {
        invoice_number: String,
        status: ProcessingStatus,
        confidence_score: f32,
        sink_error: Option<String>,
    },
    /// An invoice with this number already exists for the user.
    DuplicateSkipped { invoice_number: String },
    /// PDF conversion or OCR failed for this file.
    OcrFailed { file_name: String },
    /// The buffer was not valid CSV/Excel.
    ParseFailed { file_name: String },
    /// Tabular row without an invoice number.
    InvalidRowSkipped,
    /// No text was available to extract from.
    NoInvoiceNumberFound,
}

impl FileOutcome {
    /// Wire-shaped JSON for response payloads.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Processed {
                invoice_number,
                status,
                confidence_score,
                sink_error,
            } => {
                let mut value = json!({
                    "invoiceNumber": invoice_number,
                    "status": status.as_str(),
                    "confidenceScore": confidence_score,
                });
                if let Some(sink_error) = sink_error {
                    value["sinkError"] = json!(sink_error);
                }
                value
            }
            Self::DuplicateSkipped { invoice_number } => json!({
                "invoiceNumber": invoice_number,
                "status": "DUPLICATE_SKIPPED",
            }),
            Self::OcrFailed { file_name } => json!({
                "fileName": file_name,
                "status": "OCR_FAILED",
            }),
            Self::ParseFailed { file_name } => json!({
                "fileName": file_name,
                "status": "PARSE_FAILED",
            }),
            Self::InvalidRowSkipped => json!({ "status": "INVALID_ROW_SKIPPED" }),
            Self::NoInvoiceNumberFound => json!({ "status": "NO_INVOICE_NUMBER_FOUND" }),
        }
    }
}

/// Batch processor over the pipeline's collaborators.
///
/// All collaborator calls are sequential; quota enforcement and duplicate
/// detection rely on that.
pub struct BatchProcessor<'a> {
    store: &'a dyn Store,
    sink: &'a dyn SpreadsheetSink,
    renderer: &'a dyn PdfRenderer,
    ocr: &'a dyn OcrEngine,
    learner: &'a dyn MappingLearner,
}

impl<'a> BatchProcessor<'a> {
    pub fn new(
        store: &'a dyn Store,
        sink: &'a dyn SpreadsheetSink,
        renderer: &'a dyn PdfRenderer,
        ocr: &'a dyn OcrEngine,
    ) -> Self {
        Self {
            store,
            sink,
            renderer,
            ocr,
            learner: &LITERAL_ECHO,
        }
    }

    /// Swap the mapping-learning heuristic.
    pub fn with_learner(mut self, learner: &'a dyn MappingLearner) -> Self {
        self.learner = learner;
        self
    }

    /// Process one batch of files for a user.
    ///
    /// Per-file failures become outcome entries; only batch-level
    /// preconditions (no files, no valid sink target, quota already
    /// exhausted) surface as errors. Once the ceiling is hit mid-batch,
    /// remaining files are not attempted and the partial results are
    /// returned.
    pub fn process_batch(
        &self,
        user: &mut UserAccount,
        sender_email: &str,
        files: &[UploadedFile],
        spreadsheet_id: Option<&str>,
    ) -> Result<Vec<FileOutcome>, BatchError> {
        if files.is_empty() {
            return Err(BatchError::NoFiles);
        }

        let policy = user.subscription.tier.policy();
        let target = self.resolve_spreadsheet(user, &policy, spreadsheet_id)?;

        if at_ceiling(&policy, user) {
            return Err(BatchError::QuotaExhausted {
                tier: user.subscription.tier,
            });
        }

        info!(
            "processing batch of {} file(s) from {} for user {} ({} tier)",
            files.len(),
            sender_email,
            user.id,
            user.subscription.tier
        );

        let mut outcomes = Vec::new();
        'files: for file in files {
            if at_ceiling(&policy, user) {
                debug!("quota ceiling reached; leaving remaining files unattempted");
                break;
            }

            let kind = FileKind::classify(&file.file_name);
            match kind {
                FileKind::Csv | FileKind::Excel => {
                    let parsed = if kind == FileKind::Csv {
                        tabular::parse_csv(&file.content)
                    } else {
                        tabular::parse_excel(&file.content)
                    };
                    let rows = match parsed {
                        Ok(rows) => rows,
                        Err(err) => {
                            warn!("failed to parse {}: {}", file.file_name, err);
                            outcomes.push(FileOutcome::ParseFailed {
                                file_name: file.file_name.clone(),
                            });
                            continue;
                        }
                    };
                    for row in &rows {
                        if at_ceiling(&policy, user) {
                            break 'files;
                        }
                        outcomes.push(self.import_row(user, sender_email, file, row, &target)?);
                    }
                }
                FileKind::Pdf => {
                    let extractor = DocumentTextExtractor::new(self.renderer, self.ocr);
                    let text = match extractor.extract(&file.file_name, &file.content) {
                        Ok(text) => text,
                        Err(err) => {
                            warn!("OCR failed for {}: {}", file.file_name, err);
                            outcomes.push(FileOutcome::OcrFailed {
                                file_name: file.file_name.clone(),
                            });
                            continue;
                        }
                    };
                    outcomes.push(self.process_text(user, sender_email, file, &text, &target)?);
                }
                FileKind::Unknown => {
                    let text = file.extracted_text.clone().unwrap_or_default();
                    outcomes.push(self.process_text(user, sender_email, file, &text, &target)?);
                }
            }
        }

        Ok(outcomes)
    }

    fn resolve_spreadsheet(
        &self,
        user: &UserAccount,
        policy: &TierPolicy,
        requested: Option<&str>,
    ) -> Result<String, BatchError> {
        match policy.selection {
            SelectionPolicy::FirstConnected => user
                .first_spreadsheet()
                .map(|s| s.spreadsheet_id.clone())
                .ok_or(BatchError::NoSpreadsheetConnected),
            SelectionPolicy::CallerSelected => {
                let requested_id =
                    requested.ok_or(BatchError::InvalidSpreadsheetSelection { requested: None })?;
                user.find_spreadsheet(requested_id)
                    .map(|s| s.spreadsheet_id.clone())
                    .ok_or_else(|| BatchError::InvalidSpreadsheetSelection {
                        requested: Some(requested_id.to_string()),
                    })
            }
        }
    }

    /// Direct import of one tabular row: always treated as fully extracted
    /// (confidence 1.0, auto-processed), with the JSON-serialized row as the
    /// record's raw text.
    fn import_row(
        &self,
        user: &mut UserAccount,
        sender_email: &str,
        file: &UploadedFile,
        row: &InvoiceRow,
        spreadsheet_id: &str,
    ) -> Result<FileOutcome, StoreError> {
        if row.invoice_number.is_empty() {
            return Ok(FileOutcome::InvalidRowSkipped);
        }
        if self
            .store
            .find_invoice(&user.id, &row.invoice_number)?
            .is_some()
        {
            return Ok(FileOutcome::DuplicateSkipped {
                invoice_number: row.invoice_number.clone(),
            });
        }

        let record = self.store.insert_invoice(NewInvoice {
            user_id: user.id.clone(),
            sender_email: sender_email.to_string(),
            file_name: file.file_name.clone(),
            extracted_text: serde_json::to_string(row).unwrap_or_default(),
            invoice_number: row.invoice_number.clone(),
            invoice_date: row.date.clone(),
            total_amount: row.total.clone(),
            confidence_score: 1.0,
            status: ProcessingStatus::AutoProcessed,
            spreadsheet_id: Some(spreadsheet_id.to_string()),
        })?;
        user.subscription.invoices_uploaded = self.store.increment_invoices_uploaded(&user.id)?;

        let sink_error = self.push_to_sink(spreadsheet_id, &record);
        Ok(FileOutcome::Processed {
            invoice_number: record.invoice_number,
            status: ProcessingStatus::AutoProcessed,
            confidence_score: 1.0,
            sink_error,
        })
    }

    /// Document/generic path: mapping lookup, field extraction, duplicate
    /// guard, scoring, persistence, conditional sink push, and auto-learning
    /// for first-time senders.
    fn process_text(
        &self,
        user: &mut UserAccount,
        sender_email: &str,
        file: &UploadedFile,
        text: &str,
        spreadsheet_id: &str,
    ) -> Result<FileOutcome, StoreError> {
        let text = text.trim();
        if text.is_empty() {
            debug!("no text available for {}", file.file_name);
            return Ok(FileOutcome::NoInvoiceNumberFound);
        }

        let mapping = self.store.find_active_mapping(&user.id, sender_email)?;
        let fields = extract::extract_fields(text, mapping.as_ref());

        // Empty invoice numbers are never deduplicated; every numberless
        // extraction is treated as distinct.
        if !fields.invoice_number.is_empty()
            && self
                .store
                .find_invoice(&user.id, &fields.invoice_number)?
                .is_some()
        {
            return Ok(FileOutcome::DuplicateSkipped {
                invoice_number: fields.invoice_number,
            });
        }

        let (confidence_score, status) = score(&fields);

        let record = self.store.insert_invoice(NewInvoice {
            user_id: user.id.clone(),
            sender_email: sender_email.to_string(),
            file_name: file.file_name.clone(),
            extracted_text: text.to_string(),
            invoice_number: fields.invoice_number.clone(),
            invoice_date: fields.invoice_date.clone(),
            total_amount: fields.total_amount.clone(),
            confidence_score,
            status,
            spreadsheet_id: Some(spreadsheet_id.to_string()),
        })?;
        user.subscription.invoices_uploaded = self.store.increment_invoices_uploaded(&user.id)?;

        let sink_error = if status == ProcessingStatus::AutoProcessed {
            self.push_to_sink(spreadsheet_id, &record)
        } else {
            None
        };

        // The first extraction for an unseen sender becomes its template.
        if mapping.is_none() {
            self.learn_mapping(&user.id, sender_email, &fields)?;
        }

        Ok(FileOutcome::Processed {
            invoice_number: record.invoice_number,
            status,
            confidence_score,
            sink_error,
        })
    }

    fn learn_mapping(
        &self,
        user_id: &str,
        sender_email: &str,
        fields: &ExtractedFields,
    ) -> Result<(), StoreError> {
        self.learner.learn(self.store, user_id, sender_email, fields)?;
        Ok(())
    }

    /// A sink failure is logged and surfaced on the outcome; the persisted
    /// record stands and the batch continues.
    fn push_to_sink(&self, spreadsheet_id: &str, record: &InvoiceRecord) -> Option<String> {
        match self.sink.append_row(spreadsheet_id, &sink::sink_row(record)) {
            Ok(()) => {
                info!(
                    "pushed invoice {} to spreadsheet {}",
                    record.invoice_number, spreadsheet_id
                );
                None
            }
            Err(err) => {
                warn!(
                    "sink push failed for invoice {}: {}",
                    record.invoice_number, err
                );
                Some(err.to_string())
            }
        }
    }
}

fn at_ceiling(policy: &TierPolicy, user: &UserAccount) -> bool {
    policy
        .invoice_ceiling
        .is_some_and(|ceiling| user.subscription.invoices_uploaded >= ceiling)
}
