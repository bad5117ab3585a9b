//! End-to-end batch processing against the in-memory store with fake
//! collaborators for the renderer, OCR engine, and spreadsheet sink.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use pretty_assertions::assert_eq;
use sheetdrop_core::error::{BatchError, ExtractError, SinkError};
use sheetdrop_core::models::invoice::ProcessingStatus;
use sheetdrop_core::models::mapping::{ExtractionRules, MappingSource, MappingUpdate};
use sheetdrop_core::models::user::{Tier, UserAccount};
use sheetdrop_core::pipeline::{BatchProcessor, FileOutcome, UploadedFile};
use sheetdrop_core::sink::SpreadsheetSink;
use sheetdrop_core::store::{InvoiceFilter, MemoryStore, Store};
use sheetdrop_core::text::{OcrEngine, PdfRenderer};

#[derive(Default)]
struct RecordingSink {
    rows: Mutex<Vec<(String, Vec<String>)>>,
}

impl RecordingSink {
    fn rows(&self) -> Vec<(String, Vec<String>)> {
        self.rows.lock().unwrap().clone()
    }
}

impl SpreadsheetSink for RecordingSink {
    fn append_row(&self, spreadsheet_id: &str, values: &[String]) -> Result<(), SinkError> {
        self.rows
            .lock()
            .unwrap()
            .push((spreadsheet_id.to_string(), values.to_vec()));
        Ok(())
    }
}

struct DenyingSink;

impl SpreadsheetSink for DenyingSink {
    fn append_row(&self, spreadsheet_id: &str, _values: &[String]) -> Result<(), SinkError> {
        Err(SinkError::PermissionDenied {
            spreadsheet_id: spreadsheet_id.to_string(),
            share_with: "svc@sheetdrop.test".to_string(),
        })
    }
}

/// Renders a fixed number of page images, zero modeling a conversion failure.
struct FixedRenderer {
    pages: usize,
}

impl PdfRenderer for FixedRenderer {
    fn render(&self, _pdf: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
        let mut paths = Vec::new();
        for i in 0..self.pages {
            let path = out_dir.join(format!("page-{i}.png"));
            fs::write(&path, b"img")?;
            paths.push(path);
        }
        Ok(paths)
    }
}

/// Returns the same text for every page image.
struct StaticOcr {
    text: &'static str,
}

impl OcrEngine for StaticOcr {
    fn recognize(&self, _image: &Path) -> Result<String, ExtractError> {
        Ok(self.text.to_string())
    }
}

fn free_user(store: &MemoryStore) -> UserAccount {
    let mut user = UserAccount::new("u1", "u1@example.com", Tier::Free);
    user.connect_spreadsheet("s1", "Invoices").unwrap();
    store.put_user(&user);
    user
}

fn text_file(name: &str, text: &str) -> UploadedFile {
    UploadedFile::new(name, Vec::new()).with_extracted_text(text)
}

static NO_OCR: StaticOcr = StaticOcr { text: "" };

fn processor<'a>(
    store: &'a MemoryStore,
    sink: &'a dyn SpreadsheetSink,
    renderer: &'a FixedRenderer,
    ocr: &'a StaticOcr,
) -> BatchProcessor<'a> {
    BatchProcessor::new(store, sink, renderer, ocr)
}

#[test]
fn csv_rows_import_fully_extracted_and_push_to_the_sink() {
    let store = MemoryStore::new();
    let sink = RecordingSink::default();
    let renderer = FixedRenderer { pages: 0 };
    let mut user = free_user(&store);

    let csv = UploadedFile::new(
        "rows.csv",
        b"invoiceNumber,date,total\nINV-100,2024-01-01,500\n".to_vec(),
    );
    let outcomes = processor(&store, &sink, &renderer, &NO_OCR)
        .process_batch(&mut user, "billing@acme.test", &[csv], None)
        .unwrap();

    assert_eq!(outcomes, vec![FileOutcome::Processed {
        invoice_number: "INV-100".to_string(),
        status: ProcessingStatus::AutoProcessed,
        confidence_score: 1.0,
        sink_error: None,
    }]);

    let record = store.find_invoice("u1", "INV-100").unwrap().unwrap();
    assert_eq!(record.invoice_date, "2024-01-01");
    assert_eq!(record.total_amount, "500");
    assert_eq!(
        record.extracted_text,
        r#"{"invoiceNumber":"INV-100","date":"2024-01-01","total":"500"}"#
    );

    let rows = sink.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, "s1");
    assert_eq!(rows[0].1[..5], [
        "INV-100".to_string(),
        "2024-01-01".to_string(),
        "500".to_string(),
        "AUTO_PROCESSED".to_string(),
        "1".to_string(),
    ]);
    assert_eq!(user.subscription.invoices_uploaded, 1);
}

#[test]
fn tabular_rows_without_a_number_are_skipped() {
    let store = MemoryStore::new();
    let sink = RecordingSink::default();
    let renderer = FixedRenderer { pages: 0 };
    let mut user = free_user(&store);

    let csv = UploadedFile::new(
        "rows.csv",
        b"invoiceNumber,date,total\n,2024-01-01,500\nINV-2,2024-01-02,10\n".to_vec(),
    );
    let outcomes = processor(&store, &sink, &renderer, &NO_OCR)
        .process_batch(&mut user, "billing@acme.test", &[csv], None)
        .unwrap();

    assert_eq!(outcomes[0], FileOutcome::InvalidRowSkipped);
    assert!(matches!(outcomes[1], FileOutcome::Processed { .. }));
    assert_eq!(user.subscription.invoices_uploaded, 1);
}

#[test]
fn unparseable_csv_becomes_a_parse_failed_outcome() {
    let store = MemoryStore::new();
    let sink = RecordingSink::default();
    let renderer = FixedRenderer { pages: 0 };
    let mut user = free_user(&store);

    let bad = UploadedFile::new(
        "rows.csv",
        b"invoiceNumber,date,total\n\"INV-1,2024,5\n".to_vec(),
    );
    let outcomes = processor(&store, &sink, &renderer, &NO_OCR)
        .process_batch(&mut user, "billing@acme.test", &[bad], None)
        .unwrap();

    assert_eq!(outcomes, vec![FileOutcome::ParseFailed {
        file_name: "rows.csv".to_string(),
    }]);
    assert!(store
        .list_invoices("u1", &InvoiceFilter::default())
        .unwrap()
        .is_empty());
}

#[test]
fn partial_ocr_extraction_lands_in_review_and_learns_a_mapping() {
    let store = MemoryStore::new();
    let sink = RecordingSink::default();
    let renderer = FixedRenderer { pages: 1 };
    let ocr = StaticOcr {
        text: "Invoice Number: A1\nTotal: $50",
    };
    let mut user = free_user(&store);

    let pdf = UploadedFile::new("scan.pdf", b"%PDF-".to_vec());
    let outcomes = processor(&store, &sink, &renderer, &ocr)
        .process_batch(&mut user, "billing@acme.test", &[pdf], None)
        .unwrap();

    // Number (0.3) + amount (0.4), no date.
    assert_eq!(outcomes, vec![FileOutcome::Processed {
        invoice_number: "A1".to_string(),
        status: ProcessingStatus::NeedsReview,
        confidence_score: 0.3 + 0.4,
        sink_error: None,
    }]);
    // Records in review are not pushed to the sink.
    assert!(sink.rows().is_empty());

    let mappings = store.list_mappings("u1").unwrap();
    assert_eq!(mappings.len(), 1);
    assert_eq!(mappings[0].mapping_source, MappingSource::Auto);
    assert_eq!(
        mappings[0].extraction_rules.invoice_number.as_deref(),
        Some(r"Invoice Number[:\s]*(A1)")
    );
    assert_eq!(mappings[0].extraction_rules.invoice_date, None);
    assert_eq!(
        mappings[0].extraction_rules.total_amount.as_deref(),
        Some(r"(\$50)")
    );
}

#[test]
fn fully_extracted_ocr_text_auto_processes_and_pushes() {
    let store = MemoryStore::new();
    let sink = RecordingSink::default();
    let renderer = FixedRenderer { pages: 1 };
    let ocr = StaticOcr {
        text: "Invoice Number: INV-42\nInvoice Date: 2024-05-01\nTotal: $1,250.00",
    };
    let mut user = free_user(&store);

    let pdf = UploadedFile::new("scan.pdf", b"%PDF-".to_vec());
    let outcomes = processor(&store, &sink, &renderer, &ocr)
        .process_batch(&mut user, "billing@acme.test", &[pdf], None)
        .unwrap();

    assert_eq!(outcomes, vec![FileOutcome::Processed {
        invoice_number: "INV-42".to_string(),
        status: ProcessingStatus::AutoProcessed,
        confidence_score: 1.0,
        sink_error: None,
    }]);
    assert_eq!(sink.rows().len(), 1);
}

#[test]
fn existing_mapping_takes_precedence_and_suppresses_learning() {
    let store = MemoryStore::new();
    let sink = RecordingSink::default();
    let renderer = FixedRenderer { pages: 0 };
    let mut user = free_user(&store);

    store
        .upsert_mapping(MappingUpdate {
            sender_email: "billing@acme.test".to_string(),
            user_id: "u1".to_string(),
            vendor_name: Some("Acme".to_string()),
            field_mappings: None,
            extraction_rules: Some(ExtractionRules {
                invoice_number: Some(r"Ref[:\s]*([A-Z0-9-]+)".to_string()),
                invoice_date: None,
                total_amount: None,
            }),
        })
        .unwrap();

    let file = text_file("note.txt", "Ref: ACME-7\nInvoice Number: WRONG-1");
    let outcomes = processor(&store, &sink, &renderer, &NO_OCR)
        .process_batch(&mut user, "billing@acme.test", &[file], None)
        .unwrap();

    match &outcomes[0] {
        FileOutcome::Processed { invoice_number, .. } => assert_eq!(invoice_number, "ACME-7"),
        other => panic!("unexpected outcome {other:?}"),
    }

    // The manual mapping is untouched; no auto-learning happened.
    let mappings = store.list_mappings("u1").unwrap();
    assert_eq!(mappings.len(), 1);
    assert_eq!(mappings[0].mapping_source, MappingSource::Manual);
    assert_eq!(mappings[0].version, 1);
}

#[test]
fn duplicate_invoice_is_skipped_without_a_second_record_or_count() {
    let store = MemoryStore::new();
    let sink = RecordingSink::default();
    let renderer = FixedRenderer { pages: 0 };
    let mut user = free_user(&store);
    let processor = processor(&store, &sink, &renderer, &NO_OCR);

    let text = "Invoice Number: INV-9\nInvoice Date: 2024-01-01\nTotal: $5";
    let first = processor
        .process_batch(
            &mut user,
            "billing@acme.test",
            &[text_file("a.txt", text)],
            None,
        )
        .unwrap();
    assert!(matches!(first[0], FileOutcome::Processed { .. }));

    let second = processor
        .process_batch(
            &mut user,
            "billing@acme.test",
            &[text_file("b.txt", text)],
            None,
        )
        .unwrap();
    assert_eq!(second, vec![FileOutcome::DuplicateSkipped {
        invoice_number: "INV-9".to_string(),
    }]);

    let records = store.list_invoices("u1", &InvoiceFilter::default()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(user.subscription.invoices_uploaded, 1);
}

#[test]
fn empty_text_uploads_yield_no_invoice_number_found() {
    let store = MemoryStore::new();
    let sink = RecordingSink::default();
    let renderer = FixedRenderer { pages: 0 };
    let mut user = free_user(&store);

    let file = UploadedFile::new("mystery.bin", vec![1, 2, 3]);
    let outcomes = processor(&store, &sink, &renderer, &NO_OCR)
        .process_batch(&mut user, "billing@acme.test", &[file], None)
        .unwrap();

    assert_eq!(outcomes, vec![FileOutcome::NoInvoiceNumberFound]);
    assert!(store
        .list_invoices("u1", &InvoiceFilter::default())
        .unwrap()
        .is_empty());
    assert_eq!(user.subscription.invoices_uploaded, 0);
}

#[test]
fn failed_pdf_conversion_becomes_an_ocr_failed_outcome() {
    let store = MemoryStore::new();
    let sink = RecordingSink::default();
    let renderer = FixedRenderer { pages: 0 };
    let mut user = free_user(&store);

    let pdf = UploadedFile::new("scan.pdf", b"%PDF-".to_vec());
    let outcomes = processor(&store, &sink, &renderer, &NO_OCR)
        .process_batch(&mut user, "billing@acme.test", &[pdf], None)
        .unwrap();

    assert_eq!(outcomes, vec![FileOutcome::OcrFailed {
        file_name: "scan.pdf".to_string(),
    }]);
    assert!(store
        .list_invoices("u1", &InvoiceFilter::default())
        .unwrap()
        .is_empty());
}

#[test]
fn quota_already_exhausted_rejects_the_whole_batch() {
    let store = MemoryStore::new();
    let sink = RecordingSink::default();
    let renderer = FixedRenderer { pages: 0 };
    let mut user = free_user(&store);
    user.subscription.invoices_uploaded = 20;
    store.put_user(&user);

    let csv = UploadedFile::new(
        "rows.csv",
        b"invoiceNumber,date,total\nINV-1,2024-01-01,5\n".to_vec(),
    );
    let err = processor(&store, &sink, &renderer, &NO_OCR)
        .process_batch(&mut user, "billing@acme.test", &[csv], None)
        .unwrap_err();

    assert!(matches!(err, BatchError::QuotaExhausted { tier: Tier::Free }));
    assert!(store
        .list_invoices("u1", &InvoiceFilter::default())
        .unwrap()
        .is_empty());
}

#[test]
fn ceiling_reached_mid_batch_leaves_remaining_files_unattempted() {
    let store = MemoryStore::new();
    let sink = RecordingSink::default();
    let renderer = FixedRenderer { pages: 0 };
    let mut user = free_user(&store);
    user.subscription.invoices_uploaded = 19;
    store.put_user(&user);

    let files: Vec<UploadedFile> = (1..=3)
        .map(|i| {
            UploadedFile::new(
                format!("rows-{i}.csv"),
                format!("invoiceNumber,date,total\nINV-{i},2024-01-0{i},5\n").into_bytes(),
            )
        })
        .collect();
    let outcomes = processor(&store, &sink, &renderer, &NO_OCR)
        .process_batch(&mut user, "billing@acme.test", &files, None)
        .unwrap();

    // Only the file that fit under the ceiling was processed.
    assert_eq!(outcomes.len(), 1);
    assert_eq!(user.subscription.invoices_uploaded, 20);
    assert_eq!(
        store
            .list_invoices("u1", &InvoiceFilter::default())
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn free_tier_without_a_spreadsheet_cannot_process() {
    let store = MemoryStore::new();
    let sink = RecordingSink::default();
    let renderer = FixedRenderer { pages: 0 };
    let mut user = UserAccount::new("u1", "u1@example.com", Tier::Free);
    store.put_user(&user);

    let err = processor(&store, &sink, &renderer, &NO_OCR)
        .process_batch(
            &mut user,
            "billing@acme.test",
            &[text_file("a.txt", "x")],
            None,
        )
        .unwrap_err();
    assert!(matches!(err, BatchError::NoSpreadsheetConnected));
}

#[test]
fn caller_selected_tiers_validate_the_requested_spreadsheet() {
    let store = MemoryStore::new();
    let sink = RecordingSink::default();
    let renderer = FixedRenderer { pages: 0 };
    let mut user = UserAccount::new("u1", "u1@example.com", Tier::Basic);
    user.connect_spreadsheet("s1", "Invoices").unwrap();
    store.put_user(&user);
    let processor = processor(&store, &sink, &renderer, &NO_OCR);

    let file = || {
        UploadedFile::new(
            "rows.csv",
            b"invoiceNumber,date,total\nINV-1,2024-01-01,5\n".to_vec(),
        )
    };

    let err = processor
        .process_batch(&mut user, "billing@acme.test", &[file()], None)
        .unwrap_err();
    assert!(matches!(
        err,
        BatchError::InvalidSpreadsheetSelection { requested: None }
    ));

    let err = processor
        .process_batch(&mut user, "billing@acme.test", &[file()], Some("ghost"))
        .unwrap_err();
    assert!(matches!(
        err,
        BatchError::InvalidSpreadsheetSelection { requested: Some(_) }
    ));

    let outcomes = processor
        .process_batch(&mut user, "billing@acme.test", &[file()], Some("s1"))
        .unwrap();
    assert!(matches!(outcomes[0], FileOutcome::Processed { .. }));
    assert_eq!(sink.rows()[0].0, "s1");
}

#[test]
fn sink_failure_is_surfaced_without_rolling_back_the_record() {
    let store = MemoryStore::new();
    let renderer = FixedRenderer { pages: 0 };
    let mut user = free_user(&store);

    let csv = UploadedFile::new(
        "rows.csv",
        b"invoiceNumber,date,total\nINV-1,2024-01-01,5\nINV-2,2024-01-02,6\n".to_vec(),
    );
    let outcomes = BatchProcessor::new(&store, &DenyingSink, &renderer, &NO_OCR)
        .process_batch(&mut user, "billing@acme.test", &[csv], None)
        .unwrap();

    assert_eq!(outcomes.len(), 2);
    for outcome in &outcomes {
        match outcome {
            FileOutcome::Processed { sink_error, .. } => {
                assert!(sink_error.as_deref().unwrap_or_default().contains("share"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    // Both records persisted despite every push failing.
    assert_eq!(
        store
            .list_invoices("u1", &InvoiceFilter::default())
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn empty_batches_are_rejected() {
    let store = MemoryStore::new();
    let sink = RecordingSink::default();
    let renderer = FixedRenderer { pages: 0 };
    let mut user = free_user(&store);

    let err = processor(&store, &sink, &renderer, &NO_OCR)
        .process_batch(&mut user, "billing@acme.test", &[], None)
        .unwrap_err();
    assert!(matches!(err, BatchError::NoFiles));
}
