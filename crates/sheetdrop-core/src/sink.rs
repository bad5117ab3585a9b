//! External spreadsheet sink abstraction.

use chrono::{SecondsFormat, Utc};

use crate::error::SinkError;
use crate::models::invoice::InvoiceRecord;

/// Push-only destination receiving one appended row per auto-processed
/// invoice.
pub trait SpreadsheetSink {
    /// Append one row of values to the given spreadsheet.
    fn append_row(&self, spreadsheet_id: &str, values: &[String]) -> Result<(), SinkError>;
}

/// Row layout pushed for an auto-processed record: invoice number, date,
/// amount, status, confidence score, and the push timestamp.
pub fn sink_row(record: &InvoiceRecord) -> Vec<String> {
    vec![
        record.invoice_number.clone(),
        record.invoice_date.clone(),
        record.total_amount.clone(),
        record.status.to_string(),
        record.confidence_score.to_string(),
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    ]
}
