//! Tabular (CSV/Excel) row parsing with normalized header access.
//!
//! Header spellings vary between exports; each field is resolved against a
//! fixed priority list and the first non-empty match wins.

use std::collections::HashMap;
use std::io::Cursor;

use calamine::{Reader, Xlsx};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TabularError;

/// Header variants accepted for the invoice number, in priority order.
const NUMBER_HEADERS: &[&str] = &["invoiceNumber", "Invoice Number", "invoice_number"];
/// Header variants accepted for the invoice date, in priority order.
const DATE_HEADERS: &[&str] = &["date", "Invoice Date", "invoice_date"];
/// Header variants accepted for the total amount, in priority order.
const TOTAL_HEADERS: &[&str] = &["total", "Total Amount", "total_amount"];

/// One normalized invoice row from a tabular source.
///
/// Serializes with the wire field names so a JSON-serialized row can stand in
/// for raw extracted text on the record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRow {
    #[serde(rename = "invoiceNumber")]
    pub invoice_number: String,
    pub date: String,
    pub total: String,
}

impl InvoiceRow {
    fn from_cells(cells: &HashMap<String, String>) -> Self {
        Self {
            invoice_number: pick_field(cells, NUMBER_HEADERS),
            date: pick_field(cells, DATE_HEADERS),
            total: pick_field(cells, TOTAL_HEADERS),
        }
    }
}

/// First non-empty value among the candidate headers, checked in order.
fn pick_field(cells: &HashMap<String, String>, candidates: &[&str]) -> String {
    for candidate in candidates {
        if let Some(value) = cells.get(*candidate) {
            let value = value.trim();
            if !value.is_empty() {
                return value.to_string();
            }
        }
    }
    String::new()
}

/// Parse a CSV upload into normalized invoice rows.
pub fn parse_csv(content: &[u8]) -> Result<Vec<InvoiceRow>, TabularError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let cells: HashMap<String, String> = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        rows.push(InvoiceRow::from_cells(&cells));
    }

    debug!("parsed {} CSV rows", rows.len());
    Ok(rows)
}

/// Parse the first sheet of an Excel upload into normalized invoice rows.
pub fn parse_excel(content: &[u8]) -> Result<Vec<InvoiceRow>, TabularError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(content.to_vec()))
        .map_err(|e| TabularError::Excel(e.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(TabularError::NoSheets)?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| TabularError::Excel(e.to_string()))?;

    let mut row_iter = range.rows();
    let headers: Vec<String> = match row_iter.next() {
        Some(header_row) => header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect(),
        None => return Ok(Vec::new()),
    };

    let mut rows = Vec::new();
    for data_row in row_iter {
        let cells: HashMap<String, String> = headers
            .iter()
            .zip(data_row.iter())
            .map(|(h, cell)| (h.clone(), cell.to_string()))
            .collect();
        rows.push(InvoiceRow::from_cells(&cells));
    }

    debug!("parsed {} rows from sheet {:?}", rows.len(), sheet_name);
    Ok(rows)
}
