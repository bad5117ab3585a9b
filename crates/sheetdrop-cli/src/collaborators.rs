//! Concrete pipeline collaborators backed by local tools and files.
//!
//! The library traits stay tool-agnostic; this module binds them to
//! `pdftoppm` for page rendering, `tesseract` for OCR, and per-spreadsheet
//! CSV files standing in for the external spreadsheet service.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use sheetdrop_core::error::{ExtractError, SinkError};
use sheetdrop_core::sink::SpreadsheetSink;
use sheetdrop_core::text::{OcrEngine, PdfRenderer};
use tracing::debug;

/// Renders PDF pages to PNG via poppler's `pdftoppm`.
pub struct PopplerRenderer;

impl PdfRenderer for PopplerRenderer {
    fn render(&self, pdf: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
        let prefix = out_dir.join("page");
        let output = Command::new("pdftoppm")
            .arg("-png")
            .arg(pdf)
            .arg(&prefix)
            .output()
            .map_err(|e| ExtractError::ConversionFailure {
                file: pdf.display().to_string(),
                reason: format!("failed to run pdftoppm: {e}"),
            })?;

        if !output.status.success() {
            return Err(ExtractError::ConversionFailure {
                file: pdf.display().to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // pdftoppm names pages page-1.png, page-2.png, ... in page order.
        let mut pages: Vec<PathBuf> = fs::read_dir(out_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("png"))
            .collect();
        pages.sort();
        debug!("pdftoppm produced {} page image(s)", pages.len());
        Ok(pages)
    }
}

/// OCR via the `tesseract` binary, one invocation per page image.
pub struct TesseractEngine;

impl OcrEngine for TesseractEngine {
    fn recognize(&self, image: &Path) -> Result<String, ExtractError> {
        let output = Command::new("tesseract")
            .arg(image)
            .arg("stdout")
            .output()
            .map_err(|e| ExtractError::OcrFailure(format!("failed to run tesseract: {e}")))?;

        if !output.status.success() {
            return Err(ExtractError::OcrFailure(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Spreadsheet sink writing one CSV file per spreadsheet id under a base
/// directory.
pub struct CsvFileSink {
    base_dir: PathBuf,
}

impl CsvFileSink {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl SpreadsheetSink for CsvFileSink {
    fn append_row(&self, spreadsheet_id: &str, values: &[String]) -> Result<(), SinkError> {
        let map_io = |e: std::io::Error| {
            if e.kind() == ErrorKind::PermissionDenied {
                SinkError::PermissionDenied {
                    spreadsheet_id: spreadsheet_id.to_string(),
                    share_with: "the sheetdrop process user".to_string(),
                }
            } else {
                SinkError::Request(e.to_string())
            }
        };

        fs::create_dir_all(&self.base_dir).map_err(map_io)?;
        let path = self.base_dir.join(format!("{spreadsheet_id}.csv"));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(map_io)?;

        let mut writer = csv::WriterBuilder::new().from_writer(file);
        writer
            .write_record(values)
            .map_err(|e| SinkError::Request(e.to_string()))?;
        writer.flush().map_err(map_io)?;
        Ok(())
    }
}
