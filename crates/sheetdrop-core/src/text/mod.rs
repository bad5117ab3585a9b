//! Text extraction from uploaded files.
//!
//! Tabular formats parse into normalized rows (`tabular`); PDFs go through an
//! external page-rendering collaborator and an external OCR collaborator,
//! one recognition call per page image.

pub mod tabular;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ExtractError;

/// External PDF-to-image conversion collaborator.
pub trait PdfRenderer {
    /// Render one image per page into `out_dir`, returning the image paths
    /// in page order.
    fn render(&self, pdf: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, ExtractError>;
}

/// External OCR collaborator; one call per page image.
pub trait OcrEngine {
    /// Recognize text in a single page image.
    fn recognize(&self, image: &Path) -> Result<String, ExtractError>;
}

/// OCR orchestration for PDF uploads.
pub struct DocumentTextExtractor<'a> {
    renderer: &'a dyn PdfRenderer,
    ocr: &'a dyn OcrEngine,
}

impl<'a> DocumentTextExtractor<'a> {
    pub fn new(renderer: &'a dyn PdfRenderer, ocr: &'a dyn OcrEngine) -> Self {
        Self { renderer, ocr }
    }

    /// Extract text from a PDF upload buffer.
    ///
    /// The buffer and all rendered page images live in a scoped temp
    /// directory that is removed on both success and failure. Page texts are
    /// concatenated with a newline separator and trimmed.
    pub fn extract(&self, file_name: &str, content: &[u8]) -> Result<String, ExtractError> {
        let dir = tempfile::tempdir()?;

        // Only the final path component; declared names may carry directories.
        let base_name = Path::new(file_name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.pdf");
        let pdf_path = dir.path().join(base_name);
        fs::write(&pdf_path, content)?;

        let images = self.renderer.render(&pdf_path, dir.path())?;
        if images.is_empty() {
            return Err(ExtractError::ConversionFailure {
                file: file_name.to_string(),
                reason: "no page images generated".to_string(),
            });
        }
        debug!("rendered {} page images for {}", images.len(), file_name);

        let mut text = String::new();
        for image in &images {
            let page = self.ocr.recognize(image)?;
            text.push_str(&page);
            text.push('\n');
        }

        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

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

    struct EchoOcr;

    impl OcrEngine for EchoOcr {
        fn recognize(&self, image: &Path) -> Result<String, ExtractError> {
            Ok(format!("text from {}", image.file_name().unwrap().to_string_lossy()))
        }
    }

    struct FailingOcr;

    impl OcrEngine for FailingOcr {
        fn recognize(&self, _image: &Path) -> Result<String, ExtractError> {
            Err(ExtractError::OcrFailure("engine crashed".to_string()))
        }
    }

    #[test]
    fn concatenates_page_texts_with_newlines() {
        let renderer = FixedRenderer { pages: 2 };
        let extractor = DocumentTextExtractor::new(&renderer, &EchoOcr);

        let text = extractor.extract("scan.pdf", b"%PDF-").unwrap();
        assert_eq!(text, "text from page-0.png\ntext from page-1.png");
    }

    #[test]
    fn zero_pages_is_a_conversion_failure() {
        let renderer = FixedRenderer { pages: 0 };
        let extractor = DocumentTextExtractor::new(&renderer, &EchoOcr);

        let err = extractor.extract("scan.pdf", b"%PDF-").unwrap_err();
        assert!(matches!(err, ExtractError::ConversionFailure { .. }));
    }

    #[test]
    fn ocr_errors_propagate_as_ocr_failure() {
        let renderer = FixedRenderer { pages: 1 };
        let extractor = DocumentTextExtractor::new(&renderer, &FailingOcr);

        let err = extractor.extract("scan.pdf", b"%PDF-").unwrap_err();
        assert!(matches!(err, ExtractError::OcrFailure(_)));
    }
}
