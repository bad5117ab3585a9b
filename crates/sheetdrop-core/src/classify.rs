//! File classification from the declared file name.

use std::path::Path;

/// Content category assigned to an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Csv,
    Excel,
    Unknown,
}

impl FileKind {
    /// Classify a file by the extension of its declared name.
    ///
    /// Case-insensitive, no content sniffing. Unknown extensions fall through
    /// to the generic path where the caller supplies pre-extracted text.
    pub fn classify(file_name: &str) -> Self {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => Self::Pdf,
            "csv" => Self::Csv,
            "xlsx" | "xls" => Self::Excel,
            _ => Self::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn classifies_by_extension_case_insensitively() {
        assert_eq!(FileKind::classify("invoice.pdf"), FileKind::Pdf);
        assert_eq!(FileKind::classify("INVOICE.PDF"), FileKind::Pdf);
        assert_eq!(FileKind::classify("rows.csv"), FileKind::Csv);
        assert_eq!(FileKind::classify("book.xlsx"), FileKind::Excel);
        assert_eq!(FileKind::classify("legacy.XLS"), FileKind::Excel);
    }

    #[test]
    fn unknown_for_other_or_missing_extensions() {
        assert_eq!(FileKind::classify("notes.txt"), FileKind::Unknown);
        assert_eq!(FileKind::classify("no_extension"), FileKind::Unknown);
        assert_eq!(FileKind::classify(""), FileKind::Unknown);
    }
}
