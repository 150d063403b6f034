//! Document text extraction for uploaded résumés (PDF and plain text).

use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Text,
}

impl DocumentFormat {
    /// Format from the file extension, compared case-insensitively.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let ext = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::Text),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("File type not supported: {0}")]
    UnsupportedFileType(String),

    #[error("Could not read PDF: {0}")]
    Pdf(String),

    #[error("Document contains no extractable text")]
    EmptyDocument,
}

/// Extracts the text of an uploaded document. CPU-bound for PDFs; call from
/// `spawn_blocking` in async contexts.
pub fn extract_text(file_name: &str, bytes: &[u8]) -> Result<String, ExtractError> {
    let format = DocumentFormat::from_file_name(file_name)
        .ok_or_else(|| ExtractError::UnsupportedFileType(file_name.to_lowercase()))?;

    let text = match format {
        DocumentFormat::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ExtractError::Pdf(e.to_string()))?,
        DocumentFormat::Text => decode_text(bytes),
    };

    if text.trim().is_empty() {
        return Err(ExtractError::EmptyDocument);
    }

    debug!(?format, chars = text.chars().count(), "Extracted document text");
    Ok(text)
}

/// UTF-8, falling back to Latin-1 (every byte maps to one code point).
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension_is_case_insensitive() {
        assert_eq!(DocumentFormat::from_file_name("cv.PDF"), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_file_name("my.resume.txt"), Some(DocumentFormat::Text));
        assert_eq!(DocumentFormat::from_file_name("cv.docx"), None);
        assert_eq!(DocumentFormat::from_file_name("README"), None);
    }

    #[test]
    fn test_utf8_text_extracted_verbatim() {
        let text = extract_text("cv.txt", "Résumé\n• Built APIs".as_bytes()).unwrap();
        assert_eq!(text, "Résumé\n• Built APIs");
    }

    #[test]
    fn test_latin1_fallback() {
        // "café" in Latin-1; 0xE9 alone is invalid UTF-8.
        let text = extract_text("cv.txt", &[b'c', b'a', b'f', 0xE9]).unwrap();
        assert_eq!(text, "café");
    }

    #[test]
    fn test_unsupported_extension_rejected() {
        let err = extract_text("cv.DOCX", b"anything").unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFileType(ref name) if name == "cv.docx"));
    }

    #[test]
    fn test_blank_document_rejected() {
        assert!(matches!(
            extract_text("cv.txt", b"  \n\t "),
            Err(ExtractError::EmptyDocument)
        ));
    }

    #[test]
    fn test_garbage_pdf_is_an_extraction_error() {
        assert!(matches!(
            extract_text("cv.pdf", b"not a pdf"),
            Err(ExtractError::Pdf(_))
        ));
    }

    #[test]
    fn test_buffered_upload_extracts() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"Summary\nSkills: Rust").unwrap();
        let bytes = std::fs::read(file.path()).unwrap();
        assert_eq!(extract_text("upload.txt", &bytes).unwrap(), "Summary\nSkills: Rust");
    }
}
