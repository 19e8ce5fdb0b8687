//! File-type validation for selected sources
//!
//! Every tool that accepts file input calls [`ensure_pdf`] before handing the
//! bytes to PDFium or qpdf, so a non-PDF never reaches a decoder.

use crate::error::{Error, Result};
use std::path::Path;

/// MIME type of a PDF document
pub const PDF_MIME_TYPE: &str = "application/pdf";

const GENERIC_MIME_TYPE: &str = "application/octet-stream";

/// A selected source file: bytes plus the metadata a file picker would report
#[derive(Debug, Clone)]
pub struct SelectedFile {
    /// Display name (file name, URL, or placeholder)
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Detected MIME type
    pub mime_type: String,
    /// Raw file contents
    pub data: Vec<u8>,
}

impl SelectedFile {
    /// Build a selected file, detecting its MIME type from the declared type,
    /// the file name, and finally the content.
    pub fn new(name: impl Into<String>, declared_mime: Option<&str>, data: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = detect_mime_type(declared_mime, &name, &data);
        Self {
            size: data.len() as u64,
            name,
            mime_type,
            data,
        }
    }

    /// Whether the file carries the PDF magic header
    pub fn has_pdf_header(&self) -> bool {
        has_pdf_header(&self.data)
    }
}

/// Check the `%PDF` magic header
pub fn has_pdf_header(data: &[u8]) -> bool {
    data.len() >= 4 && &data[0..4] == b"%PDF"
}

/// Detect the MIME type of a selected file.
///
/// A specific declared type wins; `application/octet-stream` and empty
/// declarations fall through to the file extension, then to content sniffing.
pub fn detect_mime_type(declared: Option<&str>, file_name: &str, data: &[u8]) -> String {
    if let Some(declared) = declared.map(normalize_mime) {
        if !declared.is_empty() && declared != GENERIC_MIME_TYPE {
            return declared;
        }
    }

    if let Some(mime) = mime_from_extension(file_name) {
        return mime.to_string();
    }

    if has_pdf_header(data) {
        return PDF_MIME_TYPE.to_string();
    }

    GENERIC_MIME_TYPE.to_string()
}

/// Strip parameters (`; charset=...`) and lower-case a MIME type
fn normalize_mime(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn mime_from_extension(file_name: &str) -> Option<&'static str> {
    // URLs carry query strings; only the path's last segment matters
    let file_name = file_name.split(['?', '#']).next().unwrap_or(file_name);
    let ext = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "pdf" => PDF_MIME_TYPE,
        "html" | "htm" => "text/html",
        "txt" => "text/plain",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "json" => "application/json",
        "zip" => "application/zip",
        _ => return None,
    };
    Some(mime)
}

/// Reject anything that is not a PDF before a decode is attempted.
pub fn ensure_pdf(file: &SelectedFile) -> Result<()> {
    if file.mime_type != PDF_MIME_TYPE {
        return Err(Error::UnsupportedFileType {
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
        });
    }

    if !file.has_pdf_header() {
        return Err(Error::InvalidPdf {
            reason: format!("{} does not start with a PDF header", file.name),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const PDF_BYTES: &[u8] = b"%PDF-1.7\n%%EOF";

    #[rstest]
    #[case(Some("application/pdf"), "upload", PDF_BYTES, "application/pdf")]
    #[case(Some("Application/PDF; charset=binary"), "upload", PDF_BYTES, "application/pdf")]
    #[case(Some("text/plain"), "report.pdf", PDF_BYTES, "text/plain")]
    #[case(Some("application/octet-stream"), "report.pdf", b"junk", "application/pdf")]
    #[case(None, "notes.txt", PDF_BYTES, "text/plain")]
    #[case(None, "https://example.com/a.pdf?download=1", b"", "application/pdf")]
    #[case(None, "<base64>", PDF_BYTES, "application/pdf")]
    #[case(None, "<base64>", b"GIF89a", "application/octet-stream")]
    fn test_detect_mime_type(
        #[case] declared: Option<&str>,
        #[case] name: &str,
        #[case] data: &[u8],
        #[case] expected: &str,
    ) {
        assert_eq!(detect_mime_type(declared, name, data), expected);
    }

    #[test]
    fn test_ensure_pdf_accepts_pdf() {
        let file = SelectedFile::new("doc.pdf", None, PDF_BYTES.to_vec());
        assert!(ensure_pdf(&file).is_ok());
        assert_eq!(file.size, PDF_BYTES.len() as u64);
    }

    #[test]
    fn test_ensure_pdf_rejects_other_mime_even_with_pdf_bytes() {
        let file = SelectedFile::new("doc", Some("image/png"), PDF_BYTES.to_vec());
        assert!(matches!(
            ensure_pdf(&file),
            Err(Error::UnsupportedFileType { .. })
        ));
    }

    #[test]
    fn test_ensure_pdf_rejects_missing_header() {
        let file = SelectedFile::new("fake.pdf", None, b"Hello World".to_vec());
        assert!(matches!(ensure_pdf(&file), Err(Error::InvalidPdf { .. })));
    }
}
