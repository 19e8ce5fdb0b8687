//! Error types for the PDF toolkit

use thiserror::Error;

/// Result type alias for the PDF toolkit
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the PDF toolkit
#[derive(Error, Debug)]
pub enum Error {
    /// PDF file not found
    #[error("PDF not found: {path}")]
    PdfNotFound { path: String },

    /// Selected file is not a PDF (checked before any decode attempt)
    #[error("Unsupported file type: {mime_type} ({name})")]
    UnsupportedFileType { name: String, mime_type: String },

    /// Invalid PDF file
    #[error("Invalid PDF file: {reason}")]
    InvalidPdf { reason: String },

    /// A required input was empty
    #[error("Empty input: {field}")]
    EmptyInput { field: String },

    /// A tool argument was outside its accepted values
    #[error("Invalid argument {name}: {reason}")]
    InvalidArgument { name: String, reason: String },

    /// Not enough sources for a multi-file operation
    #[error("At least {required} PDF files are required, got {given}")]
    TooFewSources { required: usize, given: usize },

    /// PDF is password protected and no password was provided
    #[error("PDF is password protected")]
    PasswordRequired,

    /// Incorrect password provided
    #[error("Incorrect password")]
    IncorrectPassword,

    /// Invalid page range
    #[error("Invalid page range: {range}")]
    InvalidPageRange { range: String },

    /// Page out of bounds
    #[error("Page {page} out of bounds (total: {total})")]
    PageOutOfBounds { page: u32, total: u32 },

    /// Cache key not found
    #[error("Cache key not found: {key}")]
    CacheKeyNotFound { key: String },

    /// One source of a multi-file operation failed (1-indexed position)
    #[error("Source {index} failed: {source}")]
    SourceFailed { index: usize, source: Box<Error> },

    /// Viewer session not found (closed or evicted)
    #[error("Session not found: {id}")]
    SessionNotFound { id: String },

    /// Source resolution error
    #[error("Failed to resolve source: {reason}")]
    SourceResolution { reason: String },

    /// Base64 decode error
    #[error("Invalid base64 data: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// PDFium error
    #[error("PDFium error: {reason}")]
    Pdfium { reason: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// qpdf error
    #[error("qpdf error: {reason}")]
    QpdfError { reason: String },

    /// PDF authoring error
    #[error("PDF write error: {0}")]
    PdfWrite(#[from] lopdf::Error),

    /// Raster encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Path access denied (outside allowed resource directories)
    #[error("Path access denied: {path}")]
    PathAccessDenied { path: String },

    /// SSRF blocked (URL resolves to private/reserved IP)
    #[error("SSRF blocked: {url}")]
    SsrfBlocked { url: String },

    /// Download too large
    #[error("Download too large: {size} bytes (max: {max_size} bytes)")]
    DownloadTooLarge { size: u64, max_size: u64 },

    /// Image dimension exceeded
    #[error("Image dimension exceeded: {detail}")]
    ImageDimensionExceeded { detail: String },
}

impl Error {
    /// True for errors caused by the caller's input rather than a library or I/O failure.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedFileType { .. }
                | Error::InvalidPdf { .. }
                | Error::EmptyInput { .. }
                | Error::InvalidArgument { .. }
                | Error::TooFewSources { .. }
                | Error::InvalidPageRange { .. }
                | Error::PageOutOfBounds { .. }
                | Error::CacheKeyNotFound { .. }
                | Error::SessionNotFound { .. }
                | Error::Base64Decode(_)
                | Error::PathAccessDenied { .. }
                | Error::SsrfBlocked { .. }
                | Error::DownloadTooLarge { .. }
                | Error::ImageDimensionExceeded { .. }
        ) || matches!(self, Error::SourceFailed { source, .. } if source.is_invalid_input())
    }

    /// Return a sanitized error message safe to send to clients.
    /// Internal details (paths, library errors, file sizes) are omitted.
    /// Full details should be logged via tracing before calling this.
    pub fn client_message(&self) -> String {
        match self {
            Error::PdfNotFound { .. } => "PDF not found".to_string(),
            Error::UnsupportedFileType { mime_type, .. } => {
                format!("Please select a PDF file (got {})", mime_type)
            }
            Error::InvalidPdf { .. } => "Invalid PDF file".to_string(),
            Error::EmptyInput { field } => format!("{} must not be empty", field),
            Error::InvalidArgument { name, reason } => format!("Invalid {}: {}", name, reason),
            Error::TooFewSources { required, .. } => {
                format!("Please select at least {} PDF files", required)
            }
            Error::PasswordRequired => "PDF is password protected".to_string(),
            Error::IncorrectPassword => "Incorrect password".to_string(),
            Error::InvalidPageRange { range } => format!("Invalid page range: {}", range),
            Error::PageOutOfBounds { page, total } => {
                format!("Page {} out of bounds (total: {})", page, total)
            }
            Error::CacheKeyNotFound { .. } => "Cache key not found".to_string(),
            Error::SourceFailed { index, source } => {
                format!("File {}: {}", index, source.client_message())
            }
            Error::SessionNotFound { .. } => "Document session not found".to_string(),
            Error::SourceResolution { .. } => "Failed to resolve PDF source".to_string(),
            Error::Base64Decode(_) => "Invalid base64 data".to_string(),
            Error::HttpRequest(_) => "HTTP request failed".to_string(),
            Error::Io(_) => "I/O error".to_string(),
            Error::Pdfium { .. } => "PDF processing error".to_string(),
            Error::Serialization(_) => "Serialization error".to_string(),
            Error::QpdfError { .. } => "PDF processing error".to_string(),
            Error::PdfWrite(_) => "Failed to generate PDF".to_string(),
            Error::Image(_) => "Image encoding error".to_string(),
            Error::PathAccessDenied { .. } => "Access denied".to_string(),
            Error::SsrfBlocked { .. } => "URL not allowed".to_string(),
            Error::DownloadTooLarge { max_size, .. } => {
                format!("Download exceeds maximum size of {} bytes", max_size)
            }
            Error::ImageDimensionExceeded { detail } => {
                format!("Image dimension exceeded: {}", detail)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_hides_paths() {
        let err = Error::PdfNotFound {
            path: "/secret/location.pdf".to_string(),
        };
        assert!(!err.client_message().contains("/secret"));
    }

    #[test]
    fn test_unsupported_type_message_names_mime() {
        let err = Error::UnsupportedFileType {
            name: "notes.txt".to_string(),
            mime_type: "text/plain".to_string(),
        };
        assert_eq!(
            err.client_message(),
            "Please select a PDF file (got text/plain)"
        );
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_source_failure_names_position() {
        let err = Error::SourceFailed {
            index: 2,
            source: Box::new(Error::InvalidPdf {
                reason: "missing header".to_string(),
            }),
        };
        assert_eq!(err.client_message(), "File 2: Invalid PDF file");
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_library_failures_are_not_invalid_input() {
        let err = Error::QpdfError {
            reason: "damaged xref".to_string(),
        };
        assert!(!err.is_invalid_input());
        assert_eq!(err.client_message(), "PDF processing error");
    }
}
