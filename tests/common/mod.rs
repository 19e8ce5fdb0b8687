//! Shared fixtures for integration tests

#![allow(dead_code)]

#[path = "../../src/pdf/testing/fixtures.rs"]
mod fixtures;

pub use fixtures::{fixture_pdf, page_widths};
use pdf_toolkit::PdfSource;
use std::path::{Path, PathBuf};

/// Write a sample PDF into `dir` and return its path
pub fn write_pdf(dir: &Path, name: &str, widths: &[i64]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, fixture_pdf(widths)).unwrap();
    path
}

pub fn path_source(path: &Path) -> PdfSource {
    PdfSource::Path {
        path: path.to_string_lossy().to_string(),
    }
}

pub fn cache_source(cache_key: &str) -> PdfSource {
    PdfSource::CacheRef {
        cache_key: cache_key.to_string(),
    }
}

/// Whether PDFium can be loaded; PDFium-backed tests return early otherwise
pub fn pdfium_or_skip() -> bool {
    let available = pdf_toolkit::pdf::pdfium_available();
    if !available {
        eprintln!("PDFium library not available, skipping");
    }
    available
}
