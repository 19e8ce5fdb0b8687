//! In-memory PDF fixtures for unit tests

mod fixtures;

pub(crate) use fixtures::{fixture_pdf, page_dimensions, page_widths};

/// Whether PDFium can be bound here; PDFium-backed tests return early otherwise
pub(crate) fn pdfium_or_skip() -> bool {
    let available = crate::pdf::reader::pdfium_available();
    if !available {
        eprintln!("PDFium library not available, skipping");
    }
    available
}
