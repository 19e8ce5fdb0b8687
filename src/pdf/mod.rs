//! PDF processing layer
//!
//! PDFium decodes and renders, qpdf rearranges and protects, lopdf authors
//! new documents from HTML, and tiny-skia replays annotations onto rasters.

pub mod html;
pub mod overlay;
mod qpdf;
pub mod range;
mod reader;

#[cfg(test)]
pub(crate) mod testing;

pub use html::{html_to_pdf, HtmlToPdfOptions, Orientation, PageFormat, RenderedPdf};
pub use overlay::{draw_annotations, parse_hex_color, stroke_segments, Color, Point, Rect};
pub use qpdf::{PrintAccess, ProtectOptions, ProtectionStatus, QpdfWrapper};
pub use range::{parse_page_selection, selected_pages};
pub use reader::{
    encode_image, extract_text, page_sizes, parse_pdf_date, pdf_header_version, pdfium_available,
    read_metadata, render_page, render_pages, PageSize, PageText, PdfMetadataInfo, RasterFormat,
    Viewport,
};
