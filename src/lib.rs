//! PDF toolkit library
//!
//! This crate provides MCP tools for everyday PDF work:
//! - `open_pdf` / `view_page` / `annotate_pdf` / `close_pdf`: view, zoom, and mark up documents
//! - `merge_pdfs` / `split_pdf`: combine and rearrange pages
//! - `extract_text` / `extract_metadata` / `convert_pdf_to_images`: read documents
//! - `check_password` / `protect_pdf`: inspect and add encryption
//! - `html_to_pdf` / `download_pdf`: produce documents from markup or URLs
//! - `list_pdfs`: browse directories for PDF files

pub mod error;
pub mod output;
pub mod pdf;
pub mod server;
pub mod session;
pub mod source;

pub use error::{Error, Result};
pub use output::DownloadLink;
pub use server::{
    run_server, run_server_with_config, ListPdfsParams, ListPdfsResult, PdfFileInfo, PdfServer,
    PdfSource, ServerConfig,
};
