//! Source resolution, file-type validation, and caching

pub mod cache;
pub mod guard;
pub mod resolver;

pub use cache::OutputCache;
pub use guard::{detect_mime_type, ensure_pdf, SelectedFile, PDF_MIME_TYPE};
pub use resolver::{parse_download_url, resolve_base64, resolve_cache, resolve_path, resolve_url};
