//! Tool parameter and result types

use crate::output::DownloadLink;
use crate::pdf::{
    Orientation, PageFormat, PageSize, PageText, Point, PrintAccess, RasterFormat, Rect,
};
use crate::server::PdfSource;
use crate::session::Annotation;
use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

// ============================================================================
// Shared
// ============================================================================

/// A rendered page of an open document
#[derive(Debug, Serialize)]
pub struct PageView {
    /// Current page (1-indexed)
    pub page: u32,
    pub page_count: u32,
    /// Zoom factor (1.0 = 72 dpi)
    pub scale: f32,
    /// Rendered width in pixels
    pub width: u32,
    /// Rendered height in pixels
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Base64-encoded page image with annotations drawn on top
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_base64: Option<String>,
    /// Annotations on this page (page coordinates, points)
    pub annotations: Vec<Annotation>,
}

// ============================================================================
// Request/Response types for open_pdf / view_page / close_pdf
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct OpenPdfParams {
    /// PDF to open (a picked, dropped, downloaded, or cached file)
    pub source: PdfSource,
    /// Password for encrypted PDFs
    #[serde(default)]
    pub password: Option<String>,
    /// Image format for the rendered page: "png" (default) or "jpeg"
    #[serde(default)]
    pub format: RasterFormat,
    /// Include the rendered first page (default: true)
    #[serde(default = "default_true")]
    pub include_image: bool,
}

#[derive(Debug, Serialize)]
pub struct OpenPdfResult {
    pub source: String,
    /// Session id for view_page, annotate_pdf, and close_pdf
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// File size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Human-readable file size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<PageView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Navigation or zoom action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ViewAction {
    /// Re-render the current page
    #[default]
    Current,
    Next,
    Previous,
    /// Jump to `page`
    GoTo,
    ZoomIn,
    ZoomOut,
    /// Set zoom to `scale`
    SetScale,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ViewPageParams {
    /// Session id returned by open_pdf
    pub session_id: String,
    /// Action: "current" (default), "next", "previous", "go_to", "zoom_in", "zoom_out", "set_scale"
    #[serde(default)]
    pub action: ViewAction,
    /// Target page for "go_to" (1-indexed)
    #[serde(default)]
    pub page: Option<u32>,
    /// Zoom factor for "set_scale"
    #[serde(default)]
    pub scale: Option<f32>,
    /// Image format: "png" (default) or "jpeg"
    #[serde(default)]
    pub format: RasterFormat,
    /// Include the rendered page (default: true)
    #[serde(default = "default_true")]
    pub include_image: bool,
}

#[derive(Debug, Serialize)]
pub struct ViewPageResult {
    pub session_id: String,
    pub action: ViewAction,
    /// False when next/previous was already at the last/first page
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<PageView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ClosePdfParams {
    /// Session id returned by open_pdf
    pub session_id: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ClosePdfResult {
    pub session_id: String,
    /// Whether a session was closed
    pub closed: bool,
}

// ============================================================================
// Request/Response types for annotate_pdf
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnnotateAction {
    /// Freehand stroke through `points`
    AddStroke,
    /// Translucent rectangle `rect`
    AddHighlight,
    /// Text note `text` at `position`
    AddText,
    /// Remove the most recent annotation
    Undo,
    /// Remove annotations on `page`, or all when no page is given
    Clear,
    /// List annotations
    List,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AnnotatePdfParams {
    /// Session id returned by open_pdf
    pub session_id: String,
    pub action: AnnotateAction,
    /// Page to annotate (defaults to the current page; for clear/list, limits to that page)
    #[serde(default)]
    pub page: Option<u32>,
    /// Stroke points in page coordinates (points, origin top-left)
    #[serde(default)]
    pub points: Option<Vec<Point>>,
    /// Highlight rectangle in page coordinates
    #[serde(default)]
    pub rect: Option<Rect>,
    /// Text note anchor in page coordinates
    #[serde(default)]
    pub position: Option<Point>,
    /// Text note content
    #[serde(default)]
    pub text: Option<String>,
    /// Colour as "#rrggbb" or "#rrggbbaa"
    #[serde(default)]
    pub color: Option<String>,
    /// Stroke width in points (default: 2.0)
    #[serde(default)]
    pub width: Option<f32>,
    /// Render the current page with annotations after the change (default: false)
    #[serde(default)]
    pub render: bool,
    /// Image format when rendering: "png" (default) or "jpeg"
    #[serde(default)]
    pub format: RasterFormat,
}

#[derive(Debug, Serialize)]
pub struct AnnotatePdfResult {
    pub session_id: String,
    pub action: AnnotateAction,
    /// Annotations in the document after the action
    pub annotation_count: usize,
    /// Number of annotations removed by undo/clear
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<usize>,
    /// Listed annotations (list action)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Vec<Annotation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<PageView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for extract_text
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExtractTextParams {
    /// PDF sources to process
    pub sources: Vec<PdfSource>,
    /// Page selection (e.g., "1-5,10,15-20"). Defaults to all pages.
    #[serde(default)]
    pub pages: Option<String>,
    /// Password for encrypted PDFs
    #[serde(default)]
    pub password: Option<String>,
    /// Cache the source for chaining with other tools
    #[serde(default)]
    pub cache: bool,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ExtractTextResult {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<String>,
    pub page_count: u32,
    pub pages: Vec<PageText>,
    /// Text of all extracted pages, separated by blank lines
    pub text: String,
    /// Characters across all extracted pages
    pub total_characters: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for extract_metadata
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExtractMetadataParams {
    /// PDF sources to process
    pub sources: Vec<PdfSource>,
    /// Password for encrypted PDFs
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Default, Serialize, JsonSchema)]
pub struct ExtractMetadataResult {
    pub source: String,
    pub file_name: String,
    /// File size in bytes
    pub size: u64,
    /// Human-readable file size (e.g. "1.5 MB")
    pub size_label: String,
    pub page_count: u32,
    /// Size of the first page in points
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<PageSize>,
    /// PDF version from the file header (e.g. "1.7")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_version: Option<String>,
    pub is_encrypted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,
    /// Creation date (RFC 3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    /// Creation date as stored in the document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date_raw: Option<String>,
    /// Modification date (RFC 3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modification_date: Option<String>,
    /// Modification date as stored in the document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modification_date_raw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for convert_pdf_to_images
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ConvertPdfToImagesParams {
    /// PDF sources to process
    pub sources: Vec<PdfSource>,
    /// Page selection (e.g., "1-3,5"). Defaults to all pages.
    #[serde(default)]
    pub pages: Option<String>,
    /// Scale factor relative to PDF page size (default: 2.0)
    #[serde(default)]
    pub scale: Option<f32>,
    /// Image format: "png" (default) or "jpeg"
    #[serde(default)]
    pub format: RasterFormat,
    /// Password for encrypted PDFs
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct RenderedImage {
    /// Page number (1-indexed)
    pub page: u32,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    pub mime_type: String,
    /// Suggested file name, e.g. "report-page-1.png"
    pub file_name: String,
    /// Base64-encoded image data
    pub data_base64: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ConvertPdfToImagesResult {
    pub source: String,
    pub images: Vec<RenderedImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for check_password / protect_pdf
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CheckPasswordParams {
    /// PDF sources to check
    pub sources: Vec<PdfSource>,
    /// Optional password to verify
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct CheckPasswordResult {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub is_encrypted: bool,
    pub requires_password: bool,
    /// Whether the supplied password opens the document (only when a password was given to an encrypted file)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_valid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ProtectPdfParams {
    /// Source PDF to protect
    pub source: PdfSource,
    /// User password (required to open the PDF)
    pub user_password: String,
    /// Owner password (required to change permissions). If not set, same as user_password.
    #[serde(default)]
    pub owner_password: Option<String>,
    /// Allow printing: "full" (default), "low" (low resolution), or "none"
    #[serde(default)]
    pub allow_print: PrintAccess,
    /// Allow copying text/images (default: true)
    #[serde(default = "default_true")]
    pub allow_copy: bool,
    /// Allow modifying the document (default: true)
    #[serde(default = "default_true")]
    pub allow_modify: bool,
    /// Password for source PDF (if already encrypted)
    #[serde(default)]
    pub password: Option<String>,
    /// Download file name (default: "<source>-protected.pdf")
    #[serde(default)]
    pub file_name: Option<String>,
    /// Output file path (optional). If provided, saves the protected PDF to this path.
    #[serde(default)]
    pub output_path: Option<String>,
}

/// Result of a tool that produces one document
#[derive(Debug, Serialize, JsonSchema)]
pub struct DocumentOutputResult {
    pub source: String,
    /// Pages in the produced document
    pub page_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<DownloadLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentOutputResult {
    pub fn failed(source: String, error: String) -> Self {
        Self {
            source,
            page_count: 0,
            output: None,
            error: Some(error),
        }
    }
}

// ============================================================================
// Request/Response types for merge_pdfs / split_pdf
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MergePdfsParams {
    /// PDF sources to merge (in order, at least two)
    pub sources: Vec<PdfSource>,
    /// Download file name (default: "merged.pdf")
    #[serde(default)]
    pub file_name: Option<String>,
    /// Output file path (optional). If provided, saves the merged PDF to this path.
    #[serde(default)]
    pub output_path: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct MergePdfsResult {
    /// Number of source PDFs
    pub source_count: u32,
    /// Total pages in the merged PDF
    pub page_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<DownloadLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SplitMode {
    /// One document with all selected pages
    #[default]
    Extract,
    /// One single-page document per selected page
    Burst,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SplitPdfParams {
    /// Source PDF to split
    pub source: PdfSource,
    /// Pages to keep, e.g. "1-3, 5, 8-10". Ranges are clamped to the document;
    /// pages outside it are skipped.
    pub pages: String,
    /// "extract" (default): one PDF with the selected pages; "burst": one PDF per page
    #[serde(default)]
    pub mode: SplitMode,
    /// Password for encrypted PDFs
    #[serde(default)]
    pub password: Option<String>,
    /// Output path (optional): a file for "extract", a directory for "burst"
    #[serde(default)]
    pub output_path: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct SplitPdfResult {
    pub source: String,
    pub mode: SplitMode,
    /// Selected pages in ascending order
    pub pages: Vec<u32>,
    pub outputs: Vec<DownloadLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for html_to_pdf / download_pdf
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct HtmlToPdfParams {
    /// HTML markup to convert
    pub html: String,
    /// Document title (default: the markup's <title>)
    #[serde(default)]
    pub title: Option<String>,
    /// Page size: "a4" (default) or "letter"
    #[serde(default)]
    pub page_format: PageFormat,
    /// Page orientation: "portrait" (default) or "landscape"
    #[serde(default)]
    pub orientation: Orientation,
    /// Page margin in points (default: 50)
    #[serde(default)]
    pub margin: Option<f32>,
    /// Download file name (default: derived from the title)
    #[serde(default)]
    pub file_name: Option<String>,
    /// Output file path (optional)
    #[serde(default)]
    pub output_path: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct HtmlToPdfResult {
    pub page_count: u32,
    /// Title written to the document information dictionary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<DownloadLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DownloadPdfParams {
    /// URL of the PDF (http or https)
    pub url: String,
    /// Download file name (default: last segment of the URL)
    #[serde(default)]
    pub file_name: Option<String>,
    /// Output file path (optional)
    #[serde(default)]
    pub output_path: Option<String>,
}

// ============================================================================
// Request/Response types for list_pdfs
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListPdfsParams {
    /// Directory to search for PDF files
    pub directory: String,
    /// Search subdirectories recursively (default: false)
    #[serde(default)]
    pub recursive: bool,
    /// Filename pattern to filter (e.g., "report*.pdf"). Supports glob patterns.
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct PdfFileInfo {
    /// Full path to the PDF file
    pub path: String,
    /// Filename only
    pub name: String,
    /// File size in bytes
    pub size: u64,
    /// Human-readable file size
    pub size_label: String,
    /// Last modified time (ISO 8601 format)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ListPdfsResult {
    /// Directory that was searched
    pub directory: String,
    /// List of PDF files found
    pub files: Vec<PdfFileInfo>,
    /// Total number of files found
    pub total_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
