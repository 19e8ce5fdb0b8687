//! MCP Server implementation using rmcp

mod process;
pub mod types;

use crate::error::Error;
use crate::output::{format_file_size, DownloadLink};
use crate::source::{
    ensure_pdf, resolve_base64, resolve_cache, resolve_path, resolve_url, OutputCache,
    SelectedFile,
};
use crate::session::SessionStore;
use anyhow::Result;
use rmcp::{
    handler::server::tool::ToolRouter, handler::server::wrapper::Parameters, model::*,
    schemars::JsonSchema, service::RequestContext, tool, tool_handler, tool_router, RoleServer,
    ServerHandler, ServiceExt,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
pub use types::*;

/// PDF source specification
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum PdfSource {
    /// File path (absolute or relative)
    Path {
        /// Path to the PDF file
        path: String,
    },
    /// Uploaded or dropped file, base64 encoded
    Base64 {
        /// Base64 encoded file content
        base64: String,
        /// Original file name, used for type detection and output naming
        #[serde(skip_serializing_if = "Option::is_none")]
        file_name: Option<String>,
        /// MIME type reported by the picker (e.g. "application/pdf")
        #[serde(skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
    /// URL to download PDF from
    Url {
        /// URL of the PDF file
        url: String,
    },
    /// Reference to cached PDF
    CacheRef {
        /// Cache key from previous operation
        cache_key: String,
    },
}

fn string_field<E: serde::de::Error>(
    obj: &serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> std::result::Result<Option<String>, E> {
    match obj.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(E::custom(format!("\"{}\" must be a string", key))),
    }
}

impl<'de> serde::Deserialize<'de> for PdfSource {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;

        let Some(obj) = value.as_object() else {
            return Err(serde::de::Error::custom(format!(
                "Invalid source: expected an object with one of \"path\", \"base64\", \"url\", or \"cache_key\", but got {}",
                match &value {
                    serde_json::Value::Array(_) => "an array",
                    serde_json::Value::String(_) => "a string",
                    serde_json::Value::Number(_) => "a number",
                    serde_json::Value::Bool(_) => "a boolean",
                    serde_json::Value::Null => "null",
                    _ => "unknown type",
                }
            )));
        };

        if let Some(path) = string_field(obj, "path")? {
            return Ok(PdfSource::Path { path });
        }
        if let Some(base64) = string_field(obj, "base64")? {
            return Ok(PdfSource::Base64 {
                base64,
                file_name: string_field(obj, "file_name")?,
                mime_type: string_field(obj, "mime_type")?,
            });
        }
        if let Some(url) = string_field(obj, "url")? {
            return Ok(PdfSource::Url { url });
        }
        if let Some(cache_key) = string_field(obj, "cache_key")? {
            return Ok(PdfSource::CacheRef { cache_key });
        }

        let keys: Vec<&String> = obj.keys().collect();
        Err(serde::de::Error::custom(format!(
            "Invalid source: expected an object with one of \"path\", \"base64\", \"url\", or \"cache_key\", but got keys: {:?}",
            keys
        )))
    }
}

/// Security and resource configuration for the PDF toolkit server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directories to expose as PDF resources (and the sandbox for paths)
    pub resource_dirs: Vec<String>,
    /// Allow URLs that resolve to private/reserved IPs (default: false)
    pub allow_private_urls: bool,
    /// Maximum download size in bytes for URL sources (default: 100MB)
    pub max_download_bytes: u64,
    /// Maximum total bytes in cache (default: 512MB)
    pub cache_max_bytes: usize,
    /// Maximum number of cache entries (default: 100)
    pub cache_max_entries: usize,
    /// Maximum render scale factor (default: 10.0)
    pub max_image_scale: f32,
    /// Maximum pixel area of one rendered page (default: 100_000_000)
    pub max_image_pixels: u64,
    /// Maximum number of open viewer sessions (default: 16)
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            resource_dirs: Vec::new(),
            allow_private_urls: false,
            max_download_bytes: 100 * 1024 * 1024, // 100MB
            cache_max_bytes: 512 * 1024 * 1024,    // 512MB
            cache_max_entries: 100,
            max_image_scale: 10.0,
            max_image_pixels: 100_000_000,
            max_sessions: 16,
        }
    }
}

/// PDF toolkit MCP server
#[derive(Clone)]
pub struct PdfServer {
    cache: Arc<OutputCache>,
    sessions: Arc<SessionStore>,
    tool_router: ToolRouter<Self>,
    /// Server configuration
    config: Arc<ServerConfig>,
}

fn to_json<T: Serialize>(results: &[T]) -> String {
    let response = serde_json::json!({ "results": results });
    serde_json::to_string_pretty(&response).unwrap_or_default()
}

// ============================================================================
// Tool implementations
// ============================================================================

#[tool_router]
impl PdfServer {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    /// Create a new PdfServer with specified resource directories
    pub fn with_resource_dirs(dirs: Vec<String>) -> Self {
        Self::with_config(ServerConfig {
            resource_dirs: dirs,
            ..ServerConfig::default()
        })
    }

    /// Create a new PdfServer with full configuration
    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            cache: Arc::new(OutputCache::new(
                config.cache_max_entries,
                config.cache_max_bytes,
            )),
            sessions: Arc::new(SessionStore::new(config.max_sessions)),
            tool_router: Self::tool_router(),
            config: Arc::new(config),
        }
    }

    /// Open a PDF for viewing and annotation
    #[tool(
        description = "Open a PDF for viewing (file picker or drag-and-drop equivalent). Non-PDF files are rejected before decoding. Returns a session_id plus the first page rendered at 100% zoom.

Use view_page to navigate and zoom, annotate_pdf to draw, highlight, and add notes, and close_pdf when done.

Source format: must be one of {\"path\": \"/absolute/path.pdf\"}, {\"url\": \"https://...\"}, {\"base64\": \"...\", \"file_name\": \"a.pdf\", \"mime_type\": \"application/pdf\"}, or {\"cache_key\": \"...\"}"
    )]
    async fn open_pdf(&self, Parameters(params): Parameters<OpenPdfParams>) -> String {
        let result = self.process_open_pdf(&params).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "open_pdf failed");
            OpenPdfResult {
                source: Self::source_name(&params.source),
                session_id: None,
                file_name: None,
                size: None,
                size_label: None,
                view: None,
                error: Some(e.client_message()),
            }
        });

        to_json(&[result])
    }

    /// Navigate or zoom an open document
    #[tool(
        description = "Navigate or zoom an open PDF and render the current page with its annotations.

Actions: \"current\" (default), \"next\", \"previous\" (no-op at the ends), \"go_to\" (with page), \"zoom_in\" / \"zoom_out\" (steps of 0.2, minimum 0.4), \"set_scale\" (with scale)."
    )]
    async fn view_page(&self, Parameters(params): Parameters<ViewPageParams>) -> String {
        let result = self.process_view_page(&params).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "view_page failed");
            ViewPageResult {
                session_id: params.session_id.clone(),
                action: params.action,
                changed: false,
                view: None,
                error: Some(e.client_message()),
            }
        });

        to_json(&[result])
    }

    /// Annotate an open document
    #[tool(
        description = "Annotate an open PDF. Coordinates are PDF points on the page at 100% zoom, origin top-left, so annotations stay in place when zooming.

Actions:
- \"add_stroke\": freehand line through points [{\"x\":..,\"y\":..}, ...] with optional color and width
- \"add_highlight\": translucent rectangle {\"x\",\"y\",\"width\",\"height\"}
- \"add_text\": text note at position
- \"undo\": remove the most recent annotation
- \"clear\": remove annotations on page (or all pages)
- \"list\": list annotations

Set render=true to get the viewer's current page back with its annotations drawn."
    )]
    async fn annotate_pdf(&self, Parameters(params): Parameters<AnnotatePdfParams>) -> String {
        let result = self.process_annotate_pdf(&params).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "annotate_pdf failed");
            AnnotatePdfResult {
                session_id: params.session_id.clone(),
                action: params.action,
                annotation_count: 0,
                removed: None,
                annotations: None,
                view: None,
                error: Some(e.client_message()),
            }
        });

        to_json(&[result])
    }

    /// Close an open document
    #[tool(description = "Close a PDF opened with open_pdf and discard its annotations.")]
    async fn close_pdf(&self, Parameters(params): Parameters<ClosePdfParams>) -> String {
        let closed = self.sessions.close(&params.session_id);
        tracing::info!(session = %params.session_id, closed, "close_pdf");

        to_json(&[ClosePdfResult {
            session_id: params.session_id,
            closed,
        }])
    }

    /// Extract text content from PDF files
    #[tool(
        description = "Extract text content from PDF files, page by page. Supports page selection and batch processing of multiple PDFs.

Source format: each element must be one of {\"path\": \"/absolute/path.pdf\"}, {\"url\": \"https://...\"}, {\"base64\": \"...\"}, or {\"cache_key\": \"...\"}"
    )]
    async fn extract_text(&self, Parameters(params): Parameters<ExtractTextParams>) -> String {
        let mut results = Vec::new();

        for source in &params.sources {
            let result = self
                .process_extract_text(source, &params)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "extract_text failed");
                    ExtractTextResult {
                        source: Self::source_name(source),
                        cache_key: None,
                        page_count: 0,
                        pages: vec![],
                        text: String::new(),
                        total_characters: 0,
                        error: Some(e.client_message()),
                    }
                });
            results.push(result);
        }

        to_json(&results)
    }

    /// Read document metadata
    #[tool(
        description = "Read PDF metadata: title, author, subject, keywords, creator, producer, creation and modification dates (RFC 3339 plus raw), page count, first page size, PDF version, encryption flag, and file size.

Source format: each element must be one of {\"path\": \"/absolute/path.pdf\"}, {\"url\": \"https://...\"}, {\"base64\": \"...\"}, or {\"cache_key\": \"...\"}"
    )]
    async fn extract_metadata(
        &self,
        Parameters(params): Parameters<ExtractMetadataParams>,
    ) -> String {
        let mut results = Vec::new();

        for source in &params.sources {
            let result = self
                .process_extract_metadata(source, &params)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "extract_metadata failed");
                    ExtractMetadataResult {
                        source: Self::source_name(source),
                        error: Some(e.client_message()),
                        ..Default::default()
                    }
                });
            results.push(result);
        }

        to_json(&results)
    }

    /// Render PDF pages as images
    #[tool(
        description = "Convert PDF pages to PNG or JPEG images (base64). Default scale is 2.0 (144 dpi).

Source format: each element must be one of {\"path\": \"/absolute/path.pdf\"}, {\"url\": \"https://...\"}, {\"base64\": \"...\"}, or {\"cache_key\": \"...\"}"
    )]
    async fn convert_pdf_to_images(
        &self,
        Parameters(params): Parameters<ConvertPdfToImagesParams>,
    ) -> String {
        let mut results = Vec::new();

        for source in &params.sources {
            let result = self
                .process_convert_pdf_to_images(source, &params)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "convert_pdf_to_images failed");
                    ConvertPdfToImagesResult {
                        source: Self::source_name(source),
                        images: vec![],
                        error: Some(e.client_message()),
                    }
                });
            results.push(result);
        }

        to_json(&results)
    }

    /// Check whether PDFs are password protected
    #[tool(
        description = "Check whether PDF files are encrypted and need a password to open. If a password is given, also reports whether it is correct.

Source format: each element must be one of {\"path\": \"/absolute/path.pdf\"}, {\"url\": \"https://...\"}, {\"base64\": \"...\"}, or {\"cache_key\": \"...\"}"
    )]
    async fn check_password(&self, Parameters(params): Parameters<CheckPasswordParams>) -> String {
        let mut results = Vec::new();

        for source in &params.sources {
            let result = self
                .process_check_password(source, &params)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "check_password failed");
                    CheckPasswordResult {
                        source: Self::source_name(source),
                        file_name: None,
                        is_encrypted: false,
                        requires_password: false,
                        password_valid: None,
                        error: Some(e.client_message()),
                    }
                });
            results.push(result);
        }

        to_json(&results)
    }

    /// Add password protection to a PDF
    #[tool(
        description = "Add password protection to a PDF file using 256-bit AES encryption.

Features:
- Set user password (required to open)
- Set owner password (required to change permissions)
- Control print permission: \"full\", \"low\" (low resolution), or \"none\"
- Control copy and modify permissions

The output is returned as a download link (cache_key for chaining with other tools, optional output_path).

Source format: must be one of {\"path\": \"/absolute/path.pdf\"}, {\"url\": \"https://...\"}, {\"base64\": \"...\"}, or {\"cache_key\": \"...\"}"
    )]
    async fn protect_pdf(&self, Parameters(params): Parameters<ProtectPdfParams>) -> String {
        let result = self.process_protect_pdf(&params).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "protect_pdf failed");
            DocumentOutputResult::failed(Self::source_name(&params.source), e.client_message())
        });

        to_json(&[result])
    }

    /// Merge multiple PDFs into one
    #[tool(
        description = "Merge two or more PDF files into a single PDF. Pages are combined in the order the sources are given. Sources are processed one at a time; if any source fails, no file is produced and the error names the failing file's position.

Source format: each element must be one of {\"path\": \"/absolute/path.pdf\"}, {\"url\": \"https://...\"}, {\"base64\": \"...\"}, or {\"cache_key\": \"...\"}"
    )]
    async fn merge_pdfs(&self, Parameters(params): Parameters<MergePdfsParams>) -> String {
        let result = self.process_merge_pdfs(&params).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "merge_pdfs failed");
            MergePdfsResult {
                source_count: params.sources.len() as u32,
                page_count: 0,
                output: None,
                error: Some(e.client_message()),
            }
        });

        to_json(&[result])
    }

    /// Split a PDF by page selection
    #[tool(
        description = "Split a PDF by a page selection such as \"1-3, 5, 8-10\". Ranges are clamped to the document and pages outside it are skipped; a malformed selection is rejected.

Modes:
- \"extract\" (default): one PDF containing the selected pages in ascending order
- \"burst\": one single-page PDF per selected page

Source format: must be one of {\"path\": \"/absolute/path.pdf\"}, {\"url\": \"https://...\"}, {\"base64\": \"...\"}, or {\"cache_key\": \"...\"}"
    )]
    async fn split_pdf(&self, Parameters(params): Parameters<SplitPdfParams>) -> String {
        let result = self.process_split_pdf(&params).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "split_pdf failed");
            SplitPdfResult {
                source: Self::source_name(&params.source),
                mode: params.mode,
                pages: vec![],
                outputs: vec![],
                error: Some(e.client_message()),
            }
        });

        to_json(&[result])
    }

    /// Convert HTML to PDF
    #[tool(
        description = "Convert an HTML string to a paginated PDF (A4 or Letter, portrait or landscape). Headings, paragraphs, lists, preformatted code, block quotes, and tables are laid out as text; scripts and styles are ignored. Use an element with class \"page-break\" to start a new page."
    )]
    async fn html_to_pdf(&self, Parameters(params): Parameters<HtmlToPdfParams>) -> String {
        let result = self.process_html_to_pdf(&params).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "html_to_pdf failed");
            HtmlToPdfResult {
                page_count: 0,
                title: None,
                output: None,
                error: Some(e.client_message()),
            }
        });

        to_json(&[result])
    }

    /// Download a PDF from a URL
    #[tool(
        description = "Download a PDF from an http(s) URL. The response must be a PDF. Redirects are followed and each hop is SSRF-checked. Returns a download link whose file name comes from the Content-Disposition header or else the URL, and a cache_key usable as a source for every other tool."
    )]
    async fn download_pdf(&self, Parameters(params): Parameters<DownloadPdfParams>) -> String {
        let result = self.process_download_pdf(&params).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "download_pdf failed");
            DocumentOutputResult::failed(params.url.clone(), e.client_message())
        });

        to_json(&[result])
    }

    /// List PDF files in a directory
    #[tool(
        description = "List PDF files in a directory (file picker).

Returns for each file:
- Full path (can be used directly with other tools)
- Filename
- File size in bytes and as a readable label
- Last modified time

Supports recursive search and glob pattern filtering."
    )]
    async fn list_pdfs(&self, Parameters(params): Parameters<ListPdfsParams>) -> String {
        let result = self.process_list_pdfs(&params).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "list_pdfs failed");
            ListPdfsResult {
                directory: params.directory.clone(),
                files: vec![],
                total_count: 0,
                error: Some(e.client_message()),
            }
        });

        to_json(&[result])
    }
}

impl PdfServer {
    fn source_name(source: &PdfSource) -> String {
        match source {
            PdfSource::Path { path } => path.clone(),
            PdfSource::Base64 { file_name, .. } => file_name
                .clone()
                .unwrap_or_else(|| "<base64>".to_string()),
            PdfSource::Url { url } => url.clone(),
            PdfSource::CacheRef { cache_key } => format!("<cache:{}>", cache_key),
        }
    }

    async fn resolve_source(&self, source: &PdfSource) -> crate::error::Result<SelectedFile> {
        match source {
            PdfSource::Path { path } => {
                let path = self.validate_path_access(path)?;
                resolve_path(path)
            }
            PdfSource::Base64 {
                base64,
                file_name,
                mime_type,
            } => resolve_base64(base64, file_name.as_deref(), mime_type.as_deref()),
            PdfSource::Url { url } => {
                resolve_url(
                    url,
                    self.config.allow_private_urls,
                    self.config.max_download_bytes,
                )
                .await
            }
            PdfSource::CacheRef { cache_key } => resolve_cache(cache_key, &self.cache),
        }
    }

    /// Resolve a source and reject anything that is not a PDF before it is decoded
    async fn load_pdf(&self, source: &PdfSource) -> crate::error::Result<SelectedFile> {
        let file = self.resolve_source(source).await?;
        ensure_pdf(&file)?;
        tracing::debug!(name = %file.name, size = file.size, "loaded PDF source");
        Ok(file)
    }

    fn is_within_resource_dirs(&self, canonical: &Path) -> bool {
        self.config.resource_dirs.iter().any(|dir| {
            std::fs::canonicalize(dir)
                .map(|cd| canonical.starts_with(&cd))
                .unwrap_or(false)
        })
    }

    /// Validate that a path is within allowed resource directories.
    /// If no resource_dirs are configured, all paths are allowed.
    fn validate_path_access(&self, path: &str) -> crate::error::Result<PathBuf> {
        if self.config.resource_dirs.is_empty() {
            return Ok(PathBuf::from(path));
        }

        let canonical = std::fs::canonicalize(path).map_err(|_| Error::PathAccessDenied {
            path: path.to_string(),
        })?;

        if self.is_within_resource_dirs(&canonical) {
            Ok(canonical)
        } else {
            Err(Error::PathAccessDenied {
                path: path.to_string(),
            })
        }
    }

    /// Validate that an output path is within allowed resource directories.
    /// Canonicalizes the parent directory since the output file may not exist yet.
    fn validate_output_path_access(&self, path: &str) -> crate::error::Result<PathBuf> {
        if self.config.resource_dirs.is_empty() {
            return Ok(PathBuf::from(path));
        }

        let path_obj = Path::new(path);
        let parent = path_obj.parent().unwrap_or(Path::new("."));
        let denied = || Error::PathAccessDenied {
            path: path.to_string(),
        };

        let canonical_parent = std::fs::canonicalize(parent).map_err(|_| denied())?;
        let file_name = path_obj.file_name().ok_or_else(denied)?;
        let canonical_target = canonical_parent.join(file_name);

        if self.is_within_resource_dirs(&canonical_target) {
            Ok(canonical_target)
        } else {
            Err(denied())
        }
    }

    /// Write output data to a file path, with sandbox validation.
    fn write_output(
        &self,
        output_path: Option<&str>,
        data: &[u8],
    ) -> crate::error::Result<Option<String>> {
        let Some(path_str) = output_path else {
            return Ok(None);
        };

        let path = Path::new(path_str);

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if self.config.resource_dirs.is_empty() {
                    std::fs::create_dir_all(parent)?;
                } else {
                    return Err(Error::PathAccessDenied {
                        path: path_str.to_string(),
                    });
                }
            }
        }

        let target = self.validate_output_path_access(path_str)?;
        std::fs::write(&target, data)?;
        Ok(Some(path_str.to_string()))
    }

    /// Cache a produced document for chaining when it fits the cache budget,
    /// optionally write it to disk, and describe it as a download link.
    fn deliver(
        &self,
        data: Vec<u8>,
        file_name: String,
        output_path: Option<&str>,
    ) -> crate::error::Result<DownloadLink> {
        let size = data.len() as u64;
        let path = self.write_output(output_path, &data)?;
        let cache_key = self.cache.insert(data);

        tracing::debug!(
            cache_key = ?cache_key,
            file_name = %file_name,
            size = %format_file_size(size),
            "output ready"
        );

        Ok(DownloadLink::new(cache_key, file_name, size, path))
    }
}

impl Default for PdfServer {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_handler]
impl ServerHandler for PdfServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "PDF toolkit: open, view, and annotate PDFs; merge, split, and protect them; \
                 extract text, metadata, and page images; check passwords; convert HTML to PDF; \
                 and download PDFs from URLs. Produced files are returned as download links \
                 whose cache_key can be passed to any other tool. PDF files in configured \
                 directories are also exposed as resources."
                    .into(),
            ),
        }
    }

    /// List available PDF resources from configured directories
    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        let mut resources = Vec::new();

        for dir in self.config.resource_dirs.iter() {
            let params = ListPdfsParams {
                directory: dir.clone(),
                recursive: true,
                pattern: None,
            };

            if let Ok(list_result) = self.process_list_pdfs(&params) {
                for file in list_result.files {
                    let uri = format!("file://{}", file.path);
                    let mut resource = RawResource::new(uri.clone(), file.name.clone());
                    resource.mime_type = Some("application/pdf".to_string());
                    resource.description = Some(format!(
                        "PDF file ({}){}",
                        file.size_label,
                        file.modified
                            .as_ref()
                            .map(|m| format!(", modified: {}", m))
                            .unwrap_or_default()
                    ));
                    resource.size = u32::try_from(file.size).ok();

                    resources.push(Annotated {
                        raw: resource,
                        annotations: None,
                    });
                }
            }
        }

        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
            meta: Default::default(),
        })
    }

    /// Read a PDF resource and return its text content
    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        let uri = &request.uri;

        let Some(path) = uri.strip_prefix("file://") else {
            return Err(ErrorData::invalid_params(
                "Only file:// URIs are supported",
                None,
            ));
        };

        // Only files inside a configured resource directory are readable
        let is_allowed = std::fs::canonicalize(path)
            .map(|canonical| self.is_within_resource_dirs(&canonical))
            .unwrap_or(false);
        if !is_allowed {
            return Err(ErrorData::invalid_params(
                "Resource not found in configured directories",
                None,
            ));
        }

        let source = PdfSource::Path {
            path: path.to_string(),
        };
        let params = ExtractTextParams {
            sources: vec![source.clone()],
            pages: None,
            password: None,
            cache: false,
        };

        match self.process_extract_text(&source, &params).await {
            Ok(result) => {
                let text = result
                    .pages
                    .iter()
                    .map(|p| format!("--- Page {} ---\n{}", p.page, p.text))
                    .collect::<Vec<_>>()
                    .join("\n\n");

                Ok(ReadResourceResult {
                    contents: vec![ResourceContents::TextResourceContents {
                        uri: uri.clone(),
                        mime_type: Some("text/plain".to_string()),
                        text,
                        meta: Default::default(),
                    }],
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "read_resource failed");
                Err(ErrorData::internal_error(e.client_message(), None))
            }
        }
    }
}

/// Run the MCP server without resource directories
pub async fn run_server() -> Result<()> {
    run_server_with_config(ServerConfig::default()).await
}

/// Run the MCP server with full configuration
pub async fn run_server_with_config(config: ServerConfig) -> Result<()> {
    tracing::info!(
        resource_dirs = ?config.resource_dirs,
        max_sessions = config.max_sessions,
        "PDF toolkit ready, waiting for connections..."
    );

    let server = PdfServer::with_config(config);
    let service = server.serve(rmcp::transport::io::stdio()).await?;
    service.waiting().await?;

    Ok(())
}

#[cfg(test)]
mod tests;
