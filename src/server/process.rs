//! Tool bodies. Each `process_*` returns a typed result; the router turns
//! failures into per-item error messages.

use super::types::*;
use super::{PdfServer, PdfSource};
use crate::error::{Error, Result};
use crate::output::{format_file_size, suggest_file_name, DownloadLink};
use crate::pdf::{
    draw_annotations, encode_image, extract_text, html_to_pdf, page_sizes, parse_hex_color,
    parse_page_selection, parse_pdf_date, pdf_header_version, read_metadata, render_page,
    render_pages, selected_pages, HtmlToPdfOptions, ProtectOptions, QpdfWrapper, RasterFormat,
    Viewport,
};
use crate::session::annotations::{
    DEFAULT_HIGHLIGHT_COLOR, DEFAULT_NOTE_COLOR, DEFAULT_STROKE_COLOR, DEFAULT_STROKE_WIDTH,
};
use crate::session::Annotation;
use crate::source::{ensure_pdf, resolve_url};
use base64::Engine;
use std::path::Path;
use std::sync::Arc;

/// Render scale for convert_pdf_to_images when none is given (144 dpi)
const DEFAULT_RENDER_SCALE: f32 = 2.0;

fn join_error(e: tokio::task::JoinError) -> Error {
    Error::Pdfium {
        reason: format!("Task join error: {}", e),
    }
}

fn missing(name: &str, action: &str) -> Error {
    Error::InvalidArgument {
        name: name.to_string(),
        reason: format!("required for {}", action),
    }
}

/// File name without directories or extension, for naming derived outputs
fn file_stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty() && !s.starts_with('<'))
        .unwrap_or_else(|| "document".to_string())
}

fn check_pixel_area(viewport: &Viewport, max_pixels: u64) -> Result<()> {
    if viewport.pixel_area() > max_pixels {
        return Err(Error::ImageDimensionExceeded {
            detail: format!(
                "{}x{} pixels exceeds the limit of {} pixels",
                viewport.width, viewport.height, max_pixels
            ),
        });
    }
    Ok(())
}

/// Page count of a downloaded document. Encrypted downloads are delivered
/// as-is and report 0; any other read failure rejects the download.
fn downloaded_page_count(data: &[u8]) -> Result<u32> {
    match QpdfWrapper::page_count(data, None) {
        Ok(count) => Ok(count),
        Err(Error::PasswordRequired) => Ok(0),
        Err(e) => Err(e),
    }
}

/// State of a session needed to draw its current page
struct PageSnapshot {
    data: Arc<[u8]>,
    password: Option<String>,
    page: u32,
    page_count: u32,
    viewport: Viewport,
    annotations: Vec<Annotation>,
}

impl PdfServer {
    fn check_render_scale(&self, scale: f32) -> Result<()> {
        if !scale.is_finite() || scale <= 0.0 || scale > self.config.max_image_scale {
            return Err(Error::InvalidArgument {
                name: "scale".to_string(),
                reason: format!(
                    "must be greater than 0 and at most {}",
                    self.config.max_image_scale
                ),
            });
        }
        Ok(())
    }

    /// Draw the current page of a session with its annotations
    async fn render_session_page(
        &self,
        session_id: &str,
        format: RasterFormat,
        include_image: bool,
    ) -> Result<PageView> {
        let snapshot = self.sessions.with_session(session_id, |s| {
            let page = s.viewer.page();
            let size = s.current_page_size().ok_or(Error::PageOutOfBounds {
                page,
                total: s.page_count(),
            })?;
            Ok(PageSnapshot {
                data: Arc::clone(&s.data),
                password: s.password.clone(),
                page,
                page_count: s.page_count(),
                viewport: Viewport::for_page(size, s.viewer.scale()),
                annotations: s.annotations.for_page(page).cloned().collect(),
            })
        })?;

        let mut view = PageView {
            page: snapshot.page,
            page_count: snapshot.page_count,
            scale: snapshot.viewport.scale,
            width: snapshot.viewport.width,
            height: snapshot.viewport.height,
            mime_type: None,
            data_base64: None,
            annotations: snapshot.annotations.clone(),
        };
        if !include_image {
            return Ok(view);
        }

        check_pixel_area(&snapshot.viewport, self.config.max_image_pixels)?;

        let PageSnapshot {
            data,
            password,
            page,
            viewport,
            annotations,
            ..
        } = snapshot;
        let (width, height, encoded) = tokio::task::spawn_blocking(move || {
            let (mut image, _) = render_page(&data, password.as_deref(), page, viewport.scale)?;
            draw_annotations(&mut image, annotations.iter(), viewport.scale);
            let (width, height) = image.dimensions();
            let encoded = encode_image(image, format)?;
            Ok::<_, Error>((width, height, encoded))
        })
        .await
        .map_err(join_error)??;

        view.width = width;
        view.height = height;
        view.mime_type = Some(format.mime_type().to_string());
        view.data_base64 = Some(base64::engine::general_purpose::STANDARD.encode(&encoded));
        Ok(view)
    }

    pub async fn process_open_pdf(&self, params: &OpenPdfParams) -> Result<OpenPdfResult> {
        let file = self.load_pdf(&params.source).await?;
        let data = file.data;

        let decode_data = data.clone();
        let password = params.password.clone();
        let sizes = tokio::task::spawn_blocking(move || {
            page_sizes(&decode_data, password.as_deref())
        })
        .await
        .map_err(join_error)??;

        let session_id = self.sessions.open(
            file.name.clone(),
            data,
            params.password.clone(),
            sizes,
            self.config.max_image_scale,
        )?;
        tracing::info!(session = %session_id, name = %file.name, "opened document");

        let view = match self
            .render_session_page(&session_id, params.format, params.include_image)
            .await
        {
            Ok(view) => view,
            Err(e) => {
                self.sessions.close(&session_id);
                return Err(e);
            }
        };

        Ok(OpenPdfResult {
            source: Self::source_name(&params.source),
            session_id: Some(session_id),
            file_name: Some(file.name),
            size: Some(file.size),
            size_label: Some(format_file_size(file.size)),
            view: Some(view),
            error: None,
        })
    }

    pub async fn process_view_page(&self, params: &ViewPageParams) -> Result<ViewPageResult> {
        let changed = self.sessions.with_session(&params.session_id, |s| {
            let viewer = &mut s.viewer;
            match params.action {
                ViewAction::Current => Ok(false),
                ViewAction::Next => Ok(viewer.next()),
                ViewAction::Previous => Ok(viewer.previous()),
                ViewAction::GoTo => {
                    let page = params.page.ok_or_else(|| missing("page", "go_to"))?;
                    let before = viewer.page();
                    viewer.go_to(page)?;
                    Ok(before != page)
                }
                ViewAction::ZoomIn => {
                    let before = viewer.scale();
                    Ok(viewer.zoom_in() != before)
                }
                ViewAction::ZoomOut => {
                    let before = viewer.scale();
                    Ok(viewer.zoom_out() != before)
                }
                ViewAction::SetScale => {
                    let scale = params.scale.ok_or_else(|| missing("scale", "set_scale"))?;
                    let before = viewer.scale();
                    Ok(viewer.set_scale(scale)? != before)
                }
            }
        })?;

        let view = self
            .render_session_page(&params.session_id, params.format, params.include_image)
            .await?;

        Ok(ViewPageResult {
            session_id: params.session_id.clone(),
            action: params.action,
            changed,
            view: Some(view),
            error: None,
        })
    }

    pub async fn process_annotate_pdf(
        &self,
        params: &AnnotatePdfParams,
    ) -> Result<AnnotatePdfResult> {
        let color = params.color.as_deref().map(parse_hex_color).transpose()?;

        let (annotation_count, removed, annotations) =
            self.sessions.with_session(&params.session_id, |s| {
                let page = params.page.unwrap_or_else(|| s.viewer.page());
                let layer = &mut s.annotations;
                let mut removed = None;
                let mut listed = None;

                match params.action {
                    AnnotateAction::AddStroke => {
                        let points = params
                            .points
                            .clone()
                            .ok_or_else(|| missing("points", "add_stroke"))?;
                        layer.add_stroke(
                            page,
                            points,
                            color.unwrap_or(DEFAULT_STROKE_COLOR),
                            params.width.unwrap_or(DEFAULT_STROKE_WIDTH),
                        )?;
                    }
                    AnnotateAction::AddHighlight => {
                        let rect = params.rect.ok_or_else(|| missing("rect", "add_highlight"))?;
                        layer.add_highlight(page, rect, color.unwrap_or(DEFAULT_HIGHLIGHT_COLOR))?;
                    }
                    AnnotateAction::AddText => {
                        let position = params
                            .position
                            .ok_or_else(|| missing("position", "add_text"))?;
                        layer.add_text(
                            page,
                            position,
                            params.text.as_deref().unwrap_or_default(),
                            color.unwrap_or(DEFAULT_NOTE_COLOR),
                        )?;
                    }
                    AnnotateAction::Undo => {
                        removed = Some(usize::from(layer.undo().is_some()));
                    }
                    AnnotateAction::Clear => {
                        removed = Some(layer.clear(params.page));
                    }
                    AnnotateAction::List => {
                        listed = Some(match params.page {
                            Some(p) => layer.for_page(p).cloned().collect(),
                            None => layer.all().to_vec(),
                        });
                    }
                }

                Ok((layer.len(), removed, listed))
            })?;

        tracing::debug!(
            session = %params.session_id,
            action = ?params.action,
            annotation_count,
            "annotations updated"
        );

        let view = if params.render {
            Some(
                self.render_session_page(&params.session_id, params.format, true)
                    .await?,
            )
        } else {
            None
        };

        Ok(AnnotatePdfResult {
            session_id: params.session_id.clone(),
            action: params.action,
            annotation_count,
            removed,
            annotations,
            view,
            error: None,
        })
    }

    pub async fn process_extract_text(
        &self,
        source: &PdfSource,
        params: &ExtractTextParams,
    ) -> Result<ExtractTextResult> {
        let file = self.load_pdf(source).await?;
        let cache_key = if params.cache {
            self.cache.insert(file.data.clone())
        } else {
            None
        };

        let data = file.data;
        let password = params.password.clone();
        let selection = params.pages.clone();
        let (page_count, pages) = tokio::task::spawn_blocking(move || {
            let total = QpdfWrapper::page_count(&data, password.as_deref())?;
            let numbers = selected_pages(selection.as_deref(), total)?;
            let pages = extract_text(&data, password.as_deref(), &numbers)?;
            Ok::<_, Error>((total, pages))
        })
        .await
        .map_err(join_error)??;

        let text = pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let total_characters = pages.iter().map(|p| p.text.chars().count()).sum();

        Ok(ExtractTextResult {
            source: Self::source_name(source),
            cache_key,
            page_count,
            pages,
            text,
            total_characters,
            error: None,
        })
    }

    pub async fn process_extract_metadata(
        &self,
        source: &PdfSource,
        params: &ExtractMetadataParams,
    ) -> Result<ExtractMetadataResult> {
        let file = self.load_pdf(source).await?;
        let pdf_version = pdf_header_version(&file.data);

        let data = file.data;
        let password = params.password.clone();
        let (info, protection) = tokio::task::spawn_blocking(move || {
            let info = read_metadata(&data, password.as_deref())?;
            let protection = QpdfWrapper::inspect_protection(&data, None)?;
            Ok::<_, Error>((info, protection))
        })
        .await
        .map_err(join_error)??;

        Ok(ExtractMetadataResult {
            source: Self::source_name(source),
            file_name: file.name,
            size: file.size,
            size_label: format_file_size(file.size),
            page_count: info.page_count,
            page_size: info.page_size,
            pdf_version,
            is_encrypted: protection.is_encrypted,
            creation_date: info.creation_date.as_deref().and_then(parse_pdf_date),
            creation_date_raw: info.creation_date,
            modification_date: info.modification_date.as_deref().and_then(parse_pdf_date),
            modification_date_raw: info.modification_date,
            title: info.title,
            author: info.author,
            subject: info.subject,
            keywords: info.keywords,
            creator: info.creator,
            producer: info.producer,
            error: None,
        })
    }

    pub async fn process_convert_pdf_to_images(
        &self,
        source: &PdfSource,
        params: &ConvertPdfToImagesParams,
    ) -> Result<ConvertPdfToImagesResult> {
        let scale = params.scale.unwrap_or(DEFAULT_RENDER_SCALE);
        self.check_render_scale(scale)?;

        let file = self.load_pdf(source).await?;
        let stem = file_stem(&file.name);

        let data = file.data;
        let password = params.password.clone();
        let selection = params.pages.clone();
        let max_pixels = self.config.max_image_pixels;
        let format = params.format;
        let rendered = tokio::task::spawn_blocking(move || {
            let sizes = page_sizes(&data, password.as_deref())?;
            let numbers = selected_pages(selection.as_deref(), sizes.len() as u32)?;
            for &page in &numbers {
                check_pixel_area(&Viewport::for_page(sizes[page as usize - 1], scale), max_pixels)?;
            }

            render_pages(&data, password.as_deref(), &numbers, scale)?
                .into_iter()
                .map(|(page, image, _)| {
                    let (width, height) = image.dimensions();
                    let bytes = encode_image(image, format)?;
                    Ok((page, width, height, bytes))
                })
                .collect::<Result<Vec<_>>>()
        })
        .await
        .map_err(join_error)??;

        let engine = base64::engine::general_purpose::STANDARD;
        let images = rendered
            .into_iter()
            .map(|(page, width, height, bytes)| RenderedImage {
                page,
                width,
                height,
                mime_type: format.mime_type().to_string(),
                file_name: format!("{}-page-{}.{}", stem, page, format.extension()),
                data_base64: engine.encode(&bytes),
            })
            .collect();

        Ok(ConvertPdfToImagesResult {
            source: Self::source_name(source),
            images,
            error: None,
        })
    }

    pub async fn process_check_password(
        &self,
        source: &PdfSource,
        params: &CheckPasswordParams,
    ) -> Result<CheckPasswordResult> {
        let file = self.load_pdf(source).await?;

        let data = file.data;
        let password = params.password.clone();
        let status = tokio::task::spawn_blocking(move || {
            QpdfWrapper::inspect_protection(&data, password.as_deref())
        })
        .await
        .map_err(join_error)??;

        Ok(CheckPasswordResult {
            source: Self::source_name(source),
            file_name: Some(file.name),
            is_encrypted: status.is_encrypted,
            requires_password: status.requires_password,
            password_valid: status.password_valid,
            error: None,
        })
    }

    pub async fn process_protect_pdf(
        &self,
        params: &ProtectPdfParams,
    ) -> Result<DocumentOutputResult> {
        let file = self.load_pdf(&params.source).await?;
        let file_name = suggest_file_name(
            params.file_name.as_deref(),
            &format!("{}-protected", file_stem(&file.name)),
        );

        let options = ProtectOptions {
            user_password: params.user_password.clone(),
            owner_password: params.owner_password.clone(),
            print: params.allow_print,
            allow_copy: params.allow_copy,
            allow_modify: params.allow_modify,
            source_password: params.password.clone(),
        };
        let data = file.data;
        let (page_count, protected) = tokio::task::spawn_blocking(move || {
            let page_count = QpdfWrapper::page_count(&data, options.source_password.as_deref())?;
            let protected = QpdfWrapper::encrypt(&data, &options)?;
            Ok::<_, Error>((page_count, protected))
        })
        .await
        .map_err(join_error)??;

        let output = self.deliver(protected, file_name, params.output_path.as_deref())?;
        tracing::info!(page_count, print = ?params.allow_print, "protected document");

        Ok(DocumentOutputResult {
            source: Self::source_name(&params.source),
            page_count,
            output: Some(output),
            error: None,
        })
    }

    pub async fn process_merge_pdfs(&self, params: &MergePdfsParams) -> Result<MergePdfsResult> {
        if params.sources.len() < 2 {
            return Err(Error::TooFewSources {
                required: 2,
                given: params.sources.len(),
            });
        }

        // One file at a time, in the order given
        let mut inputs = Vec::with_capacity(params.sources.len());
        for (i, source) in params.sources.iter().enumerate() {
            let file = self
                .load_pdf(source)
                .await
                .map_err(|e| Error::SourceFailed {
                    index: i + 1,
                    source: Box::new(e),
                })?;
            inputs.push(file.data);
        }

        let (page_count, merged) = tokio::task::spawn_blocking(move || {
            let slices: Vec<&[u8]> = inputs.iter().map(Vec::as_slice).collect();
            let merged = QpdfWrapper::merge(&slices)?;
            let page_count = QpdfWrapper::page_count(&merged, None)?;
            Ok::<_, Error>((page_count, merged))
        })
        .await
        .map_err(join_error)??;

        let file_name = suggest_file_name(params.file_name.as_deref(), "merged");
        let output = self.deliver(merged, file_name, params.output_path.as_deref())?;
        tracing::info!(sources = params.sources.len(), page_count, "merged documents");

        Ok(MergePdfsResult {
            source_count: params.sources.len() as u32,
            page_count,
            output: Some(output),
            error: None,
        })
    }

    pub async fn process_split_pdf(&self, params: &SplitPdfParams) -> Result<SplitPdfResult> {
        let file = self.load_pdf(&params.source).await?;
        let stem = file_stem(&file.name);

        let data = file.data;
        let password = params.password.clone();
        let selection = params.pages.clone();
        let mode = params.mode;
        let (pages, documents) = tokio::task::spawn_blocking(move || {
            let total = QpdfWrapper::page_count(&data, password.as_deref())?;
            let pages: Vec<u32> = parse_page_selection(&selection, total)?.into_iter().collect();
            let documents: Vec<(Option<u32>, Vec<u8>)> = match mode {
                SplitMode::Extract => {
                    let bytes = QpdfWrapper::extract_pages(&data, &pages, password.as_deref())?;
                    vec![(None, bytes)]
                }
                SplitMode::Burst => {
                    QpdfWrapper::burst_pages(&data, &pages, password.as_deref())?
                        .into_iter()
                        .map(|(page, bytes)| (Some(page), bytes))
                        .collect()
                }
            };
            Ok::<_, Error>((pages, documents))
        })
        .await
        .map_err(join_error)??;

        let outputs = documents
            .into_iter()
            .map(|(page, bytes)| match page {
                None => self.deliver(
                    bytes,
                    format!("{}-split.pdf", stem),
                    params.output_path.as_deref(),
                ),
                Some(page) => {
                    let file_name = format!("{}-page-{}.pdf", stem, page);
                    let path = params
                        .output_path
                        .as_ref()
                        .map(|dir| Path::new(dir).join(&file_name).to_string_lossy().to_string());
                    self.deliver(bytes, file_name, path.as_deref())
                }
            })
            .collect::<Result<Vec<DownloadLink>>>()?;
        tracing::info!(
            mode = ?params.mode,
            pages = pages.len(),
            files = outputs.len(),
            "split document"
        );

        Ok(SplitPdfResult {
            source: Self::source_name(&params.source),
            mode: params.mode,
            pages,
            outputs,
            error: None,
        })
    }

    pub async fn process_html_to_pdf(&self, params: &HtmlToPdfParams) -> Result<HtmlToPdfResult> {
        let html = params.html.clone();
        let options = HtmlToPdfOptions {
            title: params.title.clone(),
            page_format: params.page_format,
            orientation: params.orientation,
            margin: params.margin,
        };
        let rendered = tokio::task::spawn_blocking(move || html_to_pdf(&html, &options))
            .await
            .map_err(join_error)??;

        let file_name = suggest_file_name(
            params.file_name.as_deref().or(rendered.title.as_deref()),
            "document",
        );
        let output = self.deliver(rendered.data, file_name, params.output_path.as_deref())?;
        tracing::info!(page_count = rendered.page_count, "converted HTML to PDF");

        Ok(HtmlToPdfResult {
            page_count: rendered.page_count,
            title: rendered.title,
            output: Some(output),
            error: None,
        })
    }

    pub async fn process_download_pdf(
        &self,
        params: &DownloadPdfParams,
    ) -> Result<DocumentOutputResult> {
        let file = resolve_url(
            &params.url,
            self.config.allow_private_urls,
            self.config.max_download_bytes,
        )
        .await?;
        ensure_pdf(&file)?;

        let file_name = suggest_file_name(
            params.file_name.as_deref().or(Some(file.name.as_str())),
            "download",
        );

        let data = file.data;
        let (page_count, data) = tokio::task::spawn_blocking(move || {
            let page_count = downloaded_page_count(&data)?;
            Ok::<_, Error>((page_count, data))
        })
        .await
        .map_err(join_error)??;

        let output = self.deliver(data, file_name, params.output_path.as_deref())?;
        tracing::info!(url = %params.url, size = output.size, "downloaded PDF");

        Ok(DocumentOutputResult {
            source: params.url.clone(),
            page_count,
            output: Some(output),
            error: None,
        })
    }

    pub fn process_list_pdfs(&self, params: &ListPdfsParams) -> Result<ListPdfsResult> {
        // Sandbox check: if resource_dirs are configured, directory must be within them
        if !self.config.resource_dirs.is_empty() {
            let canonical =
                std::fs::canonicalize(&params.directory).map_err(|_| Error::PathAccessDenied {
                    path: params.directory.clone(),
                })?;
            if !self.is_within_resource_dirs(&canonical) {
                return Err(Error::PathAccessDenied {
                    path: params.directory.clone(),
                });
            }
        }

        let dir_path = Path::new(&params.directory);

        if !dir_path.exists() {
            return Err(Error::PdfNotFound {
                path: params.directory.clone(),
            });
        }

        if !dir_path.is_dir() {
            return Err(Error::InvalidArgument {
                name: "directory".to_string(),
                reason: "not a directory".to_string(),
            });
        }

        let pattern = match params.pattern.as_deref() {
            Some(p) => Some(glob::Pattern::new(p).map_err(|e| Error::InvalidArgument {
                name: "pattern".to_string(),
                reason: e.to_string(),
            })?),
            None => None,
        };

        let mut files = Vec::new();
        Self::collect_pdfs(dir_path, params.recursive, pattern.as_ref(), &mut files)?;

        // Sort by path for consistent ordering
        files.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(ListPdfsResult {
            directory: params.directory.clone(),
            total_count: files.len() as u32,
            files,
            error: None,
        })
    }

    fn collect_pdfs(
        dir: &Path,
        recursive: bool,
        pattern: Option<&glob::Pattern>,
        files: &mut Vec<PdfFileInfo>,
    ) -> Result<()> {
        for entry in std::fs::read_dir(dir)?.flatten() {
            let path = entry.path();

            if path.is_dir() {
                if recursive {
                    // Unreadable subdirectories are skipped
                    let _ = Self::collect_pdfs(&path, recursive, pattern, files);
                }
                continue;
            }

            let is_pdf = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
            if !path.is_file() || !is_pdf {
                continue;
            }

            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if pattern.is_some_and(|pat| !pat.matches(&name)) {
                continue;
            }

            let metadata = std::fs::metadata(&path).ok();
            let size = metadata.as_ref().map(|m| m.len()).unwrap_or(0);
            let modified = metadata
                .as_ref()
                .and_then(|m| m.modified().ok())
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .and_then(|d| chrono::DateTime::from_timestamp(d.as_secs() as i64, 0))
                .map(|dt| dt.to_rfc3339());

            files.push(PdfFileInfo {
                path: path.to_string_lossy().to_string(),
                name,
                size,
                size_label: format_file_size(size),
                modified,
            });
        }

        Ok(())
    }
}
