//! Document decoding, rendering, and text/metadata extraction via PDFium

use crate::error::{Error, Result};
use chrono::{FixedOffset, NaiveDate, TimeZone};
use image::{DynamicImage, RgbaImage};
use pdfium_render::prelude::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Get PDFium instance (creates new instance each time - PDFium is not thread-safe)
fn create_pdfium() -> Result<Pdfium> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                "/opt/pdfium/lib",
            ))
        })
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| Error::Pdfium {
            reason: format!("Failed to initialize PDFium: {}", e),
        })?;

    Ok(Pdfium::new(bindings))
}

/// Whether a PDFium library can be bound in this environment
pub fn pdfium_available() -> bool {
    create_pdfium().is_ok()
}

fn load_document<'a>(
    pdfium: &'a Pdfium,
    data: &'a [u8],
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>> {
    pdfium
        .load_pdf_from_byte_slice(data, password)
        .map_err(|e| map_pdfium_error(e, password.is_some()))
}

/// Map PDFium errors to our error type
fn map_pdfium_error(err: PdfiumError, password_given: bool) -> Error {
    match err {
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
            if password_given {
                Error::IncorrectPassword
            } else {
                Error::PasswordRequired
            }
        }
        _ => Error::Pdfium {
            reason: format!("{}", err),
        },
    }
}

fn get_page<'a>(document: &'a PdfDocument, page_num: u32, total: u32) -> Result<PdfPage<'a>> {
    if page_num < 1 || page_num > total {
        return Err(Error::PageOutOfBounds {
            page: page_num,
            total,
        });
    }
    document
        .pages()
        .get((page_num - 1) as u16)
        .map_err(|e| Error::Pdfium {
            reason: format!("Failed to get page {}: {}", page_num, e),
        })
}

/// Page dimensions in points (1 point = 1/72 inch)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, JsonSchema)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

/// Pixel-space rectangle used to rasterize one page at a scale factor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, JsonSchema)]
pub struct Viewport {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Scale factor (1.0 = one pixel per point)
    pub scale: f32,
}

impl Viewport {
    pub fn for_page(size: PageSize, scale: f32) -> Self {
        Self {
            width: (size.width * scale).round().max(1.0) as u32,
            height: (size.height * scale).round().max(1.0) as u32,
            scale,
        }
    }

    /// Total pixel area
    pub fn pixel_area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Page count and per-page sizes of a document
pub fn page_sizes(data: &[u8], password: Option<&str>) -> Result<Vec<PageSize>> {
    let pdfium = create_pdfium()?;
    let document = load_document(&pdfium, data, password)?;

    let sizes = document
        .pages()
        .iter()
        .map(|page| PageSize {
            width: page.width().value,
            height: page.height().value,
        })
        .collect();

    Ok(sizes)
}

/// Rasterize a single page (1-indexed) at `scale`.
pub fn render_page(
    data: &[u8],
    password: Option<&str>,
    page_num: u32,
    scale: f32,
) -> Result<(RgbaImage, Viewport)> {
    let mut rendered = render_pages(data, password, &[page_num], scale)?;
    rendered
        .pop()
        .map(|(_, image, viewport)| (image, viewport))
        .ok_or(Error::PageOutOfBounds {
            page: page_num,
            total: 0,
        })
}

/// Rasterize pages in order; the first failing page aborts the batch.
pub fn render_pages(
    data: &[u8],
    password: Option<&str>,
    page_numbers: &[u32],
    scale: f32,
) -> Result<Vec<(u32, RgbaImage, Viewport)>> {
    let pdfium = create_pdfium()?;
    let document = load_document(&pdfium, data, password)?;
    let total = document.pages().len() as u32;

    let config = PdfRenderConfig::new()
        .scale_page_by_factor(scale)
        .render_form_data(true)
        .render_annotations(true);

    let mut rendered = Vec::with_capacity(page_numbers.len());
    for &page_num in page_numbers {
        let page = get_page(&document, page_num, total)?;
        let viewport = Viewport::for_page(
            PageSize {
                width: page.width().value,
                height: page.height().value,
            },
            scale,
        );

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| Error::Pdfium {
                reason: format!("Failed to render page {}: {}", page_num, e),
            })?;

        rendered.push((page_num, bitmap.as_image().to_rgba8(), viewport));
    }

    Ok(rendered)
}

/// Output raster format for page conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RasterFormat {
    #[default]
    Png,
    Jpeg,
}

impl RasterFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            RasterFormat::Png => "image/png",
            RasterFormat::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            RasterFormat::Png => "png",
            RasterFormat::Jpeg => "jpg",
        }
    }
}

/// Encode a raster as PNG or JPEG bytes
pub fn encode_image(image: RgbaImage, format: RasterFormat) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut cursor = Cursor::new(&mut bytes);
    match format {
        RasterFormat::Png => {
            DynamicImage::ImageRgba8(image).write_to(&mut cursor, image::ImageFormat::Png)?
        }
        // JPEG has no alpha channel
        RasterFormat::Jpeg => DynamicImage::ImageRgba8(image)
            .to_rgb8()
            .write_to(&mut cursor, image::ImageFormat::Jpeg)?,
    }
    Ok(bytes)
}

/// Extracted text of one page
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct PageText {
    /// Page number (1-indexed)
    pub page: u32,
    pub text: String,
}

/// Extract text from the given pages (1-indexed), in the order given.
pub fn extract_text(
    data: &[u8],
    password: Option<&str>,
    page_numbers: &[u32],
) -> Result<Vec<PageText>> {
    let pdfium = create_pdfium()?;
    let document = load_document(&pdfium, data, password)?;
    let total = document.pages().len() as u32;

    let mut pages = Vec::with_capacity(page_numbers.len());
    for &page_num in page_numbers {
        let page = get_page(&document, page_num, total)?;
        let text = page
            .text()
            .map(|t| normalize_text(&t.all()))
            .map_err(|e| Error::Pdfium {
                reason: format!("Failed to read text of page {}: {}", page_num, e),
            })?;
        pages.push(PageText {
            page: page_num,
            text,
        });
    }

    Ok(pages)
}

/// Join the text runs of a page with single spaces, collapsing all whitespace
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Document information dictionary
#[derive(Debug, Clone, Default)]
pub struct PdfMetadataInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: u32,
    /// Size of the first page, rounded to hundredths of a point
    pub page_size: Option<PageSize>,
}

/// Read the information dictionary and page count
pub fn read_metadata(data: &[u8], password: Option<&str>) -> Result<PdfMetadataInfo> {
    let pdfium = create_pdfium()?;
    let document = load_document(&pdfium, data, password)?;
    let meta = document.metadata();

    let tag = |tag_type: PdfDocumentMetadataTagType| {
        meta.get(tag_type)
            .map(|t| t.value().trim().to_string())
            .filter(|v| !v.is_empty())
    };

    Ok(PdfMetadataInfo {
        title: tag(PdfDocumentMetadataTagType::Title),
        author: tag(PdfDocumentMetadataTagType::Author),
        subject: tag(PdfDocumentMetadataTagType::Subject),
        keywords: tag(PdfDocumentMetadataTagType::Keywords),
        creator: tag(PdfDocumentMetadataTagType::Creator),
        producer: tag(PdfDocumentMetadataTagType::Producer),
        creation_date: tag(PdfDocumentMetadataTagType::CreationDate),
        modification_date: tag(PdfDocumentMetadataTagType::ModificationDate),
        page_count: document.pages().len() as u32,
        page_size: document.pages().iter().next().map(|page| PageSize {
            width: round_points(page.width().value),
            height: round_points(page.height().value),
        }),
    })
}

fn round_points(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

/// Version declared in the file header, e.g. `%PDF-1.7` gives `"1.7"`.
///
/// Readers accept the header anywhere in the first kilobyte.
pub fn pdf_header_version(data: &[u8]) -> Option<String> {
    let head = &data[..data.len().min(1024)];
    let start = head.windows(5).position(|w| w == b"%PDF-")? + 5;
    let version: String = head[start..]
        .iter()
        .take_while(|b| b.is_ascii_digit() || **b == b'.')
        .map(|&b| b as char)
        .collect();
    Some(version).filter(|v| v.contains('.') && !v.starts_with('.') && !v.ends_with('.'))
}

/// Convert a PDF date string (`D:YYYYMMDDHHmmSSOHH'mm'`) to RFC 3339.
///
/// Every field after the year is optional; a missing offset is read as UTC.
pub fn parse_pdf_date(raw: &str) -> Option<String> {
    let s = raw.trim();
    let s = s.strip_prefix("D:").unwrap_or(s);

    let digits_len = s.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits_len < 4 || digits_len % 2 != 0 || digits_len > 14 {
        return None;
    }
    let (digits, zone) = s.split_at(digits_len);

    let field = |start: usize, default: u32| -> Option<u32> {
        match digits.get(start..start + 2) {
            Some(part) => part.parse().ok(),
            None => Some(default),
        }
    };

    let year: i32 = digits[0..4].parse().ok()?;
    let month = field(4, 1)?;
    let day = field(6, 1)?;
    let hour = field(8, 0)?;
    let minute = field(10, 0)?;
    let second = field(12, 0)?;

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;
    let offset = parse_pdf_offset(zone)?;

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.to_rfc3339())
}

fn parse_pdf_offset(zone: &str) -> Option<FixedOffset> {
    let mut chars = zone.chars();
    let sign = match chars.next() {
        None | Some('Z') => return FixedOffset::east_opt(0),
        Some('+') => 1,
        Some('-') => -1,
        Some(_) => return None,
    };

    let rest: String = chars.filter(|c| c.is_ascii_digit()).collect();
    let hours: i32 = rest.get(0..2)?.parse().ok()?;
    let minutes: i32 = match rest.get(2..4) {
        Some(m) => m.parse().ok()?,
        None => 0,
    };

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("D:20240102030405Z", Some("2024-01-02T03:04:05+00:00"))]
    #[case("D:20240102030405+05'30'", Some("2024-01-02T03:04:05+05:30"))]
    #[case("D:19991231235959-08'00", Some("1999-12-31T23:59:59-08:00"))]
    #[case("D:2023", Some("2023-01-01T00:00:00+00:00"))]
    #[case("20230615", Some("2023-06-15T00:00:00+00:00"))]
    #[case("D:20231345", None)]
    #[case("D:202", None)]
    #[case("yesterday", None)]
    fn test_parse_pdf_date(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(parse_pdf_date(raw).as_deref(), expected);
    }

    #[rstest]
    #[case(b"%PDF-1.7\n%\xe2\xe3", Some("1.7"))]
    #[case(b"\x00\x00junk%PDF-2.0\r\n", Some("2.0"))]
    #[case(b"%PDF-1.4", Some("1.4"))]
    #[case(b"%PDF-\n", None)]
    #[case(b"%PDF-1.", None)]
    #[case(b"GIF89a", None)]
    #[case(b"", None)]
    fn test_pdf_header_version(#[case] data: &[u8], #[case] expected: Option<&str>) {
        assert_eq!(pdf_header_version(data).as_deref(), expected);
    }

    #[rstest]
    #[case(595.2756, 595.28)]
    #[case(612.0, 612.0)]
    #[case(841.8898, 841.89)]
    fn test_round_points(#[case] value: f32, #[case] expected: f32) {
        assert!((round_points(value) - expected).abs() < 1e-3);
    }

    #[test]
    fn test_viewport_scales_page_size() {
        let size = PageSize {
            width: 612.0,
            height: 792.0,
        };
        assert_eq!(
            Viewport::for_page(size, 1.0),
            Viewport {
                width: 612,
                height: 792,
                scale: 1.0
            }
        );
        let zoomed = Viewport::for_page(size, 1.5);
        assert_eq!((zoomed.width, zoomed.height), (918, 1188));
        assert_eq!(zoomed.pixel_area(), 918 * 1188);
    }

    #[rstest]
    #[case("  Hello \t  world \r\n\n  second   line  ", "Hello world second line")]
    #[case("Hello   world\nsecond line", "Hello world second line")]
    #[case("one\r\ntwo", "one two")]
    #[case(" \n\t ", "")]
    fn test_normalize_text(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_text(raw), expected);
    }

    #[test]
    fn test_encode_image_formats() {
        let image = RgbaImage::from_pixel(4, 3, image::Rgba([255, 0, 0, 255]));
        let png = encode_image(image.clone(), RasterFormat::Png).unwrap();
        assert_eq!(&png[1..4], b"PNG");

        let jpeg = encode_image(image, RasterFormat::Jpeg).unwrap();
        assert_eq!(&jpeg[0..2], &[0xFF, 0xD8]);
        assert_eq!(RasterFormat::Jpeg.mime_type(), "image/jpeg");
    }
}
