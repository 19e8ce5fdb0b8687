//! HTML-to-PDF conversion
//!
//! Markup is flattened into text blocks, word-wrapped with standard font
//! metrics, and laid out onto fixed-size pages that are written with lopdf
//! using the base-14 Type1 fonts (no font embedding).

use crate::error::{Error, Result};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};
use schemars::JsonSchema;
use scraper::{ElementRef, Html, Node};
use serde::{Deserialize, Serialize};

const PRODUCER: &str = concat!("pdf-toolkit ", env!("CARGO_PKG_VERSION"));
const DEFAULT_MARGIN: f32 = 50.0;
const LINE_SPACING: f32 = 1.4;
const LIST_INDENT: f32 = 14.0;
const QUOTE_INDENT: f32 = 20.0;

/// Elements whose content never reaches the page
const SKIPPED: &[&str] = &["head", "script", "style", "title", "noscript", "template"];

/// Elements that continue the surrounding paragraph
const INLINE: &[&str] = &[
    "a", "abbr", "b", "cite", "em", "font", "i", "label", "mark", "q", "s", "small", "span",
    "strong", "sub", "sup", "u",
];

/// Helvetica advance widths (1/1000 em) for ASCII 32..=126
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Page size for generated documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PageFormat {
    #[default]
    A4,
    Letter,
}

impl PageFormat {
    /// Portrait width and height in points
    pub fn dimensions(&self) -> (f32, f32) {
        match self {
            PageFormat::A4 => (595.28, 841.89),
            PageFormat::Letter => (612.0, 792.0),
        }
    }
}

/// Page orientation for generated documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    /// Apply to portrait `(width, height)`; landscape swaps the sides
    pub fn apply(&self, (width, height): (f32, f32)) -> (f32, f32) {
        match self {
            Orientation::Portrait => (width, height),
            Orientation::Landscape => (height, width),
        }
    }
}

/// Standard fonts used by the layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
    Mono,
}

impl Font {
    const ALL: [Font; 3] = [Font::Regular, Font::Bold, Font::Mono];

    fn resource_name(&self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Mono => "F3",
        }
    }

    fn base_font(&self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
            Font::Mono => "Courier",
        }
    }
}

/// Estimated width of `text` in points
pub fn text_width(text: &str, font: Font, size: f32) -> f32 {
    let units: u32 = text
        .chars()
        .map(|c| match font {
            Font::Mono => 600,
            _ => match c {
                ' '..='~' => HELVETICA_WIDTHS[c as usize - 32] as u32,
                _ => 556,
            },
        })
        .sum();

    let width = units as f32 / 1000.0 * size;
    // Helvetica-Bold runs slightly wider than the regular metrics
    if font == Font::Bold {
        width * 1.08
    } else {
        width
    }
}

/// Greedy word wrap. Explicit `\n` in `text` always starts a new line, and a
/// word wider than `max_width` is broken between characters.
pub fn wrap_text(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let space = text_width(" ", font, size);
    let mut lines = Vec::new();

    for source_line in text.split('\n') {
        let mut current = String::new();
        let mut current_width = 0.0;

        for word in source_line.split_whitespace() {
            let word_width = text_width(word, font, size);
            let needed = if current.is_empty() {
                word_width
            } else {
                current_width + space + word_width
            };

            if needed <= max_width {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
                current_width = needed;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = 0.0;
            }

            if word_width <= max_width {
                current.push_str(word);
                current_width = word_width;
            } else {
                for ch in word.chars() {
                    let ch_width = text_width(ch.encode_utf8(&mut [0; 4]), font, size);
                    if current_width + ch_width > max_width && !current.is_empty() {
                        lines.push(std::mem::take(&mut current));
                        current_width = 0.0;
                    }
                    current.push(ch);
                    current_width += ch_width;
                }
            }
        }

        if !current.is_empty() {
            lines.push(current);
        }
    }

    lines
}

/// A unit of flowed content
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph(String),
    ListItem(String),
    /// Monospace text with line breaks preserved
    Preformatted(String),
    Quote(String),
    TableRow(Vec<String>),
    Rule,
    PageBreak,
}

impl Block {
    fn has_text(&self) -> bool {
        match self {
            Block::Heading { text, .. }
            | Block::Paragraph(text)
            | Block::ListItem(text)
            | Block::Preformatted(text)
            | Block::Quote(text) => !text.trim().is_empty(),
            Block::TableRow(cells) => cells.iter().any(|c| !c.trim().is_empty()),
            Block::Rule | Block::PageBreak => false,
        }
    }
}

/// Blocks and `<title>` of a parsed document
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlDocument {
    pub title: Option<String>,
    pub blocks: Vec<Block>,
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of an element with `<br>` kept as line breaks
fn gather_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&text.replace(['\n', '\r'], " ")),
            Node::Element(e) if e.name() == "br" => out.push('\n'),
            Node::Element(e) if SKIPPED.contains(&e.name()) => {}
            Node::Element(_) => {
                if let Some(el) = ElementRef::wrap(child) {
                    gather_text(el, out);
                }
            }
            _ => {}
        }
    }
}

fn inline_text(element: ElementRef) -> String {
    let mut raw = String::new();
    gather_text(element, &mut raw);
    raw.split('\n')
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn preformatted_text(element: ElementRef) -> String {
    let raw: String = element.text().collect();
    raw.replace("\r\n", "\n")
        .replace('\t', "    ")
        .trim_matches('\n')
        .to_string()
}

#[derive(Default)]
struct BlockCollector {
    blocks: Vec<Block>,
    inline: String,
}

impl BlockCollector {
    fn flush(&mut self) {
        let text = collapse_whitespace(&self.inline);
        self.inline.clear();
        if !text.is_empty() {
            self.blocks.push(Block::Paragraph(text));
        }
    }

    fn push(&mut self, block: Block) {
        self.flush();
        if block.has_text() || matches!(block, Block::Rule | Block::PageBreak) {
            self.blocks.push(block);
        }
    }

    fn walk(&mut self, element: ElementRef) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.inline.push_str(text),
                Node::Element(_) => {
                    if let Some(el) = ElementRef::wrap(child) {
                        self.visit(el);
                    }
                }
                _ => {}
            }
        }
    }

    fn visit(&mut self, element: ElementRef) {
        let name = element.value().name();
        if SKIPPED.contains(&name) {
            return;
        }

        if element.value().classes().any(|c| c == "page-break") {
            self.push(Block::PageBreak);
        }

        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name.as_bytes()[1] - b'0';
                self.push(Block::Heading {
                    level,
                    text: inline_text(element),
                });
            }
            "p" => self.push(Block::Paragraph(inline_text(element))),
            "li" => self.push(Block::ListItem(inline_text(element))),
            "pre" | "code" => self.push(Block::Preformatted(preformatted_text(element))),
            "blockquote" => self.push(Block::Quote(inline_text(element))),
            "tr" => {
                let cells = element
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|cell| matches!(cell.value().name(), "td" | "th"))
                    .map(|cell| collapse_whitespace(&inline_text(cell)))
                    .collect();
                self.push(Block::TableRow(cells));
            }
            "br" => self.flush(),
            "hr" => self.push(Block::Rule),
            _ if INLINE.contains(&name) => self.walk(element),
            _ => {
                self.flush();
                self.walk(element);
                self.flush();
            }
        }
    }
}

/// Flatten markup into blocks and pick up its `<title>`
pub fn parse_html(html: &str) -> HtmlDocument {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let title = root
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "title")
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty());

    let mut collector = BlockCollector::default();
    collector.visit(root);
    collector.flush();

    HtmlDocument {
        title,
        blocks: collector.blocks,
    }
}

/// Encode text for a WinAnsiEncoding font; unmappable characters become `?`
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{20AC}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{A0}'..='\u{FF}' => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

/// PDF text string: plain bytes for ASCII, UTF-16BE with BOM otherwise
fn pdf_text_string(text: &str) -> Object {
    let bytes = if text.is_ascii() {
        text.as_bytes().to_vec()
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        bytes.extend(text.encode_utf16().flat_map(|u| u.to_be_bytes()));
        bytes
    };
    Object::String(bytes, StringFormat::Literal)
}

struct PageWriter {
    width: f32,
    height: f32,
    margin: f32,
    pages: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    cursor: f32,
}

impl PageWriter {
    fn new((width, height): (f32, f32), margin: f32) -> Self {
        Self {
            width,
            height,
            margin,
            pages: Vec::new(),
            current: Vec::new(),
            cursor: height - margin,
        }
    }

    fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    fn at_page_top(&self) -> bool {
        self.current.is_empty()
    }

    fn new_page(&mut self) {
        let page = std::mem::take(&mut self.current);
        self.pages.push(page);
        self.cursor = self.height - self.margin;
    }

    fn page_break(&mut self) {
        if !self.at_page_top() {
            self.new_page();
        }
    }

    fn ensure_room(&mut self, height: f32) {
        if self.cursor - height < self.margin && !self.at_page_top() {
            self.new_page();
        }
    }

    fn gap(&mut self, height: f32) {
        if !self.at_page_top() {
            self.cursor -= height;
        }
    }

    fn draw_text(&mut self, font: Font, size: f32, x: f32, baseline: f32, text: &str) {
        self.current.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(font.resource_name().as_bytes().to_vec()), size.into()],
            ),
            Operation::new("Td", vec![x.into(), baseline.into()]),
            Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
    }

    /// Write one line at `x`, with an optional marker in the left margin of the block
    fn line(&mut self, font: Font, size: f32, x: f32, text: &str, marker: Option<&str>) {
        let line_height = size * LINE_SPACING;
        self.ensure_room(line_height);
        let baseline = self.cursor - size;
        if let Some(marker) = marker {
            self.draw_text(Font::Regular, size, self.margin + 2.0, baseline, marker);
        }
        self.draw_text(font, size, x, baseline, text);
        self.cursor -= line_height;
    }

    fn rule(&mut self) {
        self.ensure_room(12.0);
        let y = self.cursor - 6.0;
        self.current.extend([
            Operation::new("w", vec![0.5_f32.into()]),
            Operation::new("m", vec![self.margin.into(), y.into()]),
            Operation::new("l", vec![(self.width - self.margin).into(), y.into()]),
            Operation::new("S", vec![]),
        ]);
        self.cursor -= 12.0;
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.new_page();
        }
        self.pages
    }
}

fn layout(blocks: &[Block], page_size: (f32, f32), margin: f32) -> Vec<Vec<Operation>> {
    let mut writer = PageWriter::new(page_size, margin);
    let left = margin;

    for block in blocks {
        match block {
            Block::Heading { level, text } => {
                let size = match level {
                    1 => 22.0,
                    2 => 18.0,
                    3 => 15.0,
                    4 => 13.0,
                    5 => 12.0,
                    _ => 11.0,
                };
                writer.gap(size * 0.4);
                for line in wrap_text(text, Font::Bold, size, writer.content_width()) {
                    writer.line(Font::Bold, size, left, &line, None);
                }
                writer.gap(size * 0.3);
            }
            Block::Paragraph(text) => {
                for line in wrap_text(text, Font::Regular, 11.0, writer.content_width()) {
                    writer.line(Font::Regular, 11.0, left, &line, None);
                }
                writer.gap(8.0);
            }
            Block::ListItem(text) => {
                let width = writer.content_width() - LIST_INDENT;
                for (i, line) in wrap_text(text, Font::Regular, 11.0, width).iter().enumerate() {
                    let marker = (i == 0).then_some("\u{2022}");
                    writer.line(Font::Regular, 11.0, left + LIST_INDENT, line, marker);
                }
                writer.gap(3.0);
            }
            Block::Preformatted(text) => {
                let size = 9.5;
                let per_line = (writer.content_width() / (0.6 * size)).floor().max(1.0) as usize;
                for source_line in text.split('\n') {
                    let chars: Vec<char> = source_line.chars().collect();
                    if chars.is_empty() {
                        writer.line(Font::Mono, size, left, "", None);
                        continue;
                    }
                    for chunk in chars.chunks(per_line) {
                        let line: String = chunk.iter().collect();
                        writer.line(Font::Mono, size, left, &line, None);
                    }
                }
                writer.gap(8.0);
            }
            Block::Quote(text) => {
                let width = writer.content_width() - QUOTE_INDENT;
                for line in wrap_text(text, Font::Regular, 11.0, width) {
                    writer.line(Font::Regular, 11.0, left + QUOTE_INDENT, &line, None);
                }
                writer.gap(8.0);
            }
            Block::TableRow(cells) => {
                let text = cells.join(" | ");
                for line in wrap_text(&text, Font::Regular, 10.0, writer.content_width()) {
                    writer.line(Font::Regular, 10.0, left, &line, None);
                }
                writer.gap(4.0);
            }
            Block::Rule => writer.rule(),
            Block::PageBreak => writer.page_break(),
        }
    }

    writer.finish()
}

fn write_document(
    pages: Vec<Vec<Operation>>,
    (width, height): (f32, f32),
    title: Option<&str>,
) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    for font in Font::ALL {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font.resource_name(), font_id);
    }
    let resources_id = doc.add_object(dictionary! { "Font" => fonts });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut info = dictionary! { "Producer" => Object::string_literal(PRODUCER) };
    if let Some(title) = title {
        info.set("Title", pdf_text_string(title));
    }
    let info_id = doc.add_object(info);
    doc.trailer.set("Info", info_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

/// Options for [`html_to_pdf`]
#[derive(Debug, Clone, Default)]
pub struct HtmlToPdfOptions {
    /// Document title; falls back to the markup's `<title>`
    pub title: Option<String>,
    pub page_format: PageFormat,
    pub orientation: Orientation,
    /// Page margin in points
    pub margin: Option<f32>,
}

impl HtmlToPdfOptions {
    /// Width and height of every page in points
    pub fn page_size(&self) -> (f32, f32) {
        self.orientation.apply(self.page_format.dimensions())
    }
}

/// A generated document
#[derive(Debug, Clone)]
pub struct RenderedPdf {
    pub data: Vec<u8>,
    pub page_count: u32,
    pub title: Option<String>,
}

/// Convert an HTML string into a paginated PDF
pub fn html_to_pdf(html: &str, options: &HtmlToPdfOptions) -> Result<RenderedPdf> {
    let margin = options.margin.unwrap_or(DEFAULT_MARGIN);
    let page_size = options.page_size();
    let (width, height) = page_size;
    if !(0.0..width.min(height) / 3.0).contains(&margin) {
        return Err(Error::InvalidArgument {
            name: "margin".to_string(),
            reason: format!("must be between 0 and {:.0} points", width.min(height) / 3.0),
        });
    }

    let parsed = parse_html(html);
    if !parsed.blocks.iter().any(Block::has_text) {
        return Err(Error::EmptyInput {
            field: "html".to_string(),
        });
    }

    let title = options
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .or(parsed.title);

    let pages = layout(&parsed.blocks, page_size, margin);
    let page_count = pages.len() as u32;
    let data = write_document(pages, page_size, title.as_deref())?;

    tracing::debug!(
        blocks = parsed.blocks.len(),
        pages = page_count,
        bytes = data.len(),
        "rendered HTML to PDF"
    );

    Ok(RenderedPdf {
        data,
        page_count,
        title,
    })
}
