//! Annotation replay onto rendered pages using tiny-skia
//!
//! Annotations are stored in page space (points, top-left origin, scale 1.0)
//! and multiplied by the viewport scale when drawn.

use crate::error::{Error, Result};
use crate::session::Annotation;
use image::RgbaImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize, Serializer};
use tiny_skia::{IntSize, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

/// Side of the square drawn for a text note, in page points
const NOTE_MARKER_SIZE: f32 = 12.0;

/// A point in page space
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// An axis-aligned rectangle in page space
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Same area with non-negative width and height
    pub fn normalized(&self) -> Self {
        Self {
            x: self.x.min(self.x + self.width),
            y: self.y.min(self.y + self.height),
            width: self.width.abs(),
            height: self.height.abs(),
        }
    }

    pub(crate) fn is_finite(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// RGBA colour, serialized as `#rrggbbaa`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }

    fn paint(&self) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color_rgba8(self.r, self.g, self.b, self.a);
        paint.anti_alias = true;
        paint
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Parse `#rrggbb` or `#rrggbbaa`
pub fn parse_hex_color(input: &str) -> Result<Color> {
    let invalid = || Error::InvalidArgument {
        name: "color".to_string(),
        reason: format!("expected #rrggbb or #rrggbbaa, got {:?}", input),
    };

    let hex = input.trim().strip_prefix('#').ok_or_else(invalid)?;
    if !(hex.len() == 6 || hex.len() == 8) || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
    let alpha = if hex.len() == 8 { channel(6)? } else { 255 };

    Ok(Color::rgba(channel(0)?, channel(2)?, channel(4)?, alpha))
}

/// Consecutive point pairs of a freehand stroke
pub fn stroke_segments(points: &[Point]) -> Vec<(Point, Point)> {
    points.windows(2).map(|pair| (pair[0], pair[1])).collect()
}

pub(crate) fn points_are_finite(points: &[Point]) -> bool {
    points.iter().all(Point::is_finite)
}

/// Convert RgbaImage to Pixmap, apply drawing function, and copy back
fn with_pixmap(img: &mut RgbaImage, f: impl FnOnce(&mut Pixmap)) {
    let Some(size) = IntSize::from_wh(img.width(), img.height()) else {
        return;
    };
    let Some(mut pixmap) = Pixmap::from_vec(img.as_raw().clone(), size) else {
        return;
    };

    f(&mut pixmap);

    img.copy_from_slice(pixmap.data());
}

fn draw_stroke(pixmap: &mut Pixmap, points: &[Point], color: Color, width: f32, scale: f32) {
    let segments = stroke_segments(points);
    if segments.is_empty() {
        return;
    }

    let mut pb = PathBuilder::new();
    pb.move_to(segments[0].0.x * scale, segments[0].0.y * scale);
    for (_, end) in &segments {
        pb.line_to(end.x * scale, end.y * scale);
    }
    let Some(path) = pb.finish() else {
        return;
    };

    let stroke = Stroke {
        width: width * scale,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Default::default()
    };
    pixmap.stroke_path(&path, &color.paint(), &stroke, Transform::identity(), None);
}

fn fill_rect(pixmap: &mut Pixmap, rect: Rect, color: Color, scale: f32) {
    let rect = rect.normalized();
    if let Some(area) = tiny_skia::Rect::from_xywh(
        rect.x * scale,
        rect.y * scale,
        rect.width * scale,
        rect.height * scale,
    ) {
        pixmap.fill_rect(area, &color.paint(), Transform::identity(), None);
    }
}

/// Draw annotations onto a page raster rendered at `scale`
pub fn draw_annotations<'a>(
    img: &mut RgbaImage,
    annotations: impl IntoIterator<Item = &'a Annotation>,
    scale: f32,
) {
    let annotations: Vec<&Annotation> = annotations.into_iter().collect();
    if annotations.is_empty() {
        return;
    }

    with_pixmap(img, |pixmap| {
        for annotation in annotations {
            match annotation {
                Annotation::Stroke {
                    points,
                    color,
                    width,
                    ..
                } => draw_stroke(pixmap, points, *color, *width, scale),
                Annotation::Highlight { rect, color, .. } => fill_rect(pixmap, *rect, *color, scale),
                Annotation::Text {
                    position, color, ..
                } => {
                    let marker = Rect {
                        x: position.x,
                        y: position.y,
                        width: NOTE_MARKER_SIZE,
                        height: NOTE_MARKER_SIZE,
                    };
                    fill_rect(pixmap, marker, *color, scale);
                }
            }
        }
    });
}
