//! Per-document annotation layer

use crate::error::{Error, Result};
use crate::pdf::overlay::{points_are_finite, Color, Point, Rect};
use serde::Serialize;

pub const DEFAULT_STROKE_COLOR: Color = Color::rgba(0xe5, 0x39, 0x35, 0xff);
pub const DEFAULT_HIGHLIGHT_COLOR: Color = Color::rgba(0xff, 0xeb, 0x3b, 0x66);
pub const DEFAULT_NOTE_COLOR: Color = Color::rgba(0x1e, 0x88, 0xe5, 0xff);
pub const DEFAULT_STROKE_WIDTH: f32 = 2.0;

/// A mark placed on one page; coordinates are page points at scale 1.0
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Annotation {
    /// Freehand drawing
    Stroke {
        page: u32,
        points: Vec<Point>,
        color: Color,
        width: f32,
    },
    Highlight {
        page: u32,
        rect: Rect,
        color: Color,
    },
    /// Text note anchored at a point
    Text {
        page: u32,
        position: Point,
        text: String,
        color: Color,
    },
}

impl Annotation {
    pub fn page(&self) -> u32 {
        match self {
            Annotation::Stroke { page, .. }
            | Annotation::Highlight { page, .. }
            | Annotation::Text { page, .. } => *page,
        }
    }
}

/// Ordered annotations of one document. Insertion order is kept so `undo`
/// removes whatever was added last, whatever its kind or page.
#[derive(Debug, Clone, Default)]
pub struct AnnotationLayer {
    page_count: u32,
    items: Vec<Annotation>,
}

impl AnnotationLayer {
    pub fn new(page_count: u32) -> Self {
        Self {
            page_count,
            items: Vec::new(),
        }
    }

    fn check_page(&self, page: u32) -> Result<()> {
        if page < 1 || page > self.page_count {
            return Err(Error::PageOutOfBounds {
                page,
                total: self.page_count,
            });
        }
        Ok(())
    }

    fn push(&mut self, annotation: Annotation) -> usize {
        self.items.push(annotation);
        self.items.len()
    }

    /// Add a freehand stroke; returns the new annotation count.
    pub fn add_stroke(
        &mut self,
        page: u32,
        points: Vec<Point>,
        color: Color,
        width: f32,
    ) -> Result<usize> {
        self.check_page(page)?;
        if points.is_empty() {
            return Err(Error::EmptyInput {
                field: "points".to_string(),
            });
        }
        if !points_are_finite(&points) {
            return Err(Error::InvalidArgument {
                name: "points".to_string(),
                reason: "coordinates must be finite".to_string(),
            });
        }
        if !width.is_finite() || width <= 0.0 {
            return Err(Error::InvalidArgument {
                name: "width".to_string(),
                reason: format!("must be a positive number, got {}", width),
            });
        }

        Ok(self.push(Annotation::Stroke {
            page,
            points,
            color,
            width,
        }))
    }

    pub fn add_highlight(&mut self, page: u32, rect: Rect, color: Color) -> Result<usize> {
        self.check_page(page)?;
        let rect = rect.normalized();
        if !rect.is_finite() || rect.width == 0.0 || rect.height == 0.0 {
            return Err(Error::InvalidArgument {
                name: "rect".to_string(),
                reason: "highlight needs a finite, non-empty area".to_string(),
            });
        }

        Ok(self.push(Annotation::Highlight { page, rect, color }))
    }

    pub fn add_text(
        &mut self,
        page: u32,
        position: Point,
        text: &str,
        color: Color,
    ) -> Result<usize> {
        self.check_page(page)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::EmptyInput {
                field: "text".to_string(),
            });
        }
        if !points_are_finite(&[position]) {
            return Err(Error::InvalidArgument {
                name: "position".to_string(),
                reason: "coordinates must be finite".to_string(),
            });
        }

        Ok(self.push(Annotation::Text {
            page,
            position,
            text: text.to_string(),
            color,
        }))
    }

    /// Remove the most recently added annotation
    pub fn undo(&mut self) -> Option<Annotation> {
        self.items.pop()
    }

    /// Remove all annotations, or only those on `page`; returns how many were removed.
    pub fn clear(&mut self, page: Option<u32>) -> usize {
        let before = self.items.len();
        match page {
            Some(page) => self.items.retain(|a| a.page() != page),
            None => self.items.clear(),
        }
        before - self.items.len()
    }

    pub fn for_page(&self, page: u32) -> impl Iterator<Item = &Annotation> {
        self.items.iter().filter(move |a| a.page() == page)
    }

    pub fn all(&self) -> &[Annotation] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
