//! Page navigation and zoom state of an open document

use crate::error::{Error, Result};
use serde::Serialize;

pub const DEFAULT_SCALE: f32 = 1.0;
pub const MIN_SCALE: f32 = 0.4;
pub const ZOOM_STEP: f32 = 0.2;

/// Current page and zoom of a document session.
///
/// `page` always stays within `1..=page_count` and `scale` within
/// `MIN_SCALE..=max_scale`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Viewer {
    page: u32,
    page_count: u32,
    scale: f32,
    #[serde(skip)]
    max_scale: f32,
}

/// Keep zoom steps on a 0.01 grid so repeated steps do not drift
fn snap(scale: f32) -> f32 {
    (scale * 100.0).round() / 100.0
}

impl Viewer {
    pub fn new(page_count: u32, max_scale: f32) -> Self {
        Self {
            page: 1,
            page_count: page_count.max(1),
            scale: DEFAULT_SCALE,
            max_scale: max_scale.max(MIN_SCALE),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Advance one page; returns false at the last page.
    pub fn next(&mut self) -> bool {
        if self.page < self.page_count {
            self.page += 1;
            true
        } else {
            false
        }
    }

    /// Go back one page; returns false at the first page.
    pub fn previous(&mut self) -> bool {
        if self.page > 1 {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    pub fn go_to(&mut self, page: u32) -> Result<()> {
        if page < 1 || page > self.page_count {
            return Err(Error::PageOutOfBounds {
                page,
                total: self.page_count,
            });
        }
        self.page = page;
        Ok(())
    }

    pub fn zoom_in(&mut self) -> f32 {
        self.scale = snap(self.scale + ZOOM_STEP).min(self.max_scale);
        self.scale
    }

    pub fn zoom_out(&mut self) -> f32 {
        self.scale = snap(self.scale - ZOOM_STEP).max(MIN_SCALE);
        self.scale
    }

    /// Set an explicit zoom, clamped to the allowed range.
    pub fn set_scale(&mut self, scale: f32) -> Result<f32> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(Error::InvalidArgument {
                name: "scale".to_string(),
                reason: format!("must be a positive number, got {}", scale),
            });
        }
        self.scale = snap(scale).clamp(MIN_SCALE, self.max_scale);
        Ok(self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_initial_state() {
        let viewer = Viewer::new(5, 10.0);
        assert_eq!(viewer.page(), 1);
        assert_eq!(viewer.page_count(), 5);
        assert_eq!(viewer.scale(), 1.0);
    }

    #[test]
    fn test_navigation_bounds() {
        let mut viewer = Viewer::new(2, 10.0);
        assert!(!viewer.previous());
        assert_eq!(viewer.page(), 1);

        assert!(viewer.next());
        assert!(!viewer.next());
        assert_eq!(viewer.page(), 2);

        assert!(viewer.previous());
        assert_eq!(viewer.page(), 1);
    }

    #[test]
    fn test_go_to() {
        let mut viewer = Viewer::new(3, 10.0);
        viewer.go_to(3).unwrap();
        assert_eq!(viewer.page(), 3);

        assert!(matches!(
            viewer.go_to(4),
            Err(Error::PageOutOfBounds { page: 4, total: 3 })
        ));
        assert!(viewer.go_to(0).is_err());
        assert_eq!(viewer.page(), 3);
    }

    #[test]
    fn test_zoom_floor() {
        let mut viewer = Viewer::new(1, 10.0);
        assert_eq!(viewer.zoom_out(), 0.8);
        assert_eq!(viewer.zoom_out(), 0.6);
        assert_eq!(viewer.zoom_out(), 0.4);
        assert_eq!(viewer.zoom_out(), 0.4);
        assert_eq!(viewer.zoom_in(), 0.6);
    }

    #[test]
    fn test_zoom_in_steps_and_ceiling() {
        let mut viewer = Viewer::new(1, 1.5);
        assert_eq!(viewer.zoom_in(), 1.2);
        assert_eq!(viewer.zoom_in(), 1.4);
        assert_eq!(viewer.zoom_in(), 1.5);
    }

    #[test]
    fn test_set_scale_clamps() {
        let mut viewer = Viewer::new(1, 4.0);
        assert_eq!(viewer.set_scale(2.5).unwrap(), 2.5);
        assert_eq!(viewer.set_scale(0.1).unwrap(), 0.4);
        assert_eq!(viewer.set_scale(50.0).unwrap(), 4.0);
        assert!(viewer.set_scale(0.0).is_err());
        assert!(viewer.set_scale(f32::NAN).is_err());
    }
}
