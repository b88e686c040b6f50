//! Viewport geometry.
//!
//! The host reports the viewport and element bounds in one shared coordinate
//! space (typically content coordinates of the scrolled list); the tracker
//! only ever compares rectangles.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle. Origin is top-left, y grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Area, treating negative extents as empty.
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Grow the rectangle by `margin` on every side.
    ///
    /// A negative margin shrinks it; extents never go below zero.
    pub fn expand(&self, margin: f32) -> Rect {
        Rect {
            x: self.x - margin,
            y: self.y - margin,
            width: (self.width + 2.0 * margin).max(0.0),
            height: (self.height + 2.0 * margin).max(0.0),
        }
    }

    /// Same rectangle moved vertically to `y`.
    pub fn with_y(&self, y: f32) -> Rect {
        Rect { y, ..*self }
    }

    /// Overlapping region, edges inclusive.
    ///
    /// Rectangles that only touch produce a zero-area intersection rather
    /// than `None`.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right < left || bottom < top {
            return None;
        }

        Some(Rect::new(left, top, right - left, bottom - top))
    }

    /// Fraction of `self` covered by `other`, in `0.0..=1.0`.
    ///
    /// Zero-area rectangles have no meaningful ratio and report `0.0`.
    pub fn coverage_by(&self, other: &Rect) -> f32 {
        let area = self.area();
        if area <= 0.0 {
            return 0.0;
        }
        self.intersection(other)
            .map(|overlap| (overlap.area() / area).min(1.0))
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersection_overlapping() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(50.0, 50.0, 100.0, 100.0);
        let overlap = a.intersection(&b).unwrap();
        assert_eq!(overlap, Rect::new(50.0, 50.0, 50.0, 50.0));
    }

    #[test]
    fn test_intersection_touching_edges_is_zero_area() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(0.0, 100.0, 100.0, 20.0);
        let overlap = a.intersection(&b).unwrap();
        assert_eq!(overlap.area(), 0.0);
    }

    #[test]
    fn test_intersection_disjoint() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(0.0, 101.0, 100.0, 20.0);
        assert!(a.intersection(&b).is_none());
    }

    #[test]
    fn test_expand_and_shrink() {
        let r = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert_eq!(r.expand(5.0), Rect::new(5.0, 5.0, 30.0, 30.0));
        // Shrinking past zero clamps the extent
        let shrunk = r.expand(-15.0);
        assert_eq!(shrunk.width, 0.0);
        assert_eq!(shrunk.height, 0.0);
    }

    #[test]
    fn test_coverage() {
        let element = Rect::new(0.0, 90.0, 100.0, 20.0);
        let viewport = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!((element.coverage_by(&viewport) - 0.5).abs() < f32::EPSILON);
        assert_eq!(Rect::new(0.0, 0.0, 100.0, 0.0).coverage_by(&viewport), 0.0);
    }
}
