use serde::{Deserialize, Serialize};

use crate::util::vec2::Vec2;

/// Axis-aligned rectangle; `(x, y)` is the top-left corner
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Box of the given half extents centered on `center`
    pub fn from_center(center: Vec2, half_width: f32, half_height: f32) -> Self {
        Self {
            x: center.x - half_width,
            y: center.y - half_height,
            width: half_width * 2.0,
            height: half_height * 2.0,
        }
    }

    /// Square box enclosing a circle
    pub fn around(center: Vec2, radius: f32) -> Self {
        Self::from_center(center, radius, radius)
    }

    /// Smallest box containing both points
    pub fn spanning(a: Vec2, b: Vec2) -> Self {
        let min = Vec2::new(a.x.min(b.x), a.y.min(b.y));
        Self {
            x: min.x,
            y: min.y,
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Finite coordinates and non-negative extents
    pub fn is_valid(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width >= 0.0
            && self.height >= 0.0
    }

    /// Strict overlap; boxes that only share an edge do not intersect
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    /// True when `other` lies entirely inside this box
    pub fn contains_box(&self, other: &BoundingBox) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn inflate(&self, margin: f32) -> Self {
        Self {
            x: self.x - margin,
            y: self.y - margin,
            width: self.width + margin * 2.0,
            height: self.height + margin * 2.0,
        }
    }

    /// Clamp a point so that a box of the given half extents centered on it stays inside
    pub fn clamp_center(&self, center: Vec2, half_width: f32, half_height: f32) -> Vec2 {
        Vec2::new(
            center
                .x
                .clamp(self.x + half_width, (self.right() - half_width).max(self.x + half_width)),
            center
                .y
                .clamp(self.y + half_height, (self.bottom() - half_height).max(self.y + half_height)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges_and_center() {
        let b = BoundingBox::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(b.right(), 40.0);
        assert_eq!(b.bottom(), 60.0);
        assert_eq!(b.center(), Vec2::new(25.0, 40.0));
    }

    #[test]
    fn test_from_center() {
        let b = BoundingBox::from_center(Vec2::new(100.0, 100.0), 20.0, 10.0);
        assert_eq!(b, BoundingBox::new(80.0, 90.0, 40.0, 20.0));
        assert_eq!(b.center(), Vec2::new(100.0, 100.0));
    }

    #[test]
    fn test_intersects_is_strict() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let touching = BoundingBox::new(10.0, 0.0, 10.0, 10.0);
        let overlapping = BoundingBox::new(9.0, 9.0, 10.0, 10.0);
        assert!(!a.intersects(&touching));
        assert!(a.intersects(&overlapping));
        assert!(overlapping.intersects(&a));
    }

    #[test]
    fn test_validity() {
        assert!(BoundingBox::new(0.0, 0.0, 0.0, 0.0).is_valid());
        assert!(!BoundingBox::new(0.0, 0.0, -1.0, 5.0).is_valid());
        assert!(!BoundingBox::new(f32::NAN, 0.0, 1.0, 1.0).is_valid());
    }

    #[test]
    fn test_spanning_orders_corners() {
        let b = BoundingBox::spanning(Vec2::new(50.0, 10.0), Vec2::new(10.0, 30.0));
        assert_eq!(b, BoundingBox::new(10.0, 10.0, 40.0, 20.0));
    }

    #[test]
    fn test_contains() {
        let world = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        assert!(world.contains_point(Vec2::new(100.0, 0.0)));
        assert!(!world.contains_point(Vec2::new(100.1, 0.0)));
        assert!(world.contains_box(&BoundingBox::new(10.0, 10.0, 90.0, 90.0)));
        assert!(!world.contains_box(&BoundingBox::new(10.0, 10.0, 91.0, 10.0)));
    }

    #[test]
    fn test_clamp_center() {
        let world = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let clamped = world.clamp_center(Vec2::new(-5.0, 120.0), 10.0, 10.0);
        assert_eq!(clamped, Vec2::new(10.0, 90.0));
    }
}
