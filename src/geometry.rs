//! # Geometry Helpers
//!
//! Accessors over axis-aligned bounding boxes and distance metrics between
//! points in image-pixel space.
//!
//! Boxes are not validated: a box with `x2 < x1` produces a negative width
//! and a center outside the usual ordering, exactly as the arithmetic says.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle given by its top-left `(x1, y1)` and
/// bottom-right `(x2, y2)` corners
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// A point in image-pixel space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Midpoint of the box, each coordinate truncated toward zero
    pub fn center(&self) -> Point {
        Point::new(
            ((self.x1 + self.x2) / 2.0).trunc(),
            ((self.y1 + self.y2) / 2.0).trunc(),
        )
    }

    /// `x2 - x1`, negative for a malformed box
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    /// Bottom-center of the box, used as the ground-contact point of a
    /// tracked object. Only x is truncated.
    pub fn foot_position(&self) -> Point {
        Point::new(((self.x1 + self.x2) / 2.0).trunc(), self.y2)
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from([x1, y1, x2, y2]: [f64; 4]) -> Self {
        Self::new(x1, y1, x2, y2)
    }
}

impl From<(f64, f64, f64, f64)> for BoundingBox {
    fn from((x1, y1, x2, y2): (f64, f64, f64, f64)) -> Self {
        Self::new(x1, y1, x2, y2)
    }
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`
    pub fn distance_to(&self, other: Point) -> f64 {
        let (dx, dy) = self.xy_distance_to(other);
        (dx * dx + dy * dy).sqrt()
    }

    /// Signed per-axis displacement `self - other`
    pub fn xy_distance_to(&self, other: Point) -> (f64, f64) {
        (self.x - other.x, self.y - other.y)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self::new(x, y)
    }
}

impl From<Point> for (f64, f64) {
    fn from(point: Point) -> Self {
        (point.x, point.y)
    }
}

pub fn get_center_of_bbox(bbox: impl Into<BoundingBox>) -> Point {
    bbox.into().center()
}

pub fn get_bbox_width(bbox: impl Into<BoundingBox>) -> f64 {
    bbox.into().width()
}

pub fn get_foot_position(bbox: impl Into<BoundingBox>) -> Point {
    bbox.into().foot_position()
}

pub fn measure_distance(p1: impl Into<Point>, p2: impl Into<Point>) -> f64 {
    p1.into().distance_to(p2.into())
}

pub fn measure_xy_distance(p1: impl Into<Point>, p2: impl Into<Point>) -> (f64, f64) {
    p1.into().xy_distance_to(p2.into())
}
