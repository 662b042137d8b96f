#![forbid(unsafe_code)]

//! Point and size primitives for view adapters.

use std::ops::{Add, Sub};

/// A 2D position in view-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    /// The origin.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Translate by `(dx, dy)` without mutating `self`.
    #[must_use]
    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Round both coordinates to the nearest integer.
    #[must_use]
    pub fn round(self) -> Self {
        Self {
            x: self.x.round(),
            y: self.y.round(),
        }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Whether both coordinates are exactly zero.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

impl From<Size> for Point {
    fn from(sz: Size) -> Self {
        Self {
            x: sz.width,
            y: sz.height,
        }
    }
}

impl From<Point> for (f32, f32) {
    fn from(pt: Point) -> Self {
        (pt.x, pt.y)
    }
}

impl Add<Size> for Point {
    type Output = Point;

    fn add(self, sz: Size) -> Point {
        Point {
            x: self.x + sz.width,
            y: self.y + sz.height,
        }
    }
}

impl Sub<Size> for Point {
    type Output = Point;

    fn sub(self, sz: Size) -> Point {
        Point {
            x: self.x - sz.width,
            y: self.y - sz.height,
        }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A 2D extent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const ZERO: Self = Self {
        width: 0.0,
        height: 0.0,
    };

    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.width == 0.0 && self.height == 0.0
    }
}

impl From<Point> for Size {
    fn from(pt: Point) -> Self {
        Self {
            width: pt.x,
            height: pt.y,
        }
    }
}
