use serde::Deserialize;

use super::Vec2;

/// Axis-aligned bounds in drawing coordinates, as reported by the parser.
#[derive(Debug, Copy, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    #[inline]
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    #[inline]
    pub fn width(self) -> f64 {
        self.max_x - self.min_x
    }

    #[inline]
    pub fn height(self) -> f64 {
        self.max_y - self.min_y
    }

    #[inline]
    pub fn center(self) -> Vec2 {
        Vec2::new(self.min_x + self.width() / 2.0, self.min_y + self.height() / 2.0)
    }

    /// Shifts the bounds so that `origin` becomes the coordinate zero.
    #[inline]
    pub fn relative_to(self, origin: Vec2) -> Self {
        Self {
            min_x: self.min_x - origin.x,
            min_y: self.min_y - origin.y,
            max_x: self.max_x - origin.x,
            max_y: self.max_y - origin.y,
        }
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
    }
}
