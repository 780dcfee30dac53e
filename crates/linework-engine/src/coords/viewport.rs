/// Canvas size in pixels.
///
/// The camera uses it for the aspect ratio and for canvas-to-scene unprojection.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    /// Width over height; `1.0` for a degenerate viewport.
    #[inline]
    pub fn aspect(self) -> f64 {
        if self.is_valid() { self.width / self.height } else { 1.0 }
    }
}
