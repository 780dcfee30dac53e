use crate::coords::{Bounds, Vec2, Viewport};

/// Orthographic 2D camera over scene space.
///
/// The visible window is `width` x `height` scene units centred on `center`.
/// `height` follows the canvas aspect when the view is set, and is scaled
/// independently on resize so the drawing keeps its on-screen scale.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    center: Vec2,
    width: f64,
    height: f64,
    viewport: Viewport,
}

/// Padding used by `fit_view` when the caller has no preference.
pub const DEFAULT_FIT_PADDING: f64 = 0.1;

impl Camera {
    pub fn new(viewport: Viewport) -> Self {
        let mut cam = Self {
            center: Vec2::zero(),
            width: 2.0,
            height: 2.0,
            viewport,
        };
        cam.set_view(Vec2::zero(), 2.0);
        cam
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.center
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.height
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Visible window in scene coordinates.
    pub fn window(&self) -> Bounds {
        Bounds::new(
            self.center.x - self.width / 2.0,
            self.center.y - self.height / 2.0,
            self.center.x + self.width / 2.0,
            self.center.y + self.height / 2.0,
        )
    }

    /// Centres the view on `center`, `width` scene units across.
    pub fn set_view(&mut self, center: Vec2, width: f64) {
        self.center = center;
        self.width = width;
        self.height = width / self.viewport.aspect();
    }

    /// Center and width that frame the given extents.
    ///
    /// The width covers both extents at the canvas aspect and is padded by
    /// `padding` (fraction of the width). Degenerate extents get width 1.
    pub fn fit(&self, min_x: f64, max_x: f64, min_y: f64, max_y: f64, padding: f64) -> (Vec2, f64) {
        let aspect = self.viewport.aspect();
        let mut width = max_x - min_x;
        let height = max_y - min_y;
        let center = Vec2::new(min_x + width / 2.0, min_y + height / 2.0);
        if height * aspect > width {
            width = height * aspect;
        }
        if width <= f64::MIN_POSITIVE * 2.0 {
            width = 1.0;
        }
        (center, width * (1.0 + padding))
    }

    /// Adopts a new canvas size, scaling the window so scene units per
    /// pixel stay the same.
    pub fn resize(&mut self, viewport: Viewport) {
        if self.viewport.is_valid() && viewport.is_valid() {
            self.width *= viewport.width / self.viewport.width;
            self.height *= viewport.height / self.viewport.height;
        }
        self.viewport = viewport;
    }

    /// Scene units per canvas pixel, horizontally and vertically.
    fn units_per_pixel(&self) -> Vec2 {
        if !self.viewport.is_valid() {
            return Vec2::new(1.0, 1.0);
        }
        Vec2::new(
            self.width / self.viewport.width,
            self.height / self.viewport.height,
        )
    }

    /// Maps a canvas pixel position (top-left origin) to scene coordinates.
    pub fn canvas_to_scene(&self, canvas: Vec2) -> Vec2 {
        let upp = self.units_per_pixel();
        let window = self.window();
        Vec2::new(window.min_x + canvas.x * upp.x, window.max_y - canvas.y * upp.y)
    }

    /// Moves the view so content follows a pointer drag of `delta` pixels.
    pub fn pan_pixels(&mut self, delta: Vec2) {
        let upp = self.units_per_pixel();
        self.center.x -= delta.x * upp.x;
        self.center.y += delta.y * upp.y;
    }

    /// Magnifies by `factor` keeping the scene point under `canvas` fixed.
    pub fn zoom_at(&mut self, canvas: Vec2, factor: f64) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        let anchor = self.canvas_to_scene(canvas);
        self.width /= factor;
        self.height /= factor;
        self.center = anchor + (self.center - anchor) / factor;
    }

    /// Column-major orthographic projection for the vertex shaders.
    pub fn view_proj(&self) -> [[f32; 4]; 4] {
        let w = self.window();
        let sx = 2.0 / (w.max_x - w.min_x);
        let sy = 2.0 / (w.max_y - w.min_y);
        let tx = -(w.max_x + w.min_x) / (w.max_x - w.min_x);
        let ty = -(w.max_y + w.min_y) / (w.max_y - w.min_y);
        [
            [sx as f32, 0.0, 0.0, 0.0],
            [0.0, sy as f32, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [tx as f32, ty as f32, 0.0, 1.0],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn close_vec(a: Vec2, b: Vec2) -> bool {
        close(a.x, b.x) && close(a.y, b.y)
    }

    fn project(m: &[[f32; 4]; 4], p: Vec2) -> Vec2 {
        let (x, y) = (p.x as f32, p.y as f32);
        Vec2::new(f64::from(m[0][0] * x + m[3][0]), f64::from(m[1][1] * y + m[3][1]))
    }

    fn close_clip(a: Vec2, b: (f64, f64)) -> bool {
        (a.x - b.0).abs() < 1e-5 && (a.y - b.1).abs() < 1e-5
    }

    // ── fitting ──────────────────────────────────────────────────────────

    #[test]
    fn fit_wide_bounds_on_wide_canvas() {
        let cam = Camera::new(Viewport::new(200.0, 100.0));
        let (center, width) = cam.fit(0.0, 100.0, 0.0, 50.0, DEFAULT_FIT_PADDING);
        assert_eq!(center, Vec2::new(50.0, 25.0));
        assert!(close(width, f64::max(100.0, 50.0 * 2.0) * 1.1));
    }

    #[test]
    fn fit_tall_bounds_widen_to_aspect() {
        let cam = Camera::new(Viewport::new(200.0, 100.0));
        let (center, width) = cam.fit(0.0, 10.0, 0.0, 40.0, 0.0);
        assert_eq!(center, Vec2::new(5.0, 20.0));
        assert!(close(width, 80.0));
    }

    #[test]
    fn fit_degenerate_bounds_use_unit_width() {
        let cam = Camera::new(Viewport::new(400.0, 300.0));
        let (center, width) = cam.fit(7.0, 7.0, 3.0, 3.0, 0.5);
        assert_eq!(center, Vec2::new(7.0, 3.0));
        assert!(close(width, 1.5));
    }

    // ── view & projection ────────────────────────────────────────────────

    #[test]
    fn set_view_follows_aspect() {
        let mut cam = Camera::new(Viewport::new(400.0, 200.0));
        cam.set_view(Vec2::new(10.0, 10.0), 40.0);
        assert!(close(cam.height(), 20.0));
        assert_eq!(cam.window(), Bounds::new(-10.0, 0.0, 30.0, 20.0));
    }

    #[test]
    fn view_proj_maps_window_to_clip_space() {
        let mut cam = Camera::new(Viewport::new(400.0, 200.0));
        cam.set_view(Vec2::new(10.0, 10.0), 40.0);
        let m = cam.view_proj();
        assert!(close_clip(project(&m, Vec2::new(-10.0, 0.0)), (-1.0, -1.0)));
        assert!(close_clip(project(&m, Vec2::new(30.0, 20.0)), (1.0, 1.0)));
        assert!(close_clip(project(&m, Vec2::new(10.0, 10.0)), (0.0, 0.0)));
    }

    #[test]
    fn canvas_corners_unproject_to_window_corners() {
        let mut cam = Camera::new(Viewport::new(400.0, 200.0));
        cam.set_view(Vec2::zero(), 40.0);
        assert!(close_vec(cam.canvas_to_scene(Vec2::new(0.0, 0.0)), Vec2::new(-20.0, 10.0)));
        assert!(close_vec(cam.canvas_to_scene(Vec2::new(400.0, 200.0)), Vec2::new(20.0, -10.0)));
        assert!(close_vec(cam.canvas_to_scene(Vec2::new(200.0, 100.0)), Vec2::zero()));
    }

    // ── interaction ──────────────────────────────────────────────────────

    #[test]
    fn resize_keeps_scale_and_center() {
        let mut cam = Camera::new(Viewport::new(400.0, 300.0));
        cam.set_view(Vec2::new(5.0, 5.0), 40.0);
        cam.resize(Viewport::new(800.0, 300.0));
        assert!(close(cam.width(), 80.0));
        assert!(close(cam.height(), 30.0));
        assert_eq!(cam.center(), Vec2::new(5.0, 5.0));
    }

    #[test]
    fn drag_right_moves_view_left() {
        let mut cam = Camera::new(Viewport::new(100.0, 100.0));
        cam.set_view(Vec2::zero(), 10.0);
        cam.pan_pixels(Vec2::new(10.0, 10.0));
        assert!(close_vec(cam.center(), Vec2::new(-1.0, 1.0)));
    }

    #[test]
    fn zoom_keeps_anchor_fixed() {
        let mut cam = Camera::new(Viewport::new(100.0, 100.0));
        cam.set_view(Vec2::zero(), 10.0);
        let cursor = Vec2::new(75.0, 25.0);
        let before = cam.canvas_to_scene(cursor);
        cam.zoom_at(cursor, 2.0);
        let after = cam.canvas_to_scene(cursor);
        assert!(close_vec(before, after));
        assert!(close(cam.width(), 5.0));
    }
}
