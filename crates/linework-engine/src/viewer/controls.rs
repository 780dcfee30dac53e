use super::camera::Camera;
use crate::coords::Vec2;
use crate::input::{InputEvent, MouseButton, MouseButtonState, MouseWheelDelta, PointerButtonEvent, PointerMoveEvent};

/// Wheel zoom base: one wheel step magnifies by `1 / ZOOM_BASE`.
const ZOOM_BASE: f64 = 0.95;

/// Pixel deltas per wheel "line" for high-precision wheels.
const PIXELS_PER_LINE: f64 = 50.0;

/// Pan (left drag) and zoom (wheel) for a 2D camera.
///
/// Only camera state is touched, so events may arrive between draws.
#[derive(Debug, Clone)]
pub struct PanZoomControls {
    pub zoom_speed: f64,
    pointer: Option<Vec2>,
    dragging: bool,
}

impl Default for PanZoomControls {
    fn default() -> Self {
        Self {
            zoom_speed: 1.0,
            pointer: None,
            dragging: false,
        }
    }
}

impl PanZoomControls {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Applies `event` to `camera`. Returns true if the view changed.
    pub fn handle(&mut self, camera: &mut Camera, event: &InputEvent) -> bool {
        match event {
            InputEvent::PointerMoved(PointerMoveEvent { x, y }) => {
                let pos = Vec2::new(f64::from(*x), f64::from(*y));
                let last = self.pointer.replace(pos);
                match last {
                    Some(last) if self.dragging && pos != last => {
                        camera.pan_pixels(pos - last);
                        true
                    }
                    _ => false,
                }
            }

            InputEvent::PointerButton(PointerButtonEvent {
                button: MouseButton::Left,
                state,
                x,
                y,
                ..
            }) => {
                self.pointer = Some(Vec2::new(f64::from(*x), f64::from(*y)));
                self.dragging = *state == MouseButtonState::Pressed;
                false
            }

            InputEvent::MouseWheel { delta, .. } => {
                let steps = match *delta {
                    MouseWheelDelta::Line { y, .. } => f64::from(y),
                    MouseWheelDelta::Pixel { y, .. } => f64::from(y) / PIXELS_PER_LINE,
                };
                if steps == 0.0 {
                    return false;
                }
                let anchor = self.pointer.unwrap_or_else(|| {
                    let vp = camera.viewport();
                    Vec2::new(vp.width / 2.0, vp.height / 2.0)
                });
                camera.zoom_at(anchor, ZOOM_BASE.powf(-steps * self.zoom_speed));
                true
            }

            InputEvent::PointerLeft | InputEvent::Focused(false) => {
                self.dragging = false;
                if matches!(event, InputEvent::PointerLeft) {
                    self.pointer = None;
                }
                false
            }

            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Viewport;
    use crate::input::Modifiers;

    fn camera() -> Camera {
        let mut cam = Camera::new(Viewport::new(100.0, 100.0));
        cam.set_view(Vec2::zero(), 10.0);
        cam
    }

    fn moved(x: f32, y: f32) -> InputEvent {
        InputEvent::PointerMoved(PointerMoveEvent { x, y })
    }

    fn left(state: MouseButtonState, x: f32, y: f32) -> InputEvent {
        InputEvent::PointerButton(PointerButtonEvent {
            button: MouseButton::Left,
            state,
            x,
            y,
            modifiers: Modifiers::default(),
        })
    }

    #[test]
    fn hover_does_not_pan() {
        let mut cam = camera();
        let mut controls = PanZoomControls::new();
        assert!(!controls.handle(&mut cam, &moved(10.0, 10.0)));
        assert!(!controls.handle(&mut cam, &moved(20.0, 10.0)));
        assert_eq!(cam.center(), Vec2::zero());
    }

    #[test]
    fn left_drag_pans() {
        let mut cam = camera();
        let mut controls = PanZoomControls::new();
        controls.handle(&mut cam, &left(MouseButtonState::Pressed, 50.0, 50.0));
        assert!(controls.handle(&mut cam, &moved(60.0, 50.0)));
        assert_eq!(cam.center(), Vec2::new(-1.0, 0.0));
        controls.handle(&mut cam, &left(MouseButtonState::Released, 60.0, 50.0));
        assert!(!controls.handle(&mut cam, &moved(80.0, 50.0)));
        assert!(!controls.is_dragging());
    }

    #[test]
    fn wheel_up_zooms_in_about_cursor() {
        let mut cam = camera();
        let mut controls = PanZoomControls::new();
        controls.handle(&mut cam, &moved(100.0, 0.0));
        let wheel = InputEvent::MouseWheel {
            delta: MouseWheelDelta::Line { x: 0.0, y: 1.0 },
            modifiers: Modifiers::default(),
        };
        assert!(controls.handle(&mut cam, &wheel));
        assert!((cam.width() - 10.0 * ZOOM_BASE).abs() < 1e-9);
        let corner = cam.canvas_to_scene(Vec2::new(100.0, 0.0));
        assert!((corner.x - 5.0).abs() < 1e-9 && (corner.y - 5.0).abs() < 1e-9);
    }

    #[test]
    fn leaving_the_canvas_ends_drag() {
        let mut cam = camera();
        let mut controls = PanZoomControls::new();
        controls.handle(&mut cam, &left(MouseButtonState::Pressed, 0.0, 0.0));
        controls.handle(&mut cam, &InputEvent::PointerLeft);
        assert!(!controls.is_dragging());
    }
}
