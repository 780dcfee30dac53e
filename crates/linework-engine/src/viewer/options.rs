use serde::Deserialize;

use crate::paint::Rgb;

/// Viewer construction options.
///
/// Every field has a default, so a partial JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerOptions {
    /// Initial canvas size in physical pixels.
    pub canvas_width: u32,
    pub canvas_height: u32,

    /// Background color. Also the reference for contrast correction.
    pub clear_color: Rgb,
    pub clear_alpha: f32,

    /// Request multisampling when the context supports it.
    pub antialias: bool,

    /// Adjust colors whose contrast against the background is too low.
    pub color_correction: bool,

    /// Flip pure white/black when it would vanish against the background.
    /// Ignored when `color_correction` is set, which already covers it.
    pub black_white_inversion: bool,

    /// Point primitive size in pixels. Backends without sized points draw 1px.
    pub point_size: f32,

    /// Keep the last frame readable after presentation.
    pub preserve_drawing_buffer: bool,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            canvas_width: 400,
            canvas_height: 300,
            clear_color: Rgb::BLACK,
            clear_alpha: 1.0,
            antialias: true,
            color_correction: false,
            black_white_inversion: true,
            point_size: 2.0,
            preserve_drawing_buffer: false,
        }
    }
}

impl ViewerOptions {
    /// Canvas aspect ratio (width / height). Zero height yields 1.
    pub fn aspect(&self) -> f64 {
        if self.canvas_height == 0 {
            1.0
        } else {
            f64::from(self.canvas_width) / f64::from(self.canvas_height)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let opts: ViewerOptions =
            serde_json::from_str(r#"{"clearColor": 16777215, "colorCorrection": true}"#).unwrap();
        assert_eq!(opts.clear_color, Rgb::WHITE);
        assert!(opts.color_correction);
        assert_eq!(opts.canvas_width, 400);
        assert_eq!(opts.point_size, 2.0);
        assert!(opts.black_white_inversion);
    }

    #[test]
    fn aspect_guards_zero_height() {
        let mut opts = ViewerOptions::default();
        assert!((opts.aspect() - 4.0 / 3.0).abs() < 1e-12);
        opts.canvas_height = 0;
        assert_eq!(opts.aspect(), 1.0);
    }
}
