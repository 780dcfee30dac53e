//! Color model shared between the viewer and renderers.
//!
//! Scope:
//! - packed `0xRRGGBB` colors as they arrive from the parser
//! - sRGB / linear conversion for GPU uniforms
//! - relative luminance, contrast ratio and lightness adjustment used for
//!   background-contrast correction

pub mod color;
pub mod contrast;

pub use color::Rgb;
pub use contrast::{contrast_ratio, darken, lighten, luminance};
