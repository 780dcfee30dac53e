//! Coordinate and geometry types shared by the viewer and renderers.
//!
//! Canonical spaces:
//! - scene space: drawing units, +X right, +Y up, relative to the document origin
//! - canvas space: pixels, origin top-left, +Y down
//!
//! The camera maps between the two; renderers only ever see scene space.

mod bounds;
mod vec2;
mod viewport;

pub use bounds::Bounds;
pub use vec2::Vec2;
pub use viewport::Viewport;
