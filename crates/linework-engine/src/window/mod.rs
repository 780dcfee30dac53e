//! Window runtime.
//!
//! Owns the `winit` event loop and hosts one [`Viewer`](crate::viewer::Viewer)
//! per window.

mod runtime;
mod translate;

pub use runtime::{Runtime, RuntimeConfig, RuntimeCtx, ViewerApp};
