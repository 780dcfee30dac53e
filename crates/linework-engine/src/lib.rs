//! Linework engine crate.
//!
//! Batches a pre-parsed 2D vector drawing (layers, blocks, colored line,
//! point and triangle primitives) into instanced draw calls, and hosts the
//! result in a pan/zoom viewer on top of wgpu and winit.

pub mod device;
pub mod window;
pub mod input;

pub mod logging;
pub mod coords;
pub mod paint;
pub mod cache;
pub mod scene;
pub mod render;
pub mod viewer;
