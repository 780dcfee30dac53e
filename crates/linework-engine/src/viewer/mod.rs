//! Scene viewer.
//!
//! A [`Viewer`] turns a [`SceneDocument`](crate::scene::SceneDocument) into
//! layers, blocks and batches, expands batches into primitives over the shared
//! scene buffers, and draws them through a
//! [`RenderSurface`](crate::render::RenderSurface).

mod batch;
mod block;
mod camera;
mod color_resolver;
mod controls;
mod error;
mod events;
mod graph;
mod layer;
mod lifecycle;
mod material;
mod model;
mod options;
mod worker;

#[cfg(test)]
mod fixtures;

pub use batch::{Batch, ExpandEnv, Objects};
pub use block::{Block, BlockRegistry};
pub use camera::{Camera, DEFAULT_FIT_PADDING};
pub use color_resolver::{ColorCorrection, ColorResolver, ColorSource};
pub use controls::PanZoomControls;
pub use error::ViewerError;
pub use events::{EventKind, MessageLevel, PointerEvent, SubscriptionId, UnknownEvent, ViewerEvent};
pub use graph::{
    InstanceSlice, Primitive, PrimitiveDesc, PrimitiveGeometry, PrimitiveId, PrimitiveKind,
    RenderGraph,
};
pub use layer::{Layer, LayerId, LayerInfo, LayerRegistry, DEFAULT_LAYER_NAME};
pub use lifecycle::{Viewer, ViewerState};
pub use material::{Material, MaterialCache, MaterialId};
pub use options::ViewerOptions;
pub use worker::{
    LoadRequest, ParseContext, ParseRequest, Progress, ProgressCallback, ProgressPhase,
    SceneParser, SceneWorker,
};
