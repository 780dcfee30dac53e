//! Scene document types.
//!
//! Responsibilities:
//! - decode the parser's output (layers, batch descriptors, flat buffers)
//! - define the composite keys used to group batches and cache materials
//! - hand out bounds-checked, zero-copy ranges into the shared buffers

mod document;
mod key;
mod material_key;

pub use document::{
    BatchDescriptor, BufferKind, BufferRange, ChunkDescriptor, LayerDescriptor, RangeError,
    SceneBuffers, SceneDocument,
};
pub use key::{BatchKey, GeometryType, InstanceType, KeyColor, UnknownGeometryType};
pub use material_key::MaterialKey;
