use std::sync::Arc;

use super::batch::Batch;
use super::block::BlockRegistry;
use super::layer::LayerRegistry;
use super::ViewerError;
use crate::coords::{Bounds, Vec2};
use crate::scene::{BufferKind, SceneBuffers, SceneDocument};

/// Registries built from one loaded document.
#[derive(Debug, Default)]
pub(crate) struct SceneModel {
    pub origin: Option<Vec2>,
    pub bounds: Option<Bounds>,
    pub buffers: Arc<SceneBuffers>,
    pub layers: LayerRegistry,
    pub blocks: BlockRegistry,
    pub has_missing_chars: bool,
}

impl SceneModel {
    /// Builds layers and blocks, and returns the top-level batches to expand.
    ///
    /// Every block is complete before this returns, so placements can be
    /// expanded in any order afterwards.
    pub fn build(doc: SceneDocument) -> Result<(Self, Vec<Batch>), ViewerError> {
        let layers = LayerRegistry::from_document(&doc);
        let buffers = Arc::new(doc.buffers);
        let mut blocks = BlockRegistry::new();
        let mut top_level = Vec::new();

        for desc in &doc.batches {
            let batch = Batch::new(desc, &buffers, &layers, doc.point_shape_has_dot)?;
            match desc.key.block_name.as_deref() {
                Some(name) if batch.is_block_definition() => {
                    blocks.entry(name.to_owned()).or_default().push_batch(batch);
                }
                _ => top_level.push(batch),
            }
        }

        log::info!(
            "scene: {} batches, {} layers, {} blocks, {} vertex floats, {} indices, {} transform floats, {} B",
            doc.batches.len(),
            layers.len(),
            blocks.len(),
            buffers.len_of(BufferKind::Vertices),
            buffers.len_of(BufferKind::Indices),
            buffers.len_of(BufferKind::Transforms),
            buffers.byte_len(),
        );

        let model = Self {
            origin: Some(doc.origin),
            bounds: doc.bounds,
            buffers,
            layers,
            blocks,
            has_missing_chars: doc.has_missing_chars,
        };
        Ok((model, top_level))
    }

    /// Bounds relative to the origin, in the coordinates the buffers use.
    pub fn local_bounds(&self) -> Option<Bounds> {
        let bounds = self.bounds?;
        Some(bounds.relative_to(self.origin.unwrap_or_default()))
    }
}
