//! Document builder for tests.

use crate::coords::{Bounds, Vec2};
use crate::paint::Rgb;
use crate::scene::{
    BatchDescriptor, BatchKey, ChunkDescriptor, GeometryType, KeyColor, LayerDescriptor,
    SceneDocument,
};

#[derive(Default)]
pub(crate) struct SceneBuilder {
    doc: SceneDocument,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn origin(mut self, x: f64, y: f64) -> Self {
        self.doc.origin = Vec2::new(x, y);
        self
    }

    pub fn bounds(mut self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        self.doc.bounds = Some(Bounds::new(min_x, min_y, max_x, max_y));
        self
    }

    pub fn layer(mut self, name: &str, color: u32) -> Self {
        self.doc.layers.push(LayerDescriptor::new(name, Rgb(color)));
        self
    }

    pub fn point_dots(mut self) -> Self {
        self.doc.point_shape_has_dot = true;
        self
    }

    pub fn missing_chars(mut self) -> Self {
        self.doc.has_missing_chars = true;
        self
    }

    fn push_vertices(&mut self, vertices: &[f32]) -> (usize, usize) {
        let offset = self.doc.buffers.vertices.len();
        self.doc.buffers.vertices.extend_from_slice(vertices);
        (offset, vertices.len())
    }

    /// Unindexed geometry batch.
    pub fn geometry(
        mut self,
        geometry_type: GeometryType,
        layer: Option<&str>,
        block: Option<&str>,
        color: KeyColor,
        vertices: &[f32],
    ) -> Self {
        let (offset, size) = self.push_vertices(vertices);
        let key = BatchKey::new(layer, block, geometry_type, color);
        self.doc.batches.push(BatchDescriptor::new(key).with_vertices(offset, size));
        self
    }

    pub fn lines(self, layer: Option<&str>, block: Option<&str>, color: KeyColor) -> Self {
        self.geometry(GeometryType::Lines, layer, block, color, &[0.0, 0.0, 1.0, 1.0])
    }

    /// Indexed batch split into one chunk per index list.
    pub fn indexed(
        mut self,
        geometry_type: GeometryType,
        layer: Option<&str>,
        block: Option<&str>,
        color: KeyColor,
        chunks: &[(&[f32], &[u16])],
    ) -> Self {
        let key = BatchKey::new(layer, block, geometry_type, color);
        let mut desc = BatchDescriptor::new(key);
        for (vertices, indices) in chunks {
            let (vertices_offset, vertices_size) = self.push_vertices(vertices);
            let indices_offset = self.doc.buffers.indices.len();
            self.doc.buffers.indices.extend_from_slice(indices);
            desc = desc.with_chunk(ChunkDescriptor {
                vertices_offset,
                vertices_size,
                indices_offset,
                indices_size: indices.len(),
            });
        }
        self.doc.batches.push(desc);
        self
    }

    /// Block placements, one affine transform each.
    pub fn place_block(
        mut self,
        block: &str,
        layer: Option<&str>,
        color: KeyColor,
        transforms: &[[f32; 6]],
    ) -> Self {
        let offset = self.doc.buffers.transforms.len();
        for t in transforms {
            self.doc.buffers.transforms.extend_from_slice(t);
        }
        let key = BatchKey::new(layer, Some(block), GeometryType::BlockInstance, color);
        self.doc
            .batches
            .push(BatchDescriptor::new(key).with_transforms(offset, transforms.len() * 6));
        self
    }

    /// Point placements of a point shape block.
    pub fn place_points(
        mut self,
        block: &str,
        layer: Option<&str>,
        color: KeyColor,
        positions: &[[f32; 2]],
    ) -> Self {
        let flat: Vec<f32> = positions.iter().flatten().copied().collect();
        let (offset, size) = self.push_vertices(&flat);
        let key = BatchKey::new(layer, Some(block), GeometryType::PointInstance, color);
        self.doc.batches.push(BatchDescriptor::new(key).with_vertices(offset, size));
        self
    }

    pub fn batch(mut self, desc: BatchDescriptor) -> Self {
        self.doc.batches.push(desc);
        self
    }

    pub fn build(self) -> SceneDocument {
        self.doc
    }
}

/// Translation by `(x, y)`.
pub(crate) fn translate(x: f32, y: f32) -> [f32; 6] {
    [1.0, 0.0, x, 0.0, 1.0, y]
}

pub(crate) fn rgb(hex: u32) -> KeyColor {
    KeyColor::Rgb(Rgb(hex))
}
