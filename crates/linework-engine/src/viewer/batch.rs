use std::collections::VecDeque;
use std::sync::Arc;

use super::block::BlockRegistry;
use super::color_resolver::{ColorResolver, ColorSource};
use super::graph::{InstanceSlice, PrimitiveDesc, PrimitiveGeometry, PrimitiveKind};
use super::layer::{LayerId, LayerRegistry};
use super::material::MaterialCache;
use super::ViewerError;
use crate::scene::{
    BatchDescriptor, BatchKey, BufferKind, BufferRange, GeometryType, InstanceType, MaterialKey,
    SceneBuffers,
};

/// Indexed geometry slice. Indices address the chunk's own vertices.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct Chunk {
    vertices: BufferRange,
    indices: BufferRange,
}

/// A group of same-key primitives over the shared scene buffers.
///
/// Holds ranges, never copies: every primitive it produces reads the same
/// `Arc<SceneBuffers>` the document was loaded into.
#[derive(Debug)]
pub struct Batch {
    key: BatchKey,
    buffers: Arc<SceneBuffers>,
    layer: Option<LayerId>,
    /// Unindexed geometry, or the dot markers of a point placement.
    vertices: Option<BufferRange>,
    chunks: Vec<Chunk>,
    /// Placement data of an instance batch.
    placements: Option<InstanceSlice>,
}

impl Batch {
    /// Validates `desc` against `buffers` and binds it to its layer.
    pub fn new(
        desc: &BatchDescriptor,
        buffers: &Arc<SceneBuffers>,
        layers: &LayerRegistry,
        point_shape_has_dot: bool,
    ) -> Result<Self, ViewerError> {
        let key = desc.key.clone();
        let invalid = |e: crate::scene::RangeError| {
            ViewerError::InvalidDocument(format!("batch {}: {e}", key.geometry_type))
        };

        let vertices = desc.vertices();
        if let Some(range) = vertices {
            buffers.check(BufferKind::Vertices, range).map_err(invalid)?;
        }

        let mut chunks = Vec::with_capacity(desc.chunks.len());
        for c in &desc.chunks {
            let chunk = Chunk {
                vertices: c.vertices(),
                indices: c.indices(),
            };
            buffers.check(BufferKind::Vertices, chunk.vertices).map_err(invalid)?;
            buffers.check(BufferKind::Indices, chunk.indices).map_err(invalid)?;

            let vertex_count = chunk.vertices.len / 2;
            if let Some(bad) = buffers
                .indices(chunk.indices)
                .iter()
                .find(|&&i| usize::from(i) >= vertex_count)
            {
                return Err(ViewerError::InvalidDocument(format!(
                    "batch {}: index {bad} out of range for chunk of {vertex_count} vertices",
                    key.geometry_type
                )));
            }
            chunks.push(chunk);
        }

        let transforms = desc.transforms();
        if let Some(range) = transforms {
            buffers.check(BufferKind::Transforms, range).map_err(invalid)?;
        }

        let (vertices, placements) = match key.geometry_type {
            GeometryType::PointInstance => (
                vertices.filter(|_| point_shape_has_dot),
                vertices.map(|range| InstanceSlice {
                    mode: InstanceType::Point,
                    range,
                }),
            ),
            GeometryType::BlockInstance => {
                let Some(range) = transforms else {
                    return Err(ViewerError::InvalidDocument(format!(
                        "block placement of {:?} has no transforms",
                        key.block_name
                    )));
                };
                (
                    vertices,
                    Some(InstanceSlice {
                        mode: InstanceType::Full,
                        range,
                    }),
                )
            }
            _ => (vertices, None),
        };

        let layer = key.layer_name.as_deref().and_then(|name| layers.id(name));

        Ok(Self {
            key,
            buffers: buffers.clone(),
            layer,
            vertices,
            chunks,
            placements,
        })
    }

    #[inline]
    pub fn key(&self) -> &BatchKey {
        &self.key
    }

    /// The layer named by the key, if registered.
    #[inline]
    pub fn layer(&self) -> Option<LayerId> {
        self.layer
    }

    /// Number of placements of an instance batch; 0 otherwise.
    pub fn placement_count(&self) -> usize {
        self.placements
            .map_or(0, |p| p.range.len / p.mode.stride().max(1))
    }

    /// True for a block definition batch (geometry that belongs to a block).
    pub fn is_block_definition(&self) -> bool {
        self.key.block_name.is_some() && !self.key.is_instance()
    }

    /// Expands the batch into renderable primitives.
    ///
    /// Placements expand every batch of the referenced block; a missing block
    /// yields nothing. Materials are created in `materials` as needed.
    pub fn create_objects<'a>(
        &'a self,
        env: ExpandEnv<'a>,
        materials: &'a mut MaterialCache,
    ) -> Objects<'a> {
        Objects {
            env,
            materials,
            work: vec![Work::Expand {
                batch: self,
                placement: None,
            }],
            pending: VecDeque::new(),
        }
    }

    fn color_source(&self, layers: &LayerRegistry) -> ColorSource {
        ColorSource::new(self.key.color, self.layer.and_then(|id| layers.color(id)))
    }
}

/// Read-only registries consulted during expansion.
#[derive(Copy, Clone)]
pub struct ExpandEnv<'a> {
    pub blocks: &'a BlockRegistry,
    pub layers: &'a LayerRegistry,
    pub colors: &'a ColorResolver,
}

enum Work<'a> {
    Expand {
        batch: &'a Batch,
        placement: Option<&'a Batch>,
    },
    /// Un-instanced dots of a point placement.
    Dots(&'a Batch),
}

/// Lazy primitive sequence returned by [`Batch::create_objects`].
///
/// Traversal keeps an explicit work stack; block definitions are one level
/// deep, so the stack never holds more than one block's batches.
pub struct Objects<'a> {
    env: ExpandEnv<'a>,
    materials: &'a mut MaterialCache,
    work: Vec<Work<'a>>,
    pending: VecDeque<PrimitiveDesc>,
}

impl<'a> Objects<'a> {
    fn push_placement(&mut self, batch: &'a Batch) {
        let Some(name) = batch.key.block_name.as_deref() else { return };
        let blocks = self.env.blocks;
        let Some(block) = blocks.get(name) else {
            log::debug!("placement of missing block {name:?} skipped");
            return;
        };

        // Dots are drawn after the block content.
        if batch.vertices.is_some() {
            self.work.push(Work::Dots(batch));
        }
        for def in block.batches().iter().rev() {
            self.work.push(Work::Expand {
                batch: def,
                placement: Some(batch),
            });
        }
    }

    fn emit_geometry(&mut self, batch: &'a Batch, placement: Option<&'a Batch>) {
        let kind = match batch.key.geometry_type {
            GeometryType::Points | GeometryType::PointInstance => PrimitiveKind::Points,
            GeometryType::Lines | GeometryType::IndexedLines => PrimitiveKind::Lines,
            GeometryType::Triangles | GeometryType::IndexedTriangles => PrimitiveKind::Triangles,
            // Block placements have no geometry of their own.
            GeometryType::BlockInstance => return,
        };

        let layers = self.env.layers;
        let color = ColorResolver::resolve(
            batch.color_source(layers),
            placement.map(|p| p.color_source(layers)),
        );
        let color = self.env.colors.correct(color);

        let instances = placement.and_then(|p| p.placements);
        let instance_type = instances.map_or(InstanceType::None, |i| i.mode);
        let material_key = match kind {
            PrimitiveKind::Points => MaterialKey::points(instance_type, color),
            PrimitiveKind::Lines | PrimitiveKind::Triangles => {
                MaterialKey::color(instance_type, color)
            }
        };
        let material = self.materials.get_or_create(material_key);

        // The placement's layer wins over the definition's.
        let layer = placement
            .and_then(|p| p.layer)
            .or(batch.layer)
            .or(layers.default_layer());

        let primitive = |vertices, indices| PrimitiveDesc {
            kind,
            geometry: PrimitiveGeometry::new(batch.buffers.clone(), vertices, indices, instances),
            material,
            layer,
        };

        if batch.chunks.is_empty() {
            if let Some(vertices) = batch.vertices.filter(|v| !v.is_empty()) {
                self.pending.push_back(primitive(vertices, None));
            }
        } else {
            for chunk in &batch.chunks {
                self.pending
                    .push_back(primitive(chunk.vertices, Some(chunk.indices)));
            }
        }
    }
}

impl Iterator for Objects<'_> {
    type Item = PrimitiveDesc;

    fn next(&mut self) -> Option<PrimitiveDesc> {
        loop {
            if let Some(p) = self.pending.pop_front() {
                return Some(p);
            }
            match self.work.pop()? {
                Work::Expand { batch, placement } if batch.key.is_instance() => {
                    debug_assert!(placement.is_none(), "block definitions must not place blocks");
                    if placement.is_some() {
                        log::debug!("nested placement of {:?} skipped", batch.key.block_name);
                        continue;
                    }
                    self.push_placement(batch);
                }
                Work::Expand { batch, placement } => self.emit_geometry(batch, placement),
                Work::Dots(batch) => self.emit_geometry(batch, None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paint::Rgb;
    use crate::scene::{KeyColor, SceneDocument};
    use crate::viewer::color_resolver::ColorCorrection;
    use crate::viewer::fixtures::{rgb, translate, SceneBuilder};
    use crate::viewer::model::SceneModel;

    struct Expanded {
        model: SceneModel,
        materials: MaterialCache,
        primitives: Vec<PrimitiveDesc>,
    }

    fn expand(doc: SceneDocument) -> Expanded {
        let colors = ColorResolver::new(Rgb::BLACK, ColorCorrection::Off);
        let (model, top_level) = SceneModel::build(doc).unwrap();
        let mut materials = MaterialCache::new(2.0);
        let mut primitives = Vec::new();
        for batch in &top_level {
            let env = ExpandEnv {
                blocks: &model.blocks,
                layers: &model.layers,
                colors: &colors,
            };
            primitives.extend(batch.create_objects(env, &mut materials));
        }
        Expanded {
            model,
            materials,
            primitives,
        }
    }

    impl Expanded {
        fn color_of(&self, p: &PrimitiveDesc) -> Rgb {
            self.materials.get(p.material).unwrap().color
        }

        fn layer_name(&self, p: &PrimitiveDesc) -> Option<&str> {
            p.layer
                .and_then(|id| self.model.layers.get(id))
                .map(|l| l.name.as_str())
        }
    }

    // ── direct geometry ──────────────────────────────────────────────────

    #[test]
    fn unindexed_batch_yields_one_primitive() {
        let doc = SceneBuilder::new()
            .layer("a", 0xff0000)
            .lines(Some("a"), None, rgb(0x00ff00))
            .build();
        let out = expand(doc);
        assert_eq!(out.primitives.len(), 1);
        let p = &out.primitives[0];
        assert_eq!(p.kind, PrimitiveKind::Lines);
        assert_eq!(p.geometry.vertex_count(), 2);
        assert_eq!(p.geometry.instance_type(), InstanceType::None);
        assert_eq!(out.color_of(p), Rgb(0x00ff00));
        assert_eq!(out.layer_name(p), Some("a"));
    }

    #[test]
    fn chunked_batch_yields_one_primitive_per_chunk() {
        let tri: &[f32] = &[0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
        let doc = SceneBuilder::new()
            .indexed(
                GeometryType::IndexedTriangles,
                None,
                None,
                rgb(0x808080),
                &[(tri, &[0, 1, 2]), (tri, &[2, 1, 0]), (tri, &[0, 2, 1])],
            )
            .build();
        let out = expand(doc);
        assert_eq!(out.primitives.len(), 3);
        assert!(out.primitives.iter().all(|p| p.kind == PrimitiveKind::Triangles));
        assert_eq!(out.primitives[1].geometry.indices(), Some(&[2u16, 1, 0][..]));
    }

    #[test]
    fn primitives_share_the_document_buffers() {
        let doc = SceneBuilder::new().lines(None, None, rgb(1)).build();
        let out = expand(doc);
        assert!(out.primitives[0].geometry.shares(&out.model.buffers));
    }

    #[test]
    fn unknown_layer_falls_back_to_default() {
        let doc = SceneBuilder::new()
            .layer("0", 0xffffff)
            .layer("a", 0xff0000)
            .lines(Some("nope"), None, rgb(1))
            .build();
        let out = expand(doc);
        assert_eq!(out.layer_name(&out.primitives[0]), Some("0"));
    }

    // ── block placements ─────────────────────────────────────────────────

    #[test]
    fn placements_yield_n_times_m_primitives() {
        const N: usize = 3;
        const M: usize = 4;

        let mut b = SceneBuilder::new().layer("0", 0xffffff).layer("p", 0x00ff00);
        for i in 0..N {
            b = b.lines(Some("0"), Some("door"), rgb(0x100 + i as u32));
        }
        for j in 0..M {
            b = b.place_block(
                "door",
                Some("p"),
                rgb(0x10 + j as u32),
                &[translate(j as f32, 0.0), translate(0.0, j as f32)],
            );
        }
        let out = expand(b.build());

        assert_eq!(out.model.blocks["door"].batches().len(), N);
        assert_eq!(out.primitives.len(), N * M);
        for p in &out.primitives {
            assert_eq!(p.geometry.instance_type(), InstanceType::Full);
            assert_eq!(p.geometry.instance_count(), 2);
            assert_eq!(out.layer_name(p), Some("p"));
        }
    }

    #[test]
    fn missing_block_yields_nothing() {
        let doc = SceneBuilder::new()
            .place_block("ghost", None, rgb(1), &[translate(0.0, 0.0)])
            .place_points("ghost", None, rgb(1), &[[1.0, 1.0]])
            .point_dots()
            .build();
        let out = expand(doc);
        assert!(out.primitives.is_empty());
        assert!(out.materials.is_empty());
    }

    #[test]
    fn definition_batches_are_not_drawn_directly() {
        let doc = SceneBuilder::new().lines(None, Some("b"), rgb(1)).build();
        let out = expand(doc);
        assert!(out.primitives.is_empty());
        assert_eq!(out.model.blocks.len(), 1);
    }

    #[test]
    fn placement_resolves_indirect_colors() {
        let doc = SceneBuilder::new()
            .layer("def", 0x0000aa)
            .layer("ins", 0x00aa00)
            .lines(Some("def"), Some("b"), KeyColor::ByBlock)
            .lines(Some("def"), Some("b"), KeyColor::ByLayer)
            .lines(Some("def"), Some("b"), rgb(0xaa0000))
            .place_block("b", Some("ins"), rgb(0x123456), &[translate(0.0, 0.0)])
            .build();
        let out = expand(doc);
        let colors: Vec<Rgb> = out.primitives.iter().map(|p| out.color_of(p)).collect();
        assert_eq!(colors, vec![Rgb(0x123456), Rgb(0x00aa00), Rgb(0xaa0000)]);
    }

    #[test]
    fn by_layer_definition_uses_own_layer_when_placement_has_none() {
        let doc = SceneBuilder::new()
            .layer("def", 0x0000aa)
            .lines(Some("def"), Some("b"), KeyColor::ByLayer)
            .place_block("b", None, rgb(0x123456), &[translate(0.0, 0.0)])
            .build();
        let out = expand(doc);
        assert_eq!(out.color_of(&out.primitives[0]), Rgb(0x0000aa));
        assert_eq!(out.layer_name(&out.primitives[0]), Some("def"));
    }

    #[test]
    fn identical_resolved_colors_share_materials() {
        let doc = SceneBuilder::new()
            .lines(None, Some("b"), KeyColor::ByBlock)
            .place_block("b", None, rgb(0xff), &[translate(0.0, 0.0)])
            .place_block("b", Some("x"), rgb(0xff), &[translate(1.0, 0.0)])
            .lines(None, None, rgb(0xff))
            .build();
        let out = expand(doc);
        assert_eq!(out.primitives.len(), 3);
        assert_eq!(out.primitives[0].material, out.primitives[1].material);
        // Plain geometry uses the non-instanced template.
        assert_ne!(out.primitives[0].material, out.primitives[2].material);
        assert_eq!(out.materials.len(), 2);
    }

    // ── point placements ─────────────────────────────────────────────────

    #[test]
    fn point_placements_translate_and_optionally_dot() {
        let positions = [[0.0, 0.0], [5.0, 5.0], [9.0, 1.0]];
        let build = |dots: bool| {
            let b = SceneBuilder::new()
                .lines(None, Some("shape"), rgb(0xff0000))
                .place_points("shape", None, rgb(0x00ff00), &positions);
            if dots { b.point_dots().build() } else { b.build() }
        };

        let plain = expand(build(false));
        assert_eq!(plain.primitives.len(), 1);
        let shape = &plain.primitives[0];
        assert_eq!(shape.geometry.instance_type(), InstanceType::Point);
        assert_eq!(shape.geometry.instance_count(), 3);
        assert_eq!(shape.geometry.instances(), &[0.0, 0.0, 5.0, 5.0, 9.0, 1.0]);

        let dotted = expand(build(true));
        assert_eq!(dotted.primitives.len(), 2);
        let dots = &dotted.primitives[1];
        assert_eq!(dots.kind, PrimitiveKind::Points);
        assert_eq!(dots.geometry.instance_type(), InstanceType::None);
        assert_eq!(dots.geometry.vertex_count(), 3);
        assert_eq!(dotted.color_of(dots), Rgb(0x00ff00));
        assert_eq!(
            dotted.materials.get(dots.material).unwrap().key.geometry_type,
            Some(GeometryType::Points)
        );
    }

    #[test]
    fn placements_stay_top_level() {
        let doc = SceneBuilder::new()
            .lines(None, Some("inner"), rgb(1))
            .place_block("inner", None, rgb(2), &[translate(0.0, 0.0)])
            .build();
        let (model, top_level) = SceneModel::build(doc).unwrap();
        assert_eq!(top_level.len(), 1);
        assert_eq!(top_level[0].placement_count(), 1);
        assert_eq!(model.blocks["inner"].batches().len(), 1);
    }

    // ── validation ───────────────────────────────────────────────────────

    #[test]
    fn out_of_range_descriptor_is_invalid() {
        let doc = SceneBuilder::new()
            .batch(
                crate::scene::BatchDescriptor::new(BatchKey::new(None, None, GeometryType::Lines, rgb(1)))
                    .with_vertices(0, 4),
            )
            .build();
        let err = SceneModel::build(doc).unwrap_err();
        assert!(matches!(err, ViewerError::InvalidDocument(_)), "{err}");
    }

    #[test]
    fn index_past_chunk_vertices_is_invalid() {
        let doc = SceneBuilder::new()
            .indexed(GeometryType::IndexedLines, None, None, rgb(1), &[(&[0.0, 0.0, 1.0, 1.0], &[0, 2])])
            .build();
        let err = SceneModel::build(doc).unwrap_err();
        assert!(err.to_string().contains("index 2"), "{err}");
    }

    #[test]
    fn block_placement_without_transforms_is_invalid() {
        let doc = SceneBuilder::new()
            .batch(crate::scene::BatchDescriptor::new(BatchKey::new(
                None,
                Some("b"),
                GeometryType::BlockInstance,
                rgb(1),
            )))
            .build();
        assert!(SceneModel::build(doc).is_err());
    }
}
