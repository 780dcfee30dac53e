use std::sync::Arc;

use super::layer::LayerId;
use super::material::MaterialId;
use crate::scene::{BufferRange, InstanceType, SceneBuffers};

/// Handle of a primitive in the render graph. Never reused.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct PrimitiveId(u64);

impl PrimitiveId {
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[cfg(test)]
    pub(crate) const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

/// Topology of a primitive.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PrimitiveKind {
    Points,
    /// Independent segments, two vertices each.
    Lines,
    Triangles,
}

/// Per-instance data of an instanced primitive.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct InstanceSlice {
    pub mode: InstanceType,
    pub range: BufferRange,
}

/// Geometry of one primitive: ranges into the shared scene buffers.
///
/// Cloning shares the buffers.
#[derive(Debug, Clone)]
pub struct PrimitiveGeometry {
    buffers: Arc<SceneBuffers>,
    vertices: BufferRange,
    indices: Option<BufferRange>,
    instances: Option<InstanceSlice>,
}

impl PrimitiveGeometry {
    pub(crate) fn new(
        buffers: Arc<SceneBuffers>,
        vertices: BufferRange,
        indices: Option<BufferRange>,
        instances: Option<InstanceSlice>,
    ) -> Self {
        Self {
            buffers,
            vertices,
            indices,
            instances,
        }
    }

    /// Interleaved `(x, y)` pairs.
    #[inline]
    pub fn vertices(&self) -> &[f32] {
        self.buffers.vertices(self.vertices)
    }

    #[inline]
    pub fn indices(&self) -> Option<&[u16]> {
        self.indices.map(|r| self.buffers.indices(r))
    }

    pub fn instance_type(&self) -> InstanceType {
        self.instances.map_or(InstanceType::None, |i| i.mode)
    }

    /// Packed instance data; empty for plain geometry.
    pub fn instances(&self) -> &[f32] {
        match self.instances {
            Some(InstanceSlice { mode: InstanceType::Full, range }) => self.buffers.transforms(range),
            // Point placements live in the vertex buffer.
            Some(InstanceSlice { mode: InstanceType::Point, range }) => self.buffers.vertices(range),
            Some(InstanceSlice { mode: InstanceType::None, .. }) | None => &[],
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> u32 {
        (self.vertices.len / 2) as u32
    }

    #[inline]
    pub fn index_count(&self) -> Option<u32> {
        self.indices.map(|r| r.len as u32)
    }

    /// Number of draws of the geometry; 1 when not instanced.
    pub fn instance_count(&self) -> u32 {
        match self.instances {
            Some(InstanceSlice { mode, range }) if mode.stride() > 0 => (range.len / mode.stride()) as u32,
            _ => 1,
        }
    }

    /// True if this geometry reads from `buffers`.
    pub fn shares(&self, buffers: &Arc<SceneBuffers>) -> bool {
        Arc::ptr_eq(&self.buffers, buffers)
    }
}

/// A primitive as produced by batch expansion, before it joins the graph.
#[derive(Debug, Clone)]
pub struct PrimitiveDesc {
    pub kind: PrimitiveKind,
    pub geometry: PrimitiveGeometry,
    pub material: MaterialId,
    pub layer: Option<LayerId>,
}

/// A drawable primitive.
///
/// Primitives carry no bounding volume and are never culled: the whole
/// document is framed through the camera instead.
#[derive(Debug, Clone)]
pub struct Primitive {
    pub id: PrimitiveId,
    pub kind: PrimitiveKind,
    pub geometry: PrimitiveGeometry,
    pub material: MaterialId,
    pub layer: Option<LayerId>,
    pub visible: bool,
}

/// Flat list of primitives, drawn in insertion order.
#[derive(Debug, Default)]
pub struct RenderGraph {
    primitives: Vec<Primitive>,
    /// Id of `primitives[0]`.
    first_id: u64,
}

impl RenderGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, desc: PrimitiveDesc) -> PrimitiveId {
        let id = PrimitiveId(self.first_id + self.primitives.len() as u64);
        self.primitives.push(Primitive {
            id,
            kind: desc.kind,
            geometry: desc.geometry,
            material: desc.material,
            layer: desc.layer,
            visible: true,
        });
        id
    }

    pub fn get(&self, id: PrimitiveId) -> Option<&Primitive> {
        let idx = id.0.checked_sub(self.first_id)?;
        self.primitives.get(usize::try_from(idx).ok()?)
    }

    fn get_mut(&mut self, id: PrimitiveId) -> Option<&mut Primitive> {
        let idx = id.0.checked_sub(self.first_id)?;
        self.primitives.get_mut(usize::try_from(idx).ok()?)
    }

    /// Returns false for an unknown id.
    pub fn set_visible(&mut self, id: PrimitiveId, visible: bool) -> bool {
        match self.get_mut(id) {
            Some(p) => {
                p.visible = visible;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Primitive> {
        self.primitives.iter()
    }

    pub fn visible(&self) -> impl Iterator<Item = &Primitive> {
        self.primitives.iter().filter(|p| p.visible)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Removes every primitive, returning them for GPU release.
    pub fn clear(&mut self) -> Vec<Primitive> {
        self.first_id += self.primitives.len() as u64;
        std::mem::take(&mut self.primitives)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn material_id() -> MaterialId {
        let mut cache = crate::viewer::MaterialCache::new(1.0);
        cache.get_or_create(crate::scene::MaterialKey::color(InstanceType::None, crate::paint::Rgb(0)))
    }

    fn geometry(buffers: &Arc<SceneBuffers>, instances: Option<InstanceSlice>) -> PrimitiveGeometry {
        PrimitiveGeometry::new(buffers.clone(), BufferRange::new(0, 4), None, instances)
    }

    #[test]
    fn instance_counts_follow_stride() {
        let buffers = Arc::new(SceneBuffers {
            vertices: vec![0.0; 8],
            indices: vec![],
            transforms: vec![0.0; 12],
        });
        let full = geometry(&buffers, Some(InstanceSlice { mode: InstanceType::Full, range: BufferRange::new(0, 12) }));
        assert_eq!(full.instance_count(), 2);
        assert_eq!(full.instances().len(), 12);

        let point = geometry(&buffers, Some(InstanceSlice { mode: InstanceType::Point, range: BufferRange::new(0, 8) }));
        assert_eq!(point.instance_count(), 4);
        assert_eq!(point.vertex_count(), 2);

        let plain = geometry(&buffers, None);
        assert_eq!(plain.instance_count(), 1);
        assert!(plain.instances().is_empty());
        assert!(plain.shares(&buffers));
    }

    #[test]
    fn ids_survive_clear_without_reuse() {
        let buffers = Arc::new(SceneBuffers::default());
        let desc = PrimitiveDesc {
            kind: PrimitiveKind::Lines,
            geometry: geometry(&buffers, None),
            material: material_id(),
            layer: None,
        };

        let mut graph = RenderGraph::new();
        let a = graph.add(desc.clone());
        let b = graph.add(desc.clone());
        assert!(graph.set_visible(b, false));
        assert_eq!(graph.visible().count(), 1);

        let removed = graph.clear();
        assert_eq!(removed.len(), 2);
        assert!(graph.get(a).is_none());

        let c = graph.add(desc);
        assert!(c > b);
        assert!(graph.get(c).is_some());
        assert!(!graph.set_visible(a, true));
    }
}
