use crate::cache::OrderedKeyedCache;
use crate::paint::Rgb;
use crate::scene::{GeometryType, InstanceType, MaterialKey};

/// Handle of a cached material, stable until the cache is cleared.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct MaterialId(u32);

impl MaterialId {
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Flat color material.
///
/// The shader is picked by `key.instance_type` and the primitive topology;
/// a material only contributes its uniforms.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub id: MaterialId,
    pub key: MaterialKey,
    /// Corrected color, as drawn.
    pub color: Rgb,
    /// Set for point materials.
    pub point_size: Option<f32>,
}

impl Material {
    #[inline]
    pub fn instance_type(&self) -> InstanceType {
        self.key.instance_type
    }
}

/// Material cache keyed by [`MaterialKey`].
///
/// Equal keys always yield the same material, so no duplicate GPU state is
/// created for a color/instancing combination.
pub struct MaterialCache {
    entries: OrderedKeyedCache<MaterialKey, Material>,
    /// Key of each live id, indexed by `id - first_id`.
    keys: Vec<MaterialKey>,
    first_id: u32,
    point_size: f32,
}

impl MaterialCache {
    pub fn new(point_size: f32) -> Self {
        Self {
            entries: OrderedKeyedCache::default(),
            keys: Vec::new(),
            first_id: 0,
            point_size,
        }
    }

    /// Returns the material for `key`, creating it on first use.
    pub fn get_or_create(&mut self, key: MaterialKey) -> MaterialId {
        if let Some(m) = self.entries.find(&key) {
            return m.id;
        }

        let id = MaterialId(self.first_id + self.keys.len() as u32);
        let material = Material {
            id,
            key,
            color: key.color,
            point_size: (key.geometry_type == Some(GeometryType::Points)).then_some(self.point_size),
        };
        // Lookup above missed, so the key is new.
        if self.entries.insert(key, material).is_ok() {
            self.keys.push(key);
        }
        id
    }

    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        let idx = id.0.checked_sub(self.first_id)? as usize;
        self.keys.get(idx).and_then(|k| self.entries.find(k))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every material and returns the ids for GPU release, in key order.
    ///
    /// Ids are not reused by later loads.
    pub fn clear(&mut self) -> Vec<MaterialId> {
        let mut released = Vec::with_capacity(self.entries.len());
        self.entries.each(|_, m| released.push(m.id));
        self.first_id += self.keys.len() as u32;
        self.keys.clear();
        self.entries.clear();
        released
    }
}
