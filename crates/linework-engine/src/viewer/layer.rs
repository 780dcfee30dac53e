use std::collections::HashMap;

use super::graph::PrimitiveId;
use crate::paint::Rgb;
use crate::scene::{KeyColor, LayerDescriptor, SceneDocument};

/// Name of the layer every drawing implicitly has.
pub const DEFAULT_LAYER_NAME: &str = "0";

/// Index into a [`LayerRegistry`]. Only valid for the load cycle that created it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct LayerId(u32);

impl LayerId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A drawing layer and the primitives assigned to it.
#[derive(Debug, Clone)]
pub struct Layer {
    pub name: String,
    pub display_name: String,
    /// Stored color, before contrast correction.
    pub color: Rgb,
    /// Lineweights seen on this layer's batches. Only filled for layers
    /// synthesised from batch keys.
    pub lineweights: Vec<i32>,
    objects: Vec<PrimitiveId>,
    visible: bool,
}

impl Layer {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>, color: Rgb) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            color,
            lineweights: Vec::new(),
            objects: Vec::new(),
            visible: true,
        }
    }

    /// Primitives drawn on this layer, in creation order.
    #[inline]
    pub fn objects(&self) -> &[PrimitiveId] {
        &self.objects
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub(crate) fn push_object(&mut self, id: PrimitiveId) {
        self.objects.push(id);
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Forgets every primitive. GPU resources are released by the caller.
    pub(crate) fn dispose(&mut self) -> Vec<PrimitiveId> {
        std::mem::take(&mut self.objects)
    }
}

/// Public description returned by `Viewer::layers`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerInfo {
    pub name: String,
    pub display_name: String,
    /// Color as drawn, after contrast correction.
    pub color: Rgb,
}

/// Layers of the loaded document, in declaration order.
#[derive(Debug, Default)]
pub struct LayerRegistry {
    layers: Vec<Layer>,
    by_name: HashMap<String, LayerId>,
    default: Option<LayerId>,
}

impl LayerRegistry {
    /// Builds the registry for a document.
    ///
    /// Declared layers are taken as-is. Without declarations, one layer is
    /// synthesised per distinct batch layer name (first batch color wins,
    /// lineweights are unioned). Layer "0" is only synthesised when a batch
    /// actually references it.
    ///
    /// The default layer, which receives primitives whose own layer is
    /// unknown, is "0" when registered, otherwise the first layer. A document
    /// with batches but no layers at all gets a registered "0".
    pub fn from_document(doc: &SceneDocument) -> Self {
        let mut reg = Self::default();

        if doc.layers.is_empty() {
            reg.synthesize(doc);
        } else {
            for desc in &doc.layers {
                reg.insert_descriptor(desc);
            }
        }

        reg.default = reg
            .id(DEFAULT_LAYER_NAME)
            .or_else(|| (!reg.layers.is_empty()).then_some(LayerId(0)));

        if reg.default.is_none() && !doc.batches.is_empty() {
            let id = reg.insert(Layer::new(DEFAULT_LAYER_NAME, DEFAULT_LAYER_NAME, Rgb::BLACK));
            reg.default = Some(id);
        }

        reg
    }

    fn synthesize(&mut self, doc: &SceneDocument) {
        let mut references_default = false;

        for batch in &doc.batches {
            let Some(name) = batch.key.layer_name.as_deref() else { continue };
            if name == DEFAULT_LAYER_NAME {
                references_default = true;
                continue;
            }
            let id = match self.id(name) {
                Some(id) => id,
                None => {
                    let color = match batch.key.color {
                        KeyColor::Rgb(c) => c,
                        KeyColor::ByLayer | KeyColor::ByBlock => Rgb::BLACK,
                    };
                    self.insert(Layer::new(name, name, color))
                }
            };
            if let Some(lw) = batch.lineweight {
                let weights = &mut self.layers[id.index()].lineweights;
                if let Err(pos) = weights.binary_search(&lw) {
                    weights.insert(pos, lw);
                }
            }
        }

        if references_default {
            self.insert(Layer::new(DEFAULT_LAYER_NAME, DEFAULT_LAYER_NAME, Rgb::BLACK));
        }

        log::debug!("synthesised {} layers from batch keys", self.layers.len());
    }

    fn insert_descriptor(&mut self, desc: &LayerDescriptor) -> LayerId {
        self.insert(Layer::new(desc.name.clone(), desc.display_name(), desc.color))
    }

    /// Registers a layer. A later layer with an existing name replaces the
    /// name mapping; the earlier entry stays addressable by id.
    pub fn insert(&mut self, layer: Layer) -> LayerId {
        let id = LayerId(self.layers.len() as u32);
        self.by_name.insert(layer.name.clone(), id);
        self.layers.push(layer);
        id
    }

    #[inline]
    pub fn id(&self, name: &str) -> Option<LayerId> {
        self.by_name.get(name).copied()
    }

    #[inline]
    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(id.index())
    }

    #[inline]
    pub fn get_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.get_mut(id.index())
    }

    pub fn by_name(&self, name: &str) -> Option<&Layer> {
        self.id(name).and_then(|id| self.get(id))
    }

    #[inline]
    pub fn default_layer(&self) -> Option<LayerId> {
        self.default
    }

    pub fn color(&self, id: LayerId) -> Option<Rgb> {
        self.get(id).map(|l| l.color)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Layer> {
        self.layers.iter_mut()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn clear(&mut self) {
        self.layers.clear();
        self.by_name.clear();
        self.default = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{BatchDescriptor, BatchKey, GeometryType};

    fn batch(layer: Option<&str>, color: KeyColor) -> BatchDescriptor {
        BatchDescriptor::new(BatchKey::new(layer, None, GeometryType::Lines, color))
    }

    fn names(reg: &LayerRegistry) -> Vec<&str> {
        reg.iter().map(|l| l.name.as_str()).collect()
    }

    // ── declared layers ──────────────────────────────────────────────────

    #[test]
    fn declared_layers_keep_order_and_display_names() {
        let doc = SceneDocument {
            layers: vec![
                LayerDescriptor::new("walls", Rgb(0xff0000)),
                LayerDescriptor {
                    display_name: Some("Doors & windows".into()),
                    ..LayerDescriptor::new("openings", Rgb(0x00ff00))
                },
                LayerDescriptor::new("0", Rgb::WHITE),
            ],
            ..SceneDocument::default()
        };
        let reg = LayerRegistry::from_document(&doc);
        assert_eq!(names(&reg), vec!["walls", "openings", "0"]);
        assert_eq!(reg.by_name("openings").unwrap().display_name, "Doors & windows");
        assert_eq!(reg.default_layer(), reg.id("0"));
    }

    #[test]
    fn declared_without_zero_defaults_to_first() {
        let doc = SceneDocument {
            layers: vec![LayerDescriptor::new("a", Rgb(1)), LayerDescriptor::new("b", Rgb(2))],
            batches: vec![batch(Some("missing"), KeyColor::ByLayer)],
            ..SceneDocument::default()
        };
        let reg = LayerRegistry::from_document(&doc);
        assert_eq!(reg.default_layer(), reg.id("a"));
        assert!(reg.id("0").is_none());
    }

    // ── synthesis from batches ───────────────────────────────────────────

    #[test]
    fn synthesis_skips_zero_unless_referenced() {
        let doc = SceneDocument {
            batches: vec![
                batch(Some("walls"), KeyColor::Rgb(Rgb(0xff0000))),
                batch(None, KeyColor::Rgb(Rgb(0x00ff00))),
                batch(Some("doors"), KeyColor::ByLayer),
            ],
            ..SceneDocument::default()
        };
        let reg = LayerRegistry::from_document(&doc);
        assert_eq!(names(&reg), vec!["walls", "doors"]);
        assert_eq!(reg.by_name("walls").unwrap().color, Rgb(0xff0000));
        assert_eq!(reg.by_name("doors").unwrap().color, Rgb::BLACK);
        assert_eq!(reg.default_layer(), reg.id("walls"));
    }

    #[test]
    fn synthesis_registers_zero_when_referenced() {
        let doc = SceneDocument {
            batches: vec![batch(Some("0"), KeyColor::Rgb(Rgb(0x123456))), batch(Some("a"), KeyColor::ByLayer)],
            ..SceneDocument::default()
        };
        let reg = LayerRegistry::from_document(&doc);
        assert_eq!(names(&reg), vec!["a", "0"]);
        assert_eq!(reg.by_name("0").unwrap().color, Rgb::BLACK);
        assert_eq!(reg.default_layer(), reg.id("0"));
    }

    #[test]
    fn synthesis_unions_lineweights() {
        let doc = SceneDocument {
            batches: vec![
                batch(Some("a"), KeyColor::ByLayer).with_lineweight(50),
                batch(Some("a"), KeyColor::ByLayer).with_lineweight(13),
                batch(Some("a"), KeyColor::ByLayer).with_lineweight(50),
                batch(Some("a"), KeyColor::ByLayer),
            ],
            ..SceneDocument::default()
        };
        let reg = LayerRegistry::from_document(&doc);
        assert_eq!(reg.by_name("a").unwrap().lineweights, vec![13, 50]);
    }

    #[test]
    fn nameless_batches_still_get_a_default() {
        let doc = SceneDocument {
            batches: vec![batch(None, KeyColor::ByLayer)],
            ..SceneDocument::default()
        };
        let reg = LayerRegistry::from_document(&doc);
        assert_eq!(names(&reg), vec!["0"]);
        assert_eq!(reg.default_layer(), reg.id("0"));
    }

    #[test]
    fn empty_document_has_no_layers() {
        let reg = LayerRegistry::from_document(&SceneDocument::default());
        assert!(reg.is_empty());
        assert_eq!(reg.default_layer(), None);
    }

    // ── objects ──────────────────────────────────────────────────────────

    #[test]
    fn dispose_takes_objects() {
        let mut layer = Layer::new("a", "a", Rgb::BLACK);
        layer.push_object(PrimitiveId::from_raw(3));
        layer.push_object(PrimitiveId::from_raw(4));
        let taken = layer.dispose();
        assert_eq!(taken.len(), 2);
        assert!(layer.objects().is_empty());
    }
}
