use core::fmt;
use core::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

use crate::paint::Rgb;

/// Primitive class of a batch.
///
/// Codes match the parser's numeric encoding.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(u8)]
pub enum GeometryType {
    Points = 0,
    Lines = 1,
    IndexedLines = 2,
    Triangles = 3,
    IndexedTriangles = 4,
    BlockInstance = 5,
    PointInstance = 6,
}

impl GeometryType {
    pub const ALL: [GeometryType; 7] = [
        Self::Points,
        Self::Lines,
        Self::IndexedLines,
        Self::Triangles,
        Self::IndexedTriangles,
        Self::BlockInstance,
        Self::PointInstance,
    ];

    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Points => "POINTS",
            Self::Lines => "LINES",
            Self::IndexedLines => "INDEXED_LINES",
            Self::Triangles => "TRIANGLES",
            Self::IndexedTriangles => "INDEXED_TRIANGLES",
            Self::BlockInstance => "BLOCK_INSTANCE",
            Self::PointInstance => "POINT_INSTANCE",
        }
    }

    /// True for batches that place a block rather than carry geometry.
    #[inline]
    pub const fn is_instance(self) -> bool {
        matches!(self, Self::BlockInstance | Self::PointInstance)
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A geometry type the engine does not know. Usually a parser/engine version mismatch.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct UnknownGeometryType(pub String);

impl fmt::Display for UnknownGeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unexpected geometry type: {}", self.0)
    }
}

impl std::error::Error for UnknownGeometryType {}

impl TryFrom<u64> for GeometryType {
    type Error = UnknownGeometryType;

    fn try_from(code: u64) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|g| u64::from(g.code()) == code)
            .ok_or_else(|| UnknownGeometryType(code.to_string()))
    }
}

impl FromStr for GeometryType {
    type Err = UnknownGeometryType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<u64>() {
            return Self::try_from(code);
        }
        Self::ALL
            .into_iter()
            .find(|g| g.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownGeometryType(s.to_owned()))
    }
}

impl<'de> Deserialize<'de> for GeometryType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct GeometryVisitor;

        impl Visitor<'_> for GeometryVisitor {
            type Value = GeometryType;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a geometry type name or numeric code")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<GeometryType, E> {
                GeometryType::try_from(v).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<GeometryType, E> {
                u64::try_from(v)
                    .map_err(|_| E::custom(UnknownGeometryType(v.to_string())))
                    .and_then(|v| self.visit_u64(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<GeometryType, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(GeometryVisitor)
    }
}

/// Color reference stored in a batch key.
///
/// Variant order is the sort order: `ByBlock < ByLayer < Rgb(_)`, which is
/// also the order of the wire codes (-2, -1, 0..=0xffffff).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum KeyColor {
    /// Take the color of the batch that instantiates the block.
    ByBlock,
    /// Take the color of the resolved layer.
    ByLayer,
    Rgb(Rgb),
}

impl KeyColor {
    pub const BY_LAYER_CODE: i64 = -1;
    pub const BY_BLOCK_CODE: i64 = -2;

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            Self::BY_LAYER_CODE => Some(Self::ByLayer),
            Self::BY_BLOCK_CODE => Some(Self::ByBlock),
            0..=0xff_ffff => Some(Self::Rgb(Rgb(code as u32))),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::ByLayer => Self::BY_LAYER_CODE,
            Self::ByBlock => Self::BY_BLOCK_CODE,
            Self::Rgb(c) => i64::from(c.0),
        }
    }
}

impl From<Rgb> for KeyColor {
    fn from(c: Rgb) -> Self {
        Self::Rgb(c)
    }
}

impl<'de> Deserialize<'de> for KeyColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = i64::deserialize(deserializer)?;
        Self::from_code(code)
            .ok_or_else(|| de::Error::custom(format_args!("invalid color code {code}")))
    }
}

/// Identity of a batch group.
///
/// Ordering rules (derived, field order):
/// 1) `block_name`: `None` first, then lexicographic
/// 2) `geometry_type`: ascending code
/// 3) `layer_name`: `None` first, then lexicographic
/// 4) `color`: `ByBlock < ByLayer < Rgb`
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchKey {
    /// Set for batches that are part of a block definition.
    #[serde(default)]
    pub block_name: Option<String>,
    pub geometry_type: GeometryType,
    #[serde(default)]
    pub layer_name: Option<String>,
    pub color: KeyColor,
}

impl BatchKey {
    pub fn new(
        layer_name: Option<&str>,
        block_name: Option<&str>,
        geometry_type: GeometryType,
        color: KeyColor,
    ) -> Self {
        Self {
            block_name: block_name.map(str::to_owned),
            geometry_type,
            layer_name: layer_name.map(str::to_owned),
            color,
        }
    }

    #[inline]
    pub fn is_instance(&self) -> bool {
        self.geometry_type.is_instance()
    }
}

/// How a material transforms each vertex.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum InstanceType {
    /// Plain geometry.
    None,
    /// Affine 2x3 transform per instance (two rows of three floats).
    Full,
    /// Translation per instance (two floats).
    Point,
}

impl InstanceType {
    pub const ALL: [InstanceType; 3] = [Self::None, Self::Full, Self::Point];

    /// Floats consumed per instance.
    #[inline]
    pub const fn stride(self) -> usize {
        match self {
            Self::None => 0,
            Self::Full => 6,
            Self::Point => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── geometry type decoding ───────────────────────────────────────────

    #[test]
    fn geometry_type_accepts_names_and_codes() {
        assert_eq!("INDEXED_LINES".parse(), Ok(GeometryType::IndexedLines));
        assert_eq!("point_instance".parse(), Ok(GeometryType::PointInstance));
        assert_eq!("3".parse(), Ok(GeometryType::Triangles));
        assert_eq!(GeometryType::try_from(5), Ok(GeometryType::BlockInstance));
    }

    #[test]
    fn unknown_geometry_type_names_the_value() {
        let err = "HATCH".parse::<GeometryType>().unwrap_err();
        assert_eq!(err.to_string(), "unexpected geometry type: HATCH");
        let err = GeometryType::try_from(7).unwrap_err();
        assert!(err.to_string().contains('7'));
    }

    #[test]
    fn geometry_type_deserializes_from_json_forms() {
        let a: GeometryType = serde_json::from_str("\"LINES\"").unwrap();
        let b: GeometryType = serde_json::from_str("1").unwrap();
        assert_eq!(a, b);
        assert!(serde_json::from_str::<GeometryType>("42").is_err());
        assert!(serde_json::from_str::<GeometryType>("-1").is_err());
    }

    // ── key color ────────────────────────────────────────────────────────

    #[test]
    fn sentinels_sort_before_explicit_colors() {
        assert!(KeyColor::ByBlock < KeyColor::ByLayer);
        assert!(KeyColor::ByLayer < KeyColor::Rgb(Rgb(0)));
        assert!(KeyColor::Rgb(Rgb(0)) < KeyColor::Rgb(Rgb(1)));
    }

    #[test]
    fn key_color_wire_codes() {
        assert_eq!(KeyColor::from_code(-1), Some(KeyColor::ByLayer));
        assert_eq!(KeyColor::from_code(-2), Some(KeyColor::ByBlock));
        assert_eq!(KeyColor::from_code(0xff0000), Some(KeyColor::Rgb(Rgb(0xff0000))));
        assert_eq!(KeyColor::from_code(-3), None);
        assert_eq!(KeyColor::from_code(0x100_0000), None);
        for c in [KeyColor::ByBlock, KeyColor::ByLayer, KeyColor::Rgb(Rgb(0x123456))] {
            assert_eq!(KeyColor::from_code(c.code()), Some(c));
        }
    }

    // ── batch key ordering ───────────────────────────────────────────────

    #[test]
    fn batch_key_orders_block_then_type_then_layer_then_color() {
        let k = |block: Option<&str>, g, layer: Option<&str>, c| BatchKey::new(layer, block, g, c);
        let red = KeyColor::Rgb(Rgb(0xff0000));

        let mut keys = vec![
            k(Some("B"), GeometryType::Lines, None, red),
            k(None, GeometryType::Triangles, Some("A"), red),
            k(None, GeometryType::Lines, Some("Z"), red),
            k(None, GeometryType::Lines, Some("A"), KeyColor::ByLayer),
            k(None, GeometryType::Lines, None, red),
            k(Some("A"), GeometryType::Points, Some("L"), KeyColor::ByBlock),
        ];
        keys.sort();

        let summary: Vec<_> = keys
            .iter()
            .map(|k| (k.block_name.as_deref(), k.geometry_type, k.layer_name.as_deref()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (None, GeometryType::Lines, None),
                (None, GeometryType::Lines, Some("A")),
                (None, GeometryType::Lines, Some("Z")),
                (None, GeometryType::Triangles, Some("A")),
                (Some("A"), GeometryType::Points, Some("L")),
                (Some("B"), GeometryType::Lines, None),
            ]
        );
    }

    #[test]
    fn batch_key_decodes_wire_shape() {
        let json = r#"{"geometryType":"BLOCK_INSTANCE","layerName":"walls","color":-2,"blockName":"door"}"#;
        let key: BatchKey = serde_json::from_str(json).unwrap();
        assert_eq!(
            key,
            BatchKey::new(
                Some("walls"),
                Some("door"),
                GeometryType::BlockInstance,
                KeyColor::ByBlock
            )
        );
        assert!(key.is_instance());

        let bare: BatchKey = serde_json::from_str(r#"{"geometryType":0,"color":255}"#).unwrap();
        assert_eq!(bare.layer_name, None);
        assert_eq!(bare.block_name, None);
    }
}
