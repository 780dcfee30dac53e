use super::{GeometryType, InstanceType};
use crate::paint::Rgb;

/// Identity of a cached material.
///
/// Ordering rules (derived, field order):
/// 1) `instance_type`
/// 2) `geometry_type`: `None` first; only points get a dedicated material
/// 3) `color`
/// 4) `extra`: free-form discriminator, 0 unless a caller needs variants
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MaterialKey {
    pub instance_type: InstanceType,
    pub geometry_type: Option<GeometryType>,
    pub color: Rgb,
    pub extra: u32,
}

impl MaterialKey {
    #[inline]
    pub const fn new(
        instance_type: InstanceType,
        geometry_type: Option<GeometryType>,
        color: Rgb,
        extra: u32,
    ) -> Self {
        Self {
            instance_type,
            geometry_type,
            color,
            extra,
        }
    }

    /// Material for lines and triangles.
    #[inline]
    pub const fn color(instance_type: InstanceType, color: Rgb) -> Self {
        Self::new(instance_type, None, color, 0)
    }

    /// Material for point primitives, which also carry a point size.
    #[inline]
    pub const fn points(instance_type: InstanceType, color: Rgb) -> Self {
        Self::new(instance_type, Some(GeometryType::Points), color, 0)
    }
}
