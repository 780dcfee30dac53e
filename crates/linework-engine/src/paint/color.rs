use serde::Deserialize;

/// Opaque sRGB color packed as `0xRRGGBB`.
///
/// This is the representation used by drawing documents and material keys.
/// Conversion to linear floats happens only when a GPU uniform is written.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct Rgb(pub u32);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0x000000);
    pub const WHITE: Rgb = Rgb(0xffffff);

    #[inline]
    pub const fn from_hex(hex: u32) -> Self {
        Self(hex & 0xff_ffff)
    }

    #[inline]
    pub const fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    #[inline]
    pub const fn hex(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn r(self) -> u8 {
        ((self.0 >> 16) & 0xff) as u8
    }

    #[inline]
    pub const fn g(self) -> u8 {
        ((self.0 >> 8) & 0xff) as u8
    }

    #[inline]
    pub const fn b(self) -> u8 {
        (self.0 & 0xff) as u8
    }

    /// Straight sRGB components in `[0, 1]`.
    #[inline]
    pub fn to_srgb_f32(self) -> [f32; 3] {
        [
            self.r() as f32 / 255.0,
            self.g() as f32 / 255.0,
            self.b() as f32 / 255.0,
        ]
    }

    /// Linear components in `[0, 1]`, suitable for an sRGB render target.
    #[inline]
    pub fn to_linear_f32(self) -> [f32; 3] {
        self.to_srgb_f32()
            .map(|c| super::contrast::linear_component(c as f64) as f32)
    }
}

impl From<u32> for Rgb {
    #[inline]
    fn from(hex: u32) -> Self {
        Rgb::from_hex(hex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_unpack_from_hex() {
        let c = Rgb::from_hex(0x12_34_56);
        assert_eq!((c.r(), c.g(), c.b()), (0x12, 0x34, 0x56));
        assert_eq!(Rgb::from_u8(0x12, 0x34, 0x56), c);
    }

    #[test]
    fn from_hex_drops_alpha_byte() {
        assert_eq!(Rgb::from_hex(0xff_ff_00_00), Rgb(0xff_00_00));
    }

    #[test]
    fn linear_endpoints_are_exact() {
        assert_eq!(Rgb::BLACK.to_linear_f32(), [0.0, 0.0, 0.0]);
        assert_eq!(Rgb::WHITE.to_linear_f32(), [1.0, 1.0, 1.0]);
    }
}
