use super::ViewerOptions;
use crate::paint::{contrast_ratio, darken, lighten, luminance, Rgb};
use crate::scene::KeyColor;

/// Minimum contrast ratio before a color gets adjusted.
const MIN_TARGET_RATIO: f64 = 1.5;

/// Background luminance at or above which pure white is inverted.
const LIGHT_BACKGROUND: f64 = 0.8;
/// Background luminance at or below which pure black is inverted.
const DARK_BACKGROUND: f64 = 0.2;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ColorCorrection {
    /// Colors are drawn as stored.
    Off,
    /// Only pure white and pure black are flipped, and only when they would
    /// vanish against the background.
    BlackWhiteInversion,
    /// Inversion plus lightness adjustment of any low-contrast color.
    Contrast,
}

impl ColorCorrection {
    pub fn from_options(options: &ViewerOptions) -> Self {
        if options.color_correction {
            Self::Contrast
        } else if options.black_white_inversion {
            Self::BlackWhiteInversion
        } else {
            Self::Off
        }
    }
}

/// One side of a color lookup: a key color and the color of the layer it sits on.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ColorSource {
    pub color: KeyColor,
    pub layer_color: Option<Rgb>,
}

impl ColorSource {
    #[inline]
    pub const fn new(color: KeyColor, layer_color: Option<Rgb>) -> Self {
        Self { color, layer_color }
    }
}

/// Resolves indirect colors and corrects them against the background.
#[derive(Debug, Copy, Clone)]
pub struct ColorResolver {
    background: Rgb,
    background_luminance: f64,
    correction: ColorCorrection,
}

impl ColorResolver {
    pub fn new(background: Rgb, correction: ColorCorrection) -> Self {
        Self {
            background,
            background_luminance: luminance(background),
            correction,
        }
    }

    pub fn from_options(options: &ViewerOptions) -> Self {
        Self::new(options.clear_color, ColorCorrection::from_options(options))
    }

    #[inline]
    pub fn background(&self) -> Rgb {
        self.background
    }

    /// Resolves the color a definition batch is drawn with.
    ///
    /// - explicit colors pass through
    /// - `ByBlock` takes the placement's color (itself resolved against the
    ///   placement's layer); without a placement it behaves like `ByLayer`
    /// - `ByLayer` takes the placement's layer color, then the definition's
    ///   own layer color, then black
    pub fn resolve(definition: ColorSource, placement: Option<ColorSource>) -> Rgb {
        match definition.color {
            KeyColor::Rgb(c) => c,
            KeyColor::ByBlock => match placement {
                Some(p) => Self::resolve(p, None),
                None => definition.layer_color.unwrap_or(Rgb::BLACK),
            },
            KeyColor::ByLayer => placement
                .and_then(|p| p.layer_color)
                .or(definition.layer_color)
                .unwrap_or(Rgb::BLACK),
        }
    }

    /// Applies the configured correction to a resolved color.
    pub fn correct(&self, color: Rgb) -> Rgb {
        if self.correction == ColorCorrection::Off {
            return color;
        }

        let bkg = self.background_luminance;
        if color == Rgb::WHITE && bkg >= LIGHT_BACKGROUND {
            return Rgb::BLACK;
        }
        if color == Rgb::BLACK && bkg <= DARK_BACKGROUND {
            return Rgb::WHITE;
        }
        if self.correction != ColorCorrection::Contrast {
            return color;
        }

        let ratio = contrast_ratio(color, self.background);
        let diff = if ratio >= 1.0 { ratio } else { 1.0 / ratio };
        if diff >= MIN_TARGET_RATIO {
            return color;
        }

        let fg = luminance(color);
        let target = if bkg > 0.5 { bkg / 2.0 } else { bkg * 2.0 };
        if target > fg {
            lighten(color, target / fg.max(f64::MIN_POSITIVE))
        } else {
            darken(color, fg / target)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb = Rgb(0xff0000);
    const LAYER: Rgb = Rgb(0x00ff00);
    const PLACEMENT_LAYER: Rgb = Rgb(0x0000ff);

    fn src(color: KeyColor, layer: Option<Rgb>) -> ColorSource {
        ColorSource::new(color, layer)
    }

    // ── resolution ───────────────────────────────────────────────────────

    #[test]
    fn explicit_colors_are_never_altered() {
        let def = src(KeyColor::Rgb(RED), Some(LAYER));
        assert_eq!(ColorResolver::resolve(def, None), RED);
        let placement = src(KeyColor::Rgb(Rgb(0x111111)), Some(PLACEMENT_LAYER));
        assert_eq!(ColorResolver::resolve(def, Some(placement)), RED);
    }

    #[test]
    fn by_block_takes_placement_color() {
        let def = src(KeyColor::ByBlock, Some(LAYER));
        let placement = src(KeyColor::Rgb(Rgb(0xabcdef)), Some(PLACEMENT_LAYER));
        assert_eq!(ColorResolver::resolve(def, Some(placement)), Rgb(0xabcdef));
    }

    #[test]
    fn by_block_placed_by_layer_takes_placement_layer() {
        let def = src(KeyColor::ByBlock, Some(LAYER));
        let placement = src(KeyColor::ByLayer, Some(PLACEMENT_LAYER));
        assert_eq!(ColorResolver::resolve(def, Some(placement)), PLACEMENT_LAYER);
    }

    #[test]
    fn by_layer_prefers_placement_layer() {
        let def = src(KeyColor::ByLayer, Some(LAYER));
        let placement = src(KeyColor::Rgb(RED), Some(PLACEMENT_LAYER));
        assert_eq!(ColorResolver::resolve(def, Some(placement)), PLACEMENT_LAYER);
    }

    #[test]
    fn by_layer_falls_back_to_own_layer_then_black() {
        let placement = src(KeyColor::Rgb(RED), None);
        assert_eq!(ColorResolver::resolve(src(KeyColor::ByLayer, Some(LAYER)), Some(placement)), LAYER);
        assert_eq!(ColorResolver::resolve(src(KeyColor::ByLayer, Some(LAYER)), None), LAYER);
        assert_eq!(ColorResolver::resolve(src(KeyColor::ByLayer, None), Some(placement)), Rgb::BLACK);
    }

    // ── correction ───────────────────────────────────────────────────────

    #[test]
    fn correction_off_passes_everything() {
        let r = ColorResolver::new(Rgb::BLACK, ColorCorrection::Off);
        assert_eq!(r.correct(Rgb::BLACK), Rgb::BLACK);
        assert_eq!(r.correct(Rgb(0x010101)), Rgb(0x010101));
    }

    #[test]
    fn inversion_flips_only_vanishing_extremes() {
        let dark = ColorResolver::new(Rgb::BLACK, ColorCorrection::BlackWhiteInversion);
        assert_eq!(dark.correct(Rgb::BLACK), Rgb::WHITE);
        assert_eq!(dark.correct(Rgb::WHITE), Rgb::WHITE);
        assert_eq!(dark.correct(Rgb(0x010101)), Rgb(0x010101));

        let light = ColorResolver::new(Rgb::WHITE, ColorCorrection::BlackWhiteInversion);
        assert_eq!(light.correct(Rgb::WHITE), Rgb::BLACK);
        assert_eq!(light.correct(Rgb::BLACK), Rgb::BLACK);

        let mid = ColorResolver::new(Rgb(0x808080), ColorCorrection::BlackWhiteInversion);
        assert_eq!(mid.correct(Rgb::WHITE), Rgb::WHITE);
        assert_eq!(mid.correct(Rgb::BLACK), Rgb::BLACK);
    }

    #[test]
    fn contrast_mode_keeps_readable_colors() {
        let r = ColorResolver::new(Rgb::BLACK, ColorCorrection::Contrast);
        assert_eq!(r.correct(Rgb(0xffff00)), Rgb(0xffff00));
        assert_eq!(r.correct(RED), RED);
    }

    #[test]
    fn contrast_mode_lifts_dark_colors_on_dark_background() {
        let bkg = Rgb(0x202020);
        let r = ColorResolver::new(bkg, ColorCorrection::Contrast);
        let fg = Rgb(0x181830);
        let out = r.correct(fg);
        assert_ne!(out, fg);
        assert!(luminance(out) > luminance(fg));
        assert!(contrast_ratio(out, bkg) > contrast_ratio(fg, bkg));
    }

    #[test]
    fn contrast_mode_darkens_light_colors_on_light_background() {
        let bkg = Rgb(0xf0f0f0);
        let r = ColorResolver::new(bkg, ColorCorrection::Contrast);
        let fg = Rgb(0xe0e0ff);
        let out = r.correct(fg);
        assert!(luminance(out) < luminance(fg));
    }

    #[test]
    fn options_select_correction_mode() {
        let mut o = ViewerOptions::default();
        assert_eq!(ColorCorrection::from_options(&o), ColorCorrection::BlackWhiteInversion);
        o.color_correction = true;
        assert_eq!(ColorCorrection::from_options(&o), ColorCorrection::Contrast);
        o.color_correction = false;
        o.black_white_inversion = false;
        assert_eq!(ColorCorrection::from_options(&o), ColorCorrection::Off);
    }
}
