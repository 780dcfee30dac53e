//! Relative luminance and contrast helpers.
//!
//! Luminance and contrast follow WCAG 2.0
//! (<https://www.w3.org/TR/2008/REC-WCAG20-20081211/#relativeluminancedef>).
//! Lightness adjustment works on an HSL decomposition of the linearized color,
//! so hue and saturation are preserved while lightness is scaled.

use super::Rgb;

/// sRGB component to linear.
#[inline]
pub fn linear_component(c: f64) -> f64 {
    if c <= 0.03928 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) }
}

/// Linear component back to sRGB.
#[inline]
pub fn srgb_component(c: f64) -> f64 {
    if c < 0.003 { c * 12.92 } else { c.powf(1.0 / 2.4) * 1.055 - 0.055 }
}

fn linear_channels(color: Rgb) -> [f64; 3] {
    [
        linear_component(color.r() as f64 / 255.0),
        linear_component(color.g() as f64 / 255.0),
        linear_component(color.b() as f64 / 255.0),
    ]
}

/// Relative luminance in `[0, 1]`.
pub fn luminance(color: Rgb) -> f64 {
    let [r, g, b] = linear_channels(color);
    r * 0.2126 + g * 0.7152 + b * 0.0722
}

/// Contrast ratio of `c1` against `c2`.
///
/// Greater than one when `c1` is the brighter color.
pub fn contrast_ratio(c1: Rgb, c2: Rgb) -> f64 {
    (luminance(c1) + 0.05) / (luminance(c2) + 0.05)
}

#[derive(Debug, Copy, Clone, PartialEq)]
struct Hsl {
    h: f64,
    s: f64,
    l: f64,
}

fn rgb_to_hsl(color: Rgb) -> Hsl {
    let [r, g, b] = linear_channels(color);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if max == min {
        // Achromatic.
        return Hsl { h: 0.0, s: 0.0, l };
    }

    let d = max - min;
    let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };
    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    Hsl { h: h / 6.0, s, l }
}

fn hue_to_channel(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 1.0 / 2.0 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    p
}

fn hsl_to_rgb(Hsl { h, s, l }: Hsl) -> Rgb {
    let (r, g, b) = if s == 0.0 {
        (l, l, l)
    } else {
        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        (
            hue_to_channel(p, q, h + 1.0 / 3.0),
            hue_to_channel(p, q, h),
            hue_to_channel(p, q, h - 1.0 / 3.0),
        )
    };

    let quantize = |c: f64| (srgb_component(c) * 256.0).floor().clamp(0.0, 255.0) as u8;
    Rgb::from_u8(quantize(r), quantize(g), quantize(b))
}

/// Scales lightness up by `factor`, saturating at full lightness.
pub fn lighten(color: Rgb, factor: f64) -> Rgb {
    let mut hsl = rgb_to_hsl(color);
    hsl.l = (hsl.l * factor).min(1.0);
    hsl_to_rgb(hsl)
}

/// Scales lightness down by `factor`.
pub fn darken(color: Rgb, factor: f64) -> Rgb {
    let mut hsl = rgb_to_hsl(color);
    hsl.l /= factor;
    hsl_to_rgb(hsl)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    // ── luminance ─────────────────────────────────────────────────────────

    #[test]
    fn luminance_of_black_and_white() {
        assert!(close(luminance(Rgb::BLACK), 0.0));
        assert!(close(luminance(Rgb::WHITE), 1.0));
    }

    #[test]
    fn green_dominates_luminance() {
        assert!(luminance(Rgb(0x00ff00)) > luminance(Rgb(0xff0000)));
        assert!(luminance(Rgb(0xff0000)) > luminance(Rgb(0x0000ff)));
    }

    #[test]
    fn white_on_black_is_max_contrast() {
        assert!(close(contrast_ratio(Rgb::WHITE, Rgb::BLACK), 21.0));
        assert!(close(contrast_ratio(Rgb::BLACK, Rgb::WHITE), 1.0 / 21.0));
    }

    // ── lightness ─────────────────────────────────────────────────────────

    #[test]
    fn lighten_increases_luminance() {
        let c = Rgb(0x202060);
        assert!(luminance(lighten(c, 3.0)) > luminance(c));
    }

    #[test]
    fn darken_decreases_luminance() {
        let c = Rgb(0xc0c0f0);
        assert!(luminance(darken(c, 3.0)) < luminance(c));
    }

    #[test]
    fn gray_stays_gray_when_lightened() {
        let c = lighten(Rgb(0x404040), 2.0);
        assert_eq!(c.r(), c.g());
        assert_eq!(c.g(), c.b());
    }

    #[test]
    fn lighten_saturates_at_white() {
        assert_eq!(lighten(Rgb(0x808080), 100.0), Rgb::WHITE);
    }
}
