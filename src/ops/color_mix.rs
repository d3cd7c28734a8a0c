// ============================================================================
// COLOR MIXING — sRGB / linear-light / OKLab / CMYK conversions and the
// closed set of mix strategies used by the brush and the CLI.
// ============================================================================

use std::fmt;
use std::str::FromStr;

use image::Rgba;

/// Saturation boost applied by the spectral approximation after mixing.
const SPECTRAL_SATURATION: f32 = 1.25;

/// How two colors are combined for a given mix fraction `t`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum MixStrategy {
    /// Interpolate in linear light, then re-encode to sRGB.
    #[default]
    LinearLight,
    /// Interpolate L, a, b in OKLab.
    OkLab,
    /// Per-channel product `a * b / 255`; the fraction only pins the endpoints.
    Multiply,
    /// Per-channel `a^(1-t) * b^t` with `0^0 = 0`.
    Power,
    /// Linear-light mix followed by a saturation boost around the pixel mean.
    SpectralApprox,
    /// Interpolate in CMYK (K extracted first) and convert back.
    Cmyk,
    /// Naive per-channel sRGB interpolation.
    Rgb,
}

impl MixStrategy {
    /// All strategies, in their stable index order.
    pub fn all() -> &'static [MixStrategy] {
        &[
            MixStrategy::LinearLight,
            MixStrategy::OkLab,
            MixStrategy::Multiply,
            MixStrategy::Power,
            MixStrategy::SpectralApprox,
            MixStrategy::Cmyk,
            MixStrategy::Rgb,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            MixStrategy::LinearLight => "linear",
            MixStrategy::OkLab => "oklab",
            MixStrategy::Multiply => "multiply",
            MixStrategy::Power => "power",
            MixStrategy::SpectralApprox => "spectral",
            MixStrategy::Cmyk => "cmyk",
            MixStrategy::Rgb => "rgb",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            MixStrategy::LinearLight => 0,
            MixStrategy::OkLab => 1,
            MixStrategy::Multiply => 2,
            MixStrategy::Power => 3,
            MixStrategy::SpectralApprox => 4,
            MixStrategy::Cmyk => 5,
            MixStrategy::Rgb => 6,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::all().get(index).copied()
    }

    /// Mix `a` toward `b` by `t`.  The result is always opaque.
    pub fn blend(&self, a: Rgba<u8>, b: Rgba<u8>, t: f32) -> Rgba<u8> {
        blend(*self, a, b, t)
    }
}

impl fmt::Display for MixStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MixStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        if let Ok(idx) = key.parse::<usize>() {
            return Self::from_index(idx).ok_or_else(|| format!("no mix strategy with index {idx}"));
        }
        match key.as_str() {
            "linear" | "linear-light" | "luminance" | "mix" => Ok(MixStrategy::LinearLight),
            "oklab" => Ok(MixStrategy::OkLab),
            "multiply" => Ok(MixStrategy::Multiply),
            "power" => Ok(MixStrategy::Power),
            "spectral" => Ok(MixStrategy::SpectralApprox),
            "cmyk" => Ok(MixStrategy::Cmyk),
            "rgb" => Ok(MixStrategy::Rgb),
            other => Err(format!("unknown mix strategy `{other}`")),
        }
    }
}

// ----------------------------------------------------------------------------
// Transfer functions
// ----------------------------------------------------------------------------

/// Decode an 8-bit sRGB channel to linear light in 0..1.
#[inline]
pub fn srgb_to_linear(v: u8) -> f32 {
    let c = v as f32 / 255.0;
    if c > 0.04045 {
        ((c + 0.055) / 1.055).powf(2.4)
    } else {
        c / 12.92
    }
}

/// Encode linear light (clamped to 0..1) back to an 8-bit sRGB channel.
#[inline]
pub fn linear_to_srgb(l: f32) -> u8 {
    let l = l.clamp(0.0, 1.0);
    let s = if l > 0.003_130_8 {
        1.055 * l.powf(1.0 / 2.4) - 0.055
    } else {
        l * 12.92
    };
    (s * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Relative luminance (Rec. 709 weights over linear light).
pub fn luminance(c: Rgba<u8>) -> f32 {
    0.2126 * srgb_to_linear(c[0]) + 0.7152 * srgb_to_linear(c[1]) + 0.0722 * srgb_to_linear(c[2])
}

// ----------------------------------------------------------------------------
// OKLab
// ----------------------------------------------------------------------------

/// sRGB → OKLab `[L, a, b]`.
pub fn rgb_to_oklab(c: Rgba<u8>) -> [f32; 3] {
    let r = srgb_to_linear(c[0]);
    let g = srgb_to_linear(c[1]);
    let b = srgb_to_linear(c[2]);

    let l = 0.412_221_47 * r + 0.536_332_54 * g + 0.051_445_995 * b;
    let m = 0.211_903_5 * r + 0.680_699_5 * g + 0.107_396_96 * b;
    let s = 0.088_302_46 * r + 0.281_718_85 * g + 0.629_978_7 * b;

    let l = l.cbrt();
    let m = m.cbrt();
    let s = s.cbrt();

    [
        0.210_454_26 * l + 0.793_617_8 * m - 0.004_072_047 * s,
        1.977_998_5 * l - 2.428_592_2 * m + 0.450_593_7 * s,
        0.025_904_037 * l + 0.782_771_77 * m - 0.808_675_77 * s,
    ]
}

/// OKLab `[L, a, b]` → opaque sRGB, each channel clamped after encoding.
pub fn oklab_to_rgb(lab: [f32; 3]) -> Rgba<u8> {
    let [ll, a, b] = lab;
    let l = ll + 0.396_337_78 * a + 0.215_803_76 * b;
    let m = ll - 0.105_561_346 * a - 0.063_854_17 * b;
    let s = ll - 0.089_484_18 * a - 1.291_485_5 * b;

    let l3 = l * l * l;
    let m3 = m * m * m;
    let s3 = s * s * s;

    let r = 4.076_741_7 * l3 - 3.307_711_6 * m3 + 0.230_969_94 * s3;
    let g = -1.268_438 * l3 + 2.609_757_4 * m3 - 0.341_319_38 * s3;
    let bb = -0.004_196_086_3 * l3 - 0.703_418_6 * m3 + 1.707_614_7 * s3;

    Rgba([linear_to_srgb(r), linear_to_srgb(g), linear_to_srgb(bb), 255])
}

// ----------------------------------------------------------------------------
// CMYK
// ----------------------------------------------------------------------------

/// sRGB → `[c, m, y, k]`, each in 0..1.  Pure black yields `c = m = y = 0`.
pub fn rgb_to_cmyk(c: Rgba<u8>) -> [f32; 4] {
    let c0 = 1.0 - c[0] as f32 / 255.0;
    let m0 = 1.0 - c[1] as f32 / 255.0;
    let y0 = 1.0 - c[2] as f32 / 255.0;
    let k = c0.min(m0).min(y0);
    let denom = 1.0 - k;
    if denom <= f32::EPSILON {
        return [0.0, 0.0, 0.0, k];
    }
    [(c0 - k) / denom, (m0 - k) / denom, (y0 - k) / denom, k]
}

/// `[c, m, y, k]` → opaque sRGB.
pub fn cmyk_to_rgb(cmyk: [f32; 4]) -> Rgba<u8> {
    let [c, m, y, k] = cmyk;
    let channel = |v: f32| ((1.0 - (v * (1.0 - k) + k).min(1.0)) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba([channel(c), channel(m), channel(y), 255])
}

// ----------------------------------------------------------------------------
// Strategies
// ----------------------------------------------------------------------------

/// Mix `a` toward `b` by `t` under `strategy`.
///
/// `t` is clamped to 0..1 and the endpoints are exact: `t = 0` yields `a`,
/// `t = 1` yields `b` (both forced opaque).  Alpha is never propagated.
pub fn blend(strategy: MixStrategy, a: Rgba<u8>, b: Rgba<u8>, t: f32) -> Rgba<u8> {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    if t <= 0.0 {
        return opaque(a);
    }
    if t >= 1.0 {
        return opaque(b);
    }
    match strategy {
        MixStrategy::LinearLight => blend_linear(a, b, t),
        MixStrategy::OkLab => blend_oklab(a, b, t),
        MixStrategy::Multiply => blend_multiply(a, b),
        MixStrategy::Power => blend_power(a, b, t),
        MixStrategy::SpectralApprox => blend_spectral(a, b, t),
        MixStrategy::Cmyk => blend_cmyk(a, b, t),
        MixStrategy::Rgb => blend_rgb(a, b, t),
    }
}

#[inline]
fn opaque(c: Rgba<u8>) -> Rgba<u8> {
    Rgba([c[0], c[1], c[2], 255])
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

fn mix_linear_channels(a: Rgba<u8>, b: Rgba<u8>, t: f32) -> [f32; 3] {
    [
        lerp(srgb_to_linear(a[0]), srgb_to_linear(b[0]), t),
        lerp(srgb_to_linear(a[1]), srgb_to_linear(b[1]), t),
        lerp(srgb_to_linear(a[2]), srgb_to_linear(b[2]), t),
    ]
}

fn blend_linear(a: Rgba<u8>, b: Rgba<u8>, t: f32) -> Rgba<u8> {
    let [r, g, bl] = mix_linear_channels(a, b, t);
    Rgba([linear_to_srgb(r), linear_to_srgb(g), linear_to_srgb(bl), 255])
}

fn blend_oklab(a: Rgba<u8>, b: Rgba<u8>, t: f32) -> Rgba<u8> {
    let la = rgb_to_oklab(a);
    let lb = rgb_to_oklab(b);
    oklab_to_rgb([lerp(la[0], lb[0], t), lerp(la[1], lb[1], t), lerp(la[2], lb[2], t)])
}

fn blend_multiply(a: Rgba<u8>, b: Rgba<u8>) -> Rgba<u8> {
    let ch = |i: usize| ((a[i] as f32 * b[i] as f32) / 255.0).round() as u8;
    Rgba([ch(0), ch(1), ch(2), 255])
}

fn blend_power(a: Rgba<u8>, b: Rgba<u8>, t: f32) -> Rgba<u8> {
    fn safe_pow(x: f32, y: f32) -> f32 {
        if x == 0.0 && y == 0.0 { 0.0 } else { x.powf(y) }
    }
    let ch = |i: usize| {
        (safe_pow(a[i] as f32, 1.0 - t) * safe_pow(b[i] as f32, t))
            .round()
            .clamp(0.0, 255.0) as u8
    };
    Rgba([ch(0), ch(1), ch(2), 255])
}

fn blend_spectral(a: Rgba<u8>, b: Rgba<u8>, t: f32) -> Rgba<u8> {
    let mixed = mix_linear_channels(a, b, t);
    let mean = (mixed[0] + mixed[1] + mixed[2]) / 3.0;
    let boost = |v: f32| linear_to_srgb(mean + (v - mean) * SPECTRAL_SATURATION);
    Rgba([boost(mixed[0]), boost(mixed[1]), boost(mixed[2]), 255])
}

fn blend_cmyk(a: Rgba<u8>, b: Rgba<u8>, t: f32) -> Rgba<u8> {
    let ca = rgb_to_cmyk(a);
    let cb = rgb_to_cmyk(b);
    cmyk_to_rgb([
        lerp(ca[0], cb[0], t),
        lerp(ca[1], cb[1], t),
        lerp(ca[2], cb[2], t),
        lerp(ca[3], cb[3], t),
    ])
}

fn blend_rgb(a: Rgba<u8>, b: Rgba<u8>, t: f32) -> Rgba<u8> {
    let ch = |i: usize| lerp(a[i] as f32, b[i] as f32, t).round().clamp(0.0, 255.0) as u8;
    Rgba([ch(0), ch(1), ch(2), 255])
}

// ----------------------------------------------------------------------------
// Palettes, gradients and parsing
// ----------------------------------------------------------------------------

/// `size` evenly spaced linear-light mixes from `a` to `b` (endpoints included).
/// A size of 0 or 1 yields just `a`.
pub fn palette(a: Rgba<u8>, b: Rgba<u8>, size: usize) -> Vec<Rgba<u8>> {
    match size {
        0 | 1 => vec![opaque(a)],
        n => (0..n)
            .map(|i| blend(MixStrategy::LinearLight, a, b, i as f32 / (n - 1) as f32))
            .collect(),
    }
}

/// Sample a multi-stop gradient at `t`.  `stops` are `(color, position)` pairs
/// in any order; outside the stop range the nearest stop wins.
pub fn gradient(t: f32, stops: &[(Rgba<u8>, f32)]) -> Option<Rgba<u8>> {
    let mut below: Option<(Rgba<u8>, f32)> = None;
    let mut above: Option<(Rgba<u8>, f32)> = None;
    for &(color, pos) in stops {
        if pos <= t && below.is_none_or(|(_, p)| pos > p) {
            below = Some((color, pos));
        }
        if pos >= t && above.is_none_or(|(_, p)| pos < p) {
            above = Some((color, pos));
        }
    }
    match (below, above) {
        (None, None) => None,
        (Some((c, _)), None) | (None, Some((c, _))) => Some(opaque(c)),
        (Some((ca, pa)), Some((cb, pb))) => {
            if pa == pb {
                Some(opaque(ca))
            } else {
                Some(blend(MixStrategy::LinearLight, ca, cb, (t - pa) / (pb - pa)))
            }
        }
    }
}

/// Parse `#rgb` or `#rrggbb` (leading `#` optional) into an opaque color.
pub fn parse_hex(s: &str) -> Option<Rgba<u8>> {
    let hex = s.trim().trim_start_matches('#');
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return None,
    };
    let num = u32::from_str_radix(&expanded, 16).ok()?;
    Some(Rgba([(num >> 16) as u8, (num >> 8) as u8, num as u8, 255]))
}

/// Format an opaque color as `#rrggbb`.
pub fn to_hex(c: Rgba<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", c[0], c[1], c[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Rgba<u8>, b: Rgba<u8>, tol: i32) -> bool {
        (0..3).all(|i| (a[i] as i32 - b[i] as i32).abs() <= tol)
    }

    const SAMPLES: [Rgba<u8>; 6] = [
        Rgba([0, 0, 0, 255]),
        Rgba([255, 255, 255, 255]),
        Rgba([255, 0, 0, 255]),
        Rgba([18, 200, 77, 255]),
        Rgba([34, 34, 59, 255]),
        Rgba([250, 128, 3, 255]),
    ];

    #[test]
    fn endpoints_are_exact_for_every_strategy() {
        for &s in MixStrategy::all() {
            for &a in &SAMPLES {
                for &b in &SAMPLES {
                    assert!(close(s.blend(a, b, 0.0), a, 1), "{s} t=0 {a:?} {b:?}");
                    assert!(close(s.blend(a, b, 1.0), b, 1), "{s} t=1 {a:?} {b:?}");
                }
            }
        }
    }

    #[test]
    fn output_is_always_opaque() {
        let a = Rgba([10, 20, 30, 0]);
        let b = Rgba([200, 100, 50, 12]);
        for &s in MixStrategy::all() {
            for t in [0.0, 0.3, 0.5, 1.0] {
                assert_eq!(s.blend(a, b, t)[3], 255);
            }
        }
    }

    #[test]
    fn oklab_round_trip_within_one() {
        for r in (0..=255u16).step_by(15) {
            for g in (0..=255u16).step_by(17) {
                for b in (0..=255u16).step_by(51) {
                    let c = Rgba([r as u8, g as u8, b as u8, 255]);
                    let back = oklab_to_rgb(rgb_to_oklab(c));
                    assert!(close(back, c, 1), "{c:?} -> {back:?}");
                }
            }
        }
    }

    #[test]
    fn oklab_white_has_unit_lightness() {
        let lab = rgb_to_oklab(Rgba([255, 255, 255, 255]));
        assert!((lab[0] - 1.0).abs() < 1e-3);
        assert!(lab[1].abs() < 1e-3 && lab[2].abs() < 1e-3);
    }

    #[test]
    fn linear_mix_of_black_and_white_is_brighter_than_naive() {
        let mid = blend(MixStrategy::LinearLight, Rgba([0, 0, 0, 255]), Rgba([255, 255, 255, 255]), 0.5);
        // 0.5 linear encodes to ~188 in sRGB.
        assert!((mid[0] as i32 - 188).abs() <= 1, "{mid:?}");
        let naive = blend(MixStrategy::Rgb, Rgba([0, 0, 0, 255]), Rgba([255, 255, 255, 255]), 0.5);
        assert_eq!(naive[0], 128);
    }

    #[test]
    fn multiply_ignores_interior_fraction() {
        let a = Rgba([200, 100, 255, 255]);
        let b = Rgba([128, 255, 0, 255]);
        let first = blend(MixStrategy::Multiply, a, b, 0.2);
        let second = blend(MixStrategy::Multiply, a, b, 0.8);
        assert_eq!(first, second);
        assert_eq!(first, Rgba([100, 100, 0, 255]));
    }

    #[test]
    fn power_treats_zero_to_the_zero_as_zero() {
        let out = blend(MixStrategy::Power, Rgba([0, 100, 0, 255]), Rgba([0, 100, 255, 255]), 0.5);
        assert_eq!(out[0], 0);
        assert_eq!(out[1], 100);
        assert_eq!(out[2], 0);
    }

    #[test]
    fn spectral_boosts_saturation_over_linear() {
        let a = Rgba([200, 40, 40, 255]);
        let b = Rgba([40, 40, 200, 255]);
        let lin = blend(MixStrategy::LinearLight, a, b, 0.5);
        let spec = blend(MixStrategy::SpectralApprox, a, b, 0.5);
        let spread = |c: Rgba<u8>| c[0].max(c[2]) as i32 - c[1] as i32;
        assert!(spread(spec) >= spread(lin));
    }

    #[test]
    fn cmyk_black_guards_division() {
        assert_eq!(rgb_to_cmyk(Rgba([0, 0, 0, 255])), [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(cmyk_to_rgb([0.0, 0.0, 0.0, 1.0]), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn cmyk_round_trip() {
        for &c in &SAMPLES {
            assert!(close(cmyk_to_rgb(rgb_to_cmyk(c)), c, 1));
        }
    }

    #[test]
    fn strategy_lookup_by_name_and_index() {
        for &s in MixStrategy::all() {
            assert_eq!(MixStrategy::from_index(s.index()), Some(s));
            assert_eq!(s.name().parse::<MixStrategy>(), Ok(s));
        }
        assert_eq!("2".parse::<MixStrategy>(), Ok(MixStrategy::Multiply));
        assert!("bogus".parse::<MixStrategy>().is_err());
        assert!(MixStrategy::from_index(99).is_none());
    }

    #[test]
    fn luminance_uses_rec709_weights() {
        assert!((luminance(Rgba([255, 255, 255, 255])) - 1.0).abs() < 1e-5);
        assert_eq!(luminance(Rgba([0, 0, 0, 255])), 0.0);
        assert!((luminance(Rgba([0, 255, 0, 255])) - 0.7152).abs() < 1e-4);
        assert!((luminance(Rgba([0, 0, 255, 255])) - 0.0722).abs() < 1e-4);
        // Mid grey is darker than half in linear light.
        assert!(luminance(Rgba([128, 128, 128, 255])) < 0.25);
    }

    #[test]
    fn parse_hex_handles_short_and_long_forms() {
        assert_eq!(parse_hex("#fff"), Some(Rgba([255, 255, 255, 255])));
        assert_eq!(parse_hex("#ff0000"), Some(Rgba([255, 0, 0, 255])));
        assert_eq!(parse_hex("22223b"), Some(Rgba([0x22, 0x22, 0x3b, 255])));
        assert_eq!(parse_hex("#12345"), None);
        assert_eq!(parse_hex("#zzzzzz"), None);
        assert_eq!(parse_hex("#+fffff"), None);
        assert_eq!(parse_hex("#-ff"), None);
        assert_eq!(to_hex(Rgba([0x22, 0x22, 0x3b, 255])), "#22223b");
    }

    #[test]
    fn palette_includes_endpoints() {
        let a = Rgba([255, 0, 0, 255]);
        let b = Rgba([0, 0, 255, 255]);
        let p = palette(a, b, 5);
        assert_eq!(p.len(), 5);
        assert_eq!(p[0], a);
        assert_eq!(p[4], b);
        assert_eq!(palette(a, b, 1), vec![a]);
        assert_eq!(palette(a, b, 0), vec![a]);
    }

    #[test]
    fn gradient_interpolates_and_clamps() {
        let red = Rgba([255, 0, 0, 255]);
        let blue = Rgba([0, 0, 255, 255]);
        let stops = [(red, 0.0), (blue, 1.0)];
        assert_eq!(gradient(0.0, &stops), Some(red));
        assert_eq!(gradient(1.0, &stops), Some(blue));
        assert_eq!(gradient(-1.0, &stops), Some(red));
        assert_eq!(gradient(2.0, &stops), Some(blue));
        let mid = gradient(0.5, &stops).unwrap();
        assert_eq!(mid, blend(MixStrategy::LinearLight, red, blue, 0.5));
        assert_eq!(gradient(0.5, &[]), None);
    }
}
