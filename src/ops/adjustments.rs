// ============================================================================
// ADJUSTMENT OPERATIONS — pixel-level color adjustments
// ============================================================================
//
// Every operation takes the source buffer by reference and returns a new one.
// Per-pixel work is parallelized via rayon by rows.  Color matrices follow
// the 4×5 row-major convention (RGBA rows, translation in the fifth column
// in normalized 0..1 units) applied to straight-alpha values.
// ============================================================================

use image::RgbaImage;
use rayon::prelude::*;

/// 4×5 row-major color matrix.
pub type ColorMatrix = [f32; 20];

const LUMA_R: f32 = 0.2126;
const LUMA_G: f32 = 0.7152;
const LUMA_B: f32 = 0.0722;

// ============================================================================
// HELPER: per-pixel transform
// ============================================================================

/// Apply a per-pixel transform.  `transform` receives (r, g, b, a) as f32 in
/// 0..255 and returns (r, g, b, a); results are rounded and clamped.
pub fn apply_pixel_transform<F>(src: &RgbaImage, transform: F) -> RgbaImage
where
    F: Fn(f32, f32, f32, f32) -> (f32, f32, f32, f32) + Sync,
{
    let w = src.width() as usize;
    let h = src.height() as usize;
    if w == 0 || h == 0 {
        return src.clone();
    }

    let src_raw = src.as_raw();
    let mut dst_raw = vec![0u8; w * h * 4];
    let stride = w * 4;

    dst_raw.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        let row_in = &src_raw[y * stride..(y + 1) * stride];
        for x in 0..w {
            let pi = x * 4;
            let (nr, ng, nb, na) = transform(
                row_in[pi] as f32,
                row_in[pi + 1] as f32,
                row_in[pi + 2] as f32,
                row_in[pi + 3] as f32,
            );
            row_out[pi] = nr.round().clamp(0.0, 255.0) as u8;
            row_out[pi + 1] = ng.round().clamp(0.0, 255.0) as u8;
            row_out[pi + 2] = nb.round().clamp(0.0, 255.0) as u8;
            row_out[pi + 3] = na.round().clamp(0.0, 255.0) as u8;
        }
    });

    RgbaImage::from_raw(w as u32, h as u32, dst_raw).unwrap_or_else(|| src.clone())
}

/// Apply per-channel lookup tables (index = input value).
fn apply_luts(src: &RgbaImage, r: &[u8; 256], g: &[u8; 256], b: &[u8; 256], a: &[u8; 256]) -> RgbaImage {
    let mut out = src.clone();
    let buf: &mut [u8] = &mut out;
    buf.par_chunks_mut(4).for_each(|px| {
        px[0] = r[px[0] as usize];
        px[1] = g[px[1] as usize];
        px[2] = b[px[2] as usize];
        px[3] = a[px[3] as usize];
    });
    out
}

// ============================================================================
// COLOR MATRIX
// ============================================================================

pub fn color_matrix_core(src: &RgbaImage, m: &ColorMatrix) -> RgbaImage {
    let m = *m;
    apply_pixel_transform(src, move |r, g, b, a| {
        let (r, g, b, a) = (r / 255.0, g / 255.0, b / 255.0, a / 255.0);
        let row = |i: usize| {
            (m[i] * r + m[i + 1] * g + m[i + 2] * b + m[i + 3] * a + m[i + 4]).clamp(0.0, 1.0) * 255.0
        };
        (row(0), row(5), row(10), row(15))
    })
}

pub const IDENTITY_MATRIX: ColorMatrix = [
    1.0, 0.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0, 0.0,
    0.0, 0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.0, 1.0, 0.0,
];

pub const GRAYSCALE_MATRIX: ColorMatrix = [
    LUMA_R, LUMA_G, LUMA_B, 0.0, 0.0,
    LUMA_R, LUMA_G, LUMA_B, 0.0, 0.0,
    LUMA_R, LUMA_G, LUMA_B, 0.0, 0.0,
    0.0, 0.0, 0.0, 1.0, 0.0,
];

pub const INVERT_MATRIX: ColorMatrix = [
    -1.0, 0.0, 0.0, 0.0, 1.0,
    0.0, -1.0, 0.0, 0.0, 1.0,
    0.0, 0.0, -1.0, 0.0, 1.0,
    0.0, 0.0, 0.0, 1.0, 0.0,
];

pub const SEPIA_MATRIX: ColorMatrix = [
    0.393, 0.769, 0.189, 0.0, 0.0,
    0.349, 0.686, 0.168, 0.0, 0.0,
    0.272, 0.534, 0.131, 0.0, 0.0,
    0.0, 0.0, 0.0, 1.0, 0.0,
];

/// Brightness in -100..100 as an RGB offset of `amount / 100`.
pub fn brightness_matrix(amount: f32) -> ColorMatrix {
    let t = amount.clamp(-100.0, 100.0) / 100.0;
    let mut m = IDENTITY_MATRIX;
    m[4] = t;
    m[9] = t;
    m[14] = t;
    m
}

/// Contrast in -100..100, scaling about mid-gray.
pub fn contrast_matrix(amount: f32) -> ColorMatrix {
    let s = 1.0 + amount.clamp(-100.0, 100.0) / 100.0;
    let t = 0.5 * (1.0 - s);
    [
        s, 0.0, 0.0, 0.0, t,
        0.0, s, 0.0, 0.0, t,
        0.0, 0.0, s, 0.0, t,
        0.0, 0.0, 0.0, 1.0, 0.0,
    ]
}

/// Saturation in -100..100 (-100 = grayscale).
pub fn saturation_matrix(amount: f32) -> ColorMatrix {
    let s = 1.0 + amount.clamp(-100.0, 100.0) / 100.0;
    let inv = 1.0 - s;
    let (r, g, b) = (LUMA_R * inv, LUMA_G * inv, LUMA_B * inv);
    [
        r + s, g, b, 0.0, 0.0,
        r, g + s, b, 0.0, 0.0,
        r, g, b + s, 0.0, 0.0,
        0.0, 0.0, 0.0, 1.0, 0.0,
    ]
}

// ============================================================================
// PER-PIXEL ADJUSTMENTS
// ============================================================================

/// Channels strictly above `threshold` become `255 - value`.
pub fn solarize_core(src: &RgbaImage, threshold: u8) -> RgbaImage {
    let lut: [u8; 256] = std::array::from_fn(|v| if v > threshold as usize { 255 - v as u8 } else { v as u8 });
    let identity: [u8; 256] = std::array::from_fn(|v| v as u8);
    apply_luts(src, &lut, &lut, &lut, &identity)
}

/// Luma `(77r + 150g + 29b) >> 8` at or above `threshold` becomes white, else black.
pub fn threshold_core(src: &RgbaImage, threshold: u8) -> RgbaImage {
    let mut out = src.clone();
    let buf: &mut [u8] = &mut out;
    buf.par_chunks_mut(4).for_each(|px| {
        let luma = (px[0] as u32 * 77 + px[1] as u32 * 150 + px[2] as u32 * 29) >> 8;
        let bw = if luma >= threshold as u32 { 255 } else { 0 };
        px[0] = bw;
        px[1] = bw;
        px[2] = bw;
    });
    out
}

pub fn posterize_core(src: &RgbaImage, levels: u32) -> RgbaImage {
    let scale = (levels.clamp(2, 64) - 1) as f32;
    let lut: [u8; 256] = std::array::from_fn(|v| {
        let bucket = (v as f32 * scale / 255.0).round();
        (bucket * 255.0 / scale).round().clamp(0.0, 255.0) as u8
    });
    let identity: [u8; 256] = std::array::from_fn(|v| v as u8);
    apply_luts(src, &lut, &lut, &lut, &identity)
}

/// Re-quantize each color channel to `bits` bits (1..8).
pub fn color_depth_core(src: &RgbaImage, bits: u32) -> RgbaImage {
    let bits = bits.clamp(1, 8);
    if bits == 8 {
        return src.clone();
    }
    let interval = 255.0 / ((1u32 << bits) as f64 - 1.0);
    let lut: [u8; 256] = std::array::from_fn(|v| ((v as f64 / interval).round() * interval).round() as u8);
    let identity: [u8; 256] = std::array::from_fn(|v| v as u8);
    apply_luts(src, &lut, &lut, &lut, &identity)
}

/// Vibrance in -1..1: boosts low-saturation pixels more than saturated ones.
pub fn vibrance_core(src: &RgbaImage, amount: f32) -> RgbaImage {
    let amount = amount.clamp(-1.0, 1.0);
    if amount.abs() < 0.0001 {
        return src.clone();
    }
    apply_pixel_transform(src, |r, g, b, a| {
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let saturation = (max - min) / 255.0;
        let gray = (r + g + b) / 3.0;
        let factor = if amount >= 0.0 {
            1.0 + amount * (1.0 - saturation)
        } else {
            1.0 + amount
        };
        (
            gray + (r - gray) * factor,
            gray + (g - gray) * factor,
            gray + (b - gray) * factor,
            a,
        )
    })
}

/// BT.709 grayscale followed by a hard 128 threshold; alpha becomes opaque.
pub fn black_and_white_core(src: &RgbaImage) -> RgbaImage {
    let gray = color_matrix_core(src, &GRAYSCALE_MATRIX);
    let table: [u8; 256] = std::array::from_fn(|v| if v < 128 { 0 } else { 255 });
    let opaque = [255u8; 256];
    apply_luts(&gray, &table, &table, &table, &opaque)
}

/// Grayscale modulated by `color`, laid over the source at `strength` (0..1).
pub fn colorize_core(src: &RgbaImage, color: [u8; 4], strength: f32) -> RgbaImage {
    let strength = strength.clamp(0.0, 1.0);
    if strength <= 0.0 {
        return src.clone();
    }
    let tint = [
        color[0] as f32 / 255.0,
        color[1] as f32 / 255.0,
        color[2] as f32 / 255.0,
        color[3] as f32 / 255.0,
    ];
    apply_pixel_transform(src, |r, g, b, a| {
        let gray = LUMA_R * r + LUMA_G * g + LUMA_B * b;
        let (cr, cg, cb, ca) = (gray * tint[0], gray * tint[1], gray * tint[2], a * tint[3]);
        if strength >= 1.0 {
            return (cr, cg, cb, ca);
        }
        // Source-over of the tinted layer at `strength` opacity.
        let top_a = ca / 255.0 * strength;
        let base_a = a / 255.0;
        let out_a = top_a + base_a * (1.0 - top_a);
        if out_a <= 0.0 {
            return (0.0, 0.0, 0.0, 0.0);
        }
        let mix = |top: f32, base: f32| (top * top_a + base * base_a * (1.0 - top_a)) / out_a;
        (mix(cr, r), mix(cg, g), mix(cb, b), out_a * 255.0)
    })
}

// ============================================================================
// HISTOGRAM STRETCH (auto contrast)
// ============================================================================

/// Lowest and highest bins left after discarding `clip_count` samples from each tail.
fn find_range(histogram: &[u32; 256], clip_count: u64) -> (u8, u8) {
    let mut min = 0u8;
    let mut sum = 0u64;
    for (i, &count) in histogram.iter().enumerate() {
        sum += count as u64;
        if sum > clip_count {
            min = i as u8;
            break;
        }
    }
    let mut max = 255u8;
    sum = 0;
    for (i, &count) in histogram.iter().enumerate().rev() {
        sum += count as u64;
        if sum > clip_count {
            max = i as u8;
            break;
        }
    }
    (min, max)
}

fn build_stretch_lut(min: u8, max: u8) -> [u8; 256] {
    std::array::from_fn(|v| {
        let v = v as u8;
        if max <= min {
            v
        } else if v <= min {
            0
        } else if v >= max {
            255
        } else {
            ((v - min) as f32 * 255.0 / (max - min) as f32).round() as u8
        }
    })
}

/// Per-channel histogram stretch, clipping `clip_percent` (0..20) of the
/// samples from each end of every channel's histogram.
pub fn auto_contrast_core(src: &RgbaImage, clip_percent: f32) -> RgbaImage {
    let total = src.width() as u64 * src.height() as u64;
    if total == 0 {
        return src.clone();
    }
    let clip = clip_percent.clamp(0.0, 20.0);
    let clip_count = (total as f64 * (clip as f64 / 100.0)).round() as u64;

    let (hist_r, hist_g, hist_b) = src
        .as_raw()
        .par_chunks(4)
        .fold(
            || ([0u32; 256], [0u32; 256], [0u32; 256]),
            |(mut r, mut g, mut b), px| {
                r[px[0] as usize] += 1;
                g[px[1] as usize] += 1;
                b[px[2] as usize] += 1;
                (r, g, b)
            },
        )
        .reduce(
            || ([0u32; 256], [0u32; 256], [0u32; 256]),
            |(mut r1, mut g1, mut b1), (r2, g2, b2)| {
                for i in 0..256 {
                    r1[i] += r2[i];
                    g1[i] += g2[i];
                    b1[i] += b2[i];
                }
                (r1, g1, b1)
            },
        );

    let (min_r, max_r) = find_range(&hist_r, clip_count);
    let (min_g, max_g) = find_range(&hist_g, clip_count);
    let (min_b, max_b) = find_range(&hist_b, clip_count);
    if max_r <= min_r && max_g <= min_g && max_b <= min_b {
        return src.clone();
    }

    let identity: [u8; 256] = std::array::from_fn(|v| v as u8);
    apply_luts(
        src,
        &build_stretch_lut(min_r, max_r),
        &build_stretch_lut(min_g, max_g),
        &build_stretch_lut(min_b, max_b),
        &identity,
    )
}

// ============================================================================
// TONE: exposure, alpha, gamma, levels, hue
// ============================================================================

/// Exposure in EV stops (-5..5) as an RGB gain of `2^ev`.
pub fn exposure_matrix(ev: f32) -> ColorMatrix {
    let gain = 2.0f32.powf(ev.clamp(-5.0, 5.0));
    let mut m = IDENTITY_MATRIX;
    m[0] = gain;
    m[6] = gain;
    m[12] = gain;
    m
}

/// Alpha scaled to `opacity` percent (0..100).
pub fn alpha_matrix(opacity: f32) -> ColorMatrix {
    let mut m = IDENTITY_MATRIX;
    m[18] = opacity.clamp(0.0, 100.0) / 100.0;
    m
}

/// `255 * (v / 255)^(1 / gamma)` per color channel, gamma in 0.1..10.
pub fn gamma_core(src: &RgbaImage, gamma: f32) -> RgbaImage {
    let inv = 1.0 / gamma.clamp(0.1, 10.0);
    let lut: [u8; 256] =
        std::array::from_fn(|v| (255.0 * (v as f32 / 255.0).powf(inv)).round().clamp(0.0, 255.0) as u8);
    let identity: [u8; 256] = std::array::from_fn(|v| v as u8);
    apply_luts(src, &lut, &lut, &lut, &identity)
}

/// Input and output points of a levels remap, in 0..255.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Levels {
    pub input_black: u8,
    pub input_white: u8,
    /// Midtone exponent, 0.1..10; 1 is linear.
    pub gamma: f32,
    pub output_black: u8,
    pub output_white: u8,
}

impl Levels {
    fn lut(&self) -> [u8; 256] {
        let in_black = self.input_black as f32;
        let in_range = (self.input_white as f32 - in_black).max(1.0);
        let out_black = self.output_black as f32;
        let out_range = self.output_white as f32 - out_black;
        let inv_gamma = 1.0 / self.gamma.clamp(0.1, 10.0);
        std::array::from_fn(|v| {
            let t = ((v as f32 - in_black) / in_range).clamp(0.0, 1.0).powf(inv_gamma);
            (out_black + t * out_range).round().clamp(0.0, 255.0) as u8
        })
    }
}

/// Remap `[input_black, input_white]` onto `[output_black, output_white]`
/// through the midtone gamma.  A reversed output range inverts.
pub fn levels_core(src: &RgbaImage, levels: &Levels) -> RgbaImage {
    let lut = levels.lut();
    let identity: [u8; 256] = std::array::from_fn(|v| v as u8);
    apply_luts(src, &lut, &lut, &lut, &identity)
}

fn rgb_to_hsl(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    let d = max - min;
    if d < 1e-6 {
        return (0.0, 0.0, l);
    }
    let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };
    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };
    (h / 6.0, s, l)
}

fn hue_to_rgb(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (f32, f32, f32) {
    if s <= 0.0 {
        return (l, l, l);
    }
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    (hue_to_rgb(p, q, h + 1.0 / 3.0), hue_to_rgb(p, q, h), hue_to_rgb(p, q, h - 1.0 / 3.0))
}

/// Rotate hue by `degrees` in HSL space, keeping saturation and lightness.
pub fn hue_core(src: &RgbaImage, degrees: f32) -> RgbaImage {
    let shift = degrees.rem_euclid(360.0) / 360.0;
    if shift == 0.0 {
        return src.clone();
    }
    apply_pixel_transform(src, move |r, g, b, a| {
        let (h, s, l) = rgb_to_hsl(r / 255.0, g / 255.0, b / 255.0);
        let (nr, ng, nb) = hsl_to_rgb((h + shift).fract(), s, l);
        (nr * 255.0, ng * 255.0, nb * 255.0, a)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn solarize_white_inverts_every_channel() {
        let src = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
        let out = solarize_core(&src, 128);
        assert!(out.pixels().all(|p| *p == Rgba([0, 0, 0, 255])));
    }

    #[test]
    fn solarize_keeps_values_at_or_below_threshold() {
        let src = RgbaImage::from_pixel(1, 1, Rgba([128, 129, 10, 77]));
        assert_eq!(*solarize_core(&src, 128).get_pixel(0, 0), Rgba([128, 126, 10, 77]));
    }

    #[test]
    fn threshold_splits_on_luma() {
        let src = RgbaImage::from_fn(2, 1, |x, _| if x == 0 { Rgba([200, 200, 200, 90]) } else { Rgba([20, 20, 20, 255]) });
        let out = threshold_core(&src, 128);
        assert_eq!(*out.get_pixel(0, 0), Rgba([255, 255, 255, 90]));
        assert_eq!(*out.get_pixel(1, 0), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn invert_matrix_inverts_and_keeps_alpha() {
        let src = RgbaImage::from_pixel(1, 1, Rgba([10, 100, 250, 42]));
        assert_eq!(*color_matrix_core(&src, &INVERT_MATRIX).get_pixel(0, 0), Rgba([245, 155, 5, 42]));
    }

    #[test]
    fn zero_amount_matrices_are_identity() {
        assert_eq!(brightness_matrix(0.0), IDENTITY_MATRIX);
        assert_eq!(contrast_matrix(0.0), IDENTITY_MATRIX);
        let sat = saturation_matrix(0.0);
        for (a, b) in sat.iter().zip(IDENTITY_MATRIX.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn posterize_two_levels_is_binary() {
        let src = RgbaImage::from_fn(256, 1, |x, _| Rgba([x as u8, x as u8, x as u8, 255]));
        let out = posterize_core(&src, 2);
        assert!(out.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn color_depth_one_bit() {
        let src = RgbaImage::from_pixel(1, 1, Rgba([100, 200, 127, 9]));
        assert_eq!(*color_depth_core(&src, 1).get_pixel(0, 0), Rgba([0, 255, 0, 9]));
    }

    #[test]
    fn auto_contrast_stretches_narrow_range() {
        let src = RgbaImage::from_fn(10, 1, |x, _| {
            let v = 100 + x as u8 * 5;
            Rgba([v, v, v, 255])
        });
        let out = auto_contrast_core(&src, 0.0);
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(9, 0)[0], 255);
    }

    #[test]
    fn auto_contrast_on_flat_image_is_noop() {
        let src = RgbaImage::from_pixel(3, 3, Rgba([50, 60, 70, 255]));
        assert_eq!(auto_contrast_core(&src, 0.5), src);
    }

    #[test]
    fn black_and_white_forces_opaque() {
        let src = RgbaImage::from_pixel(1, 1, Rgba([250, 250, 250, 10]));
        assert_eq!(*black_and_white_core(&src).get_pixel(0, 0), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn full_strength_colorize_with_white_is_grayscale() {
        let src = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 255]));
        let out = colorize_core(&src, [255, 255, 255, 255], 1.0);
        let g = (0.2126f32 * 255.0).round() as u8;
        assert_eq!(*out.get_pixel(0, 0), Rgba([g, g, g, 255]));
    }

    #[test]
    fn neutral_tone_settings_are_identity() {
        let src = RgbaImage::from_fn(16, 16, |x, y| Rgba([(x * 16) as u8, (y * 16) as u8, (x * y) as u8, 200]));
        assert_eq!(exposure_matrix(0.0), IDENTITY_MATRIX);
        assert_eq!(alpha_matrix(100.0), IDENTITY_MATRIX);
        assert_eq!(gamma_core(&src, 1.0), src);
        assert_eq!(hue_core(&src, 360.0), src);
        let linear = Levels { input_black: 0, input_white: 255, gamma: 1.0, output_black: 0, output_white: 255 };
        assert_eq!(levels_core(&src, &linear), src);
    }

    #[test]
    fn one_stop_doubles_color_but_not_alpha() {
        let src = RgbaImage::from_pixel(1, 1, Rgba([40, 100, 200, 80]));
        let out = color_matrix_core(&src, &exposure_matrix(1.0));
        assert_eq!(*out.get_pixel(0, 0), Rgba([80, 200, 255, 80]));
    }

    #[test]
    fn alpha_matrix_scales_only_alpha() {
        let src = RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 200]));
        assert_eq!(*color_matrix_core(&src, &alpha_matrix(50.0)).get_pixel(0, 0), Rgba([10, 20, 30, 100]));
    }

    #[test]
    fn gamma_brightens_midtones_and_pins_ends() {
        let src = RgbaImage::from_fn(3, 1, |x, _| {
            let v = [0u8, 128, 255][x as usize];
            Rgba([v, v, v, 255])
        });
        let out = gamma_core(&src, 2.2);
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert!(out.get_pixel(1, 0)[0] > 128);
        assert_eq!(out.get_pixel(2, 0)[0], 255);
    }

    #[test]
    fn levels_clip_below_black_and_above_white() {
        let src = RgbaImage::from_fn(3, 1, |x, _| {
            let v = [40u8, 130, 220][x as usize];
            Rgba([v, v, v, 255])
        });
        let levels = Levels { input_black: 50, input_white: 210, gamma: 1.0, output_black: 0, output_white: 255 };
        let out = levels_core(&src, &levels);
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(1, 0)[0], 128);
        assert_eq!(out.get_pixel(2, 0)[0], 255);
    }

    #[test]
    fn hue_third_turn_maps_red_to_green() {
        let src = RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 77]));
        assert_eq!(*hue_core(&src, 120.0).get_pixel(0, 0), Rgba([0, 255, 0, 77]));
        assert_eq!(*hue_core(&src, -120.0).get_pixel(0, 0), Rgba([0, 0, 255, 77]));
    }
}
