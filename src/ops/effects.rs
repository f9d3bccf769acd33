// ============================================================================
// PROCEDURAL EFFECTS — stained glass, liquid glass, noise, vignette, RGB split,
// pixelate, oil paint
// ============================================================================
//
// All effects are seeded where they use noise, so identical parameters always
// produce identical output.
// ============================================================================

use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::sampling::{clamp_u8, hash_u32, hash01, pixel_clamped, sample_bilinear};

// ============================================================================
// STAINED GLASS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StainedGlassParams {
    /// Cell pitch in pixels, 6..120.
    pub tile_size: u32,
    /// Cell-center jitter, 0..100 %.
    pub irregularity: f32,
    /// Lead line half-width in pixels, 0..12.
    pub lead_width: f32,
    /// Lead darkness, 0..100 %.
    pub lead_opacity: f32,
    /// Saturation push on the cell color, 0..100 %.
    pub color_boost: f32,
    pub seed: u32,
}

impl Default for StainedGlassParams {
    fn default() -> Self {
        Self {
            tile_size: 22,
            irregularity: 55.0,
            lead_width: 1.8,
            lead_opacity: 85.0,
            color_boost: 20.0,
            seed: 1337,
        }
    }
}

#[derive(Clone, Copy)]
struct GlassCell {
    x: f32,
    y: f32,
    color: Rgba<u8>,
}

fn boost_saturation(c: Rgba<u8>, amount: f32) -> Rgba<u8> {
    let (r, g, b) = (c[0] as f32, c[1] as f32, c[2] as f32);
    let gray = (r + g + b) / 3.0;
    let factor = 1.0 + amount;
    Rgba([
        clamp_u8(gray + (r - gray) * factor),
        clamp_u8(gray + (g - gray) * factor),
        clamp_u8(gray + (b - gray) * factor),
        c[3],
    ])
}

fn lerp_to_black(c: Rgba<u8>, alpha: f32) -> Rgba<u8> {
    let keep = 1.0 - alpha.clamp(0.0, 1.0);
    Rgba([
        clamp_u8(c[0] as f32 * keep),
        clamp_u8(c[1] as f32 * keep),
        clamp_u8(c[2] as f32 * keep),
        c[3],
    ])
}

/// Jittered-grid Voronoi.  Every pixel takes the color of its nearest cell
/// center; pixels close to the bisector of the two nearest centers are
/// darkened toward black to draw the lead.
pub fn stained_glass_core(src: &RgbaImage, params: &StainedGlassParams) -> RgbaImage {
    let tile = params.tile_size.clamp(6, 120);
    let irregularity = params.irregularity.clamp(0.0, 100.0) / 100.0;
    let lead_width = params.lead_width.clamp(0.0, 12.0);
    let lead_opacity = params.lead_opacity.clamp(0.0, 100.0) / 100.0;
    let color_boost = params.color_boost.clamp(0.0, 100.0) / 100.0;

    let (w, h) = src.dimensions();
    if w == 0 || h == 0 {
        return src.clone();
    }
    let right = (w - 1) as f32;
    let bottom = (h - 1) as f32;

    // One ring of padding cells around the image so every pixel sees a full
    // 3×3 neighbourhood.
    let grid_w = w.div_ceil(tile) as usize + 2;
    let grid_h = h.div_ceil(tile) as usize + 2;
    let jitter = tile as f32 * 0.5 * irregularity;
    let base_seed = params.seed.wrapping_mul(2_246_822_519);

    let mut grid = Vec::with_capacity(grid_w * grid_h);
    for gy in 0..grid_h {
        for gx in 0..grid_w {
            let base_x = ((gx as f32 - 1.0) + 0.5) * tile as f32;
            let base_y = ((gy as f32 - 1.0) + 0.5) * tile as f32;
            let ox = (hash01(gx as i32, gy as i32, base_seed ^ 0x9E37_79B9) * 2.0 - 1.0) * jitter;
            let oy = (hash01(gx as i32, gy as i32, base_seed ^ 0x85EB_CA6B) * 2.0 - 1.0) * jitter;
            let cx = (base_x + ox).clamp(0.0, right);
            let cy = (base_y + oy).clamp(0.0, bottom);

            let mut color = *src.get_pixel(cx.round() as u32, cy.round() as u32);
            if color_boost > 0.0 {
                color = boost_saturation(color, color_boost);
            }
            grid.push(GlassCell { x: cx, y: cy, color });
        }
    }

    let width = w as usize;
    let mut dst_raw = vec![0u8; width * h as usize * 4];
    dst_raw.par_chunks_mut(width * 4).enumerate().for_each(|(y, row_out)| {
        let gy = y / tile as usize + 1;
        for x in 0..width {
            let gx = x / tile as usize + 1;
            let mut nearest = f32::MAX;
            let mut second = f32::MAX;
            let mut color = *src.get_pixel(x as u32, y as u32);

            for ny in gy - 1..=gy + 1 {
                for nx in gx - 1..=gx + 1 {
                    let cell = grid[ny * grid_w + nx];
                    let dx = x as f32 - cell.x;
                    let dy = y as f32 - cell.y;
                    let d2 = dx * dx + dy * dy;
                    if d2 < nearest {
                        second = nearest;
                        nearest = d2;
                        color = cell.color;
                    } else if d2 < second {
                        second = d2;
                    }
                }
            }

            if lead_width > 0.0 && second < f32::MAX {
                let edge = (second.sqrt() - nearest.sqrt()) * 0.5;
                if edge < lead_width {
                    color = lerp_to_black(color, lead_opacity * (1.0 - edge / lead_width));
                }
            }
            row_out[x * 4..x * 4 + 4].copy_from_slice(&color.0);
        }
    });

    RgbaImage::from_raw(w, h, dst_raw).unwrap_or_else(|| src.clone())
}

// ============================================================================
// LIQUID GLASS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidGlassParams {
    /// Wave displacement in pixels, 0..35.
    pub distortion: f32,
    /// Edge-driven bending and softening, 0..100 %.
    pub refraction: f32,
    /// Red/blue channel separation, 0..8.
    pub chroma_shift: u32,
    /// Specular highlights, 0..100 %.
    pub gloss: f32,
    /// Wave wavelength scale, 40..220 %.
    pub flow_scale: f32,
    pub seed: u32,
}

impl Default for LiquidGlassParams {
    fn default() -> Self {
        Self {
            distortion: 9.0,
            refraction: 45.0,
            chroma_shift: 1,
            gloss: 40.0,
            flow_scale: 100.0,
            seed: 9421,
        }
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
fn luma01(p: [f32; 4]) -> f32 {
    (0.2126 * p[0] + 0.7152 * p[1] + 0.0722 * p[2]) / 255.0
}

pub fn liquid_glass_core(src: &RgbaImage, params: &LiquidGlassParams) -> RgbaImage {
    let distortion = params.distortion.clamp(0.0, 35.0);
    let refraction = params.refraction.clamp(0.0, 100.0) / 100.0;
    let chroma = params.chroma_shift.min(8);
    let gloss = params.gloss.clamp(0.0, 100.0) / 100.0;
    let flow = params.flow_scale.clamp(40.0, 220.0) / 100.0;

    let (w, h) = src.dimensions();
    if w == 0 || h == 0 || (distortion <= 0.0 && refraction <= 0.0 && chroma == 0 && gloss <= 0.0) {
        return src.clone();
    }

    let freq_x = 0.072 / flow;
    let freq_y = 0.061 / flow;
    let seed_phase = params.seed as f32 * 0.001;
    let width = w as usize;

    let mut dst_raw = vec![0u8; width * h as usize * 4];
    dst_raw.par_chunks_mut(width * 4).enumerate().for_each(|(y, row_out)| {
        let yi = y as i32;
        let fy = y as f32;
        for x in 0..width {
            let xi = x as i32;
            let fx = x as f32;

            let cell_noise = hash01(xi / 18, yi / 18, params.seed) * 2.0 - 1.0;
            let wave1 = (fx * freq_x + fy * (freq_y * 0.45) + cell_noise * 2.4 + seed_phase).sin();
            let wave2 = (fx * (freq_x * 0.58) - fy * (freq_y * 1.12) + cell_noise * 1.7).cos();
            let wave3 = ((fx + fy) * (freq_x * 0.62) + cell_noise * 3.1).sin();

            let mut off_x = distortion * (0.52 * wave1 + 0.26 * wave3);
            let mut off_y = distortion * (0.46 * wave2 - 0.22 * wave3);

            if refraction > 0.0 {
                let grad_x = luma01(super::sampling::sample_clamped(src, xi + 1, yi))
                    - luma01(super::sampling::sample_clamped(src, xi - 1, yi));
                let grad_y = luma01(super::sampling::sample_clamped(src, xi, yi + 1))
                    - luma01(super::sampling::sample_clamped(src, xi, yi - 1));
                let edge = (grad_x * grad_x + grad_y * grad_y).sqrt();
                let boost = 1.0 + edge * 3.2 * refraction;
                off_x = off_x * boost + grad_x * refraction * distortion * 3.0;
                off_y = off_y * boost + grad_y * refraction * distortion * 3.0;
            }

            let sx = fx + off_x;
            let sy = fy + off_y;

            let (mut r, mut g, mut b, a) = if chroma > 0 {
                let shift = chroma as f32 * 0.75;
                let pr = sample_bilinear(src, sx + shift, sy - shift * 0.15);
                let pg = sample_bilinear(src, sx, sy);
                let pb = sample_bilinear(src, sx - shift, sy + shift * 0.15);
                (pr[0], pg[1], pb[2], pg[3])
            } else {
                let p = sample_bilinear(src, sx, sy);
                (p[0], p[1], p[2], p[3])
            };

            if refraction > 0.0 {
                let n1 = sample_bilinear(src, sx + 1.0, sy);
                let n2 = sample_bilinear(src, sx - 1.0, sy);
                let n3 = sample_bilinear(src, sx, sy + 1.0);
                let n4 = sample_bilinear(src, sx, sy - 1.0);
                let mix = 0.06 + 0.18 * refraction;
                r = lerp(r, (n1[0] + n2[0] + n3[0] + n4[0]) * 0.25, mix);
                g = lerp(g, (n1[1] + n2[1] + n3[1] + n4[1]) * 0.25, mix);
                b = lerp(b, (n1[2] + n2[2] + n3[2] + n4[2]) * 0.25, mix);
            }

            let ridge = (wave1 - wave2).abs();
            let micro = wave3.abs();
            let spec = (1.0 - ridge * 1.35).max(0.0).powi(6);
            let streak = (1.0 - micro * 1.55).max(0.0).powi(4);
            let lum = (0.2126 * r + 0.7152 * g + 0.0722 * b) / 255.0;
            let highlight = gloss * (spec * 0.62 + streak * 0.24 + lum.max(0.0).powf(2.8) * 0.14);
            r += highlight * 88.0;
            g += highlight * 102.0;
            b += highlight * 126.0;

            // Faint cool tint.
            let tint = (0.04 + 0.10 * refraction) * (0.4 + 0.6 * gloss);
            r = lerp(r, r + 6.0, tint);
            g = lerp(g, g + 12.0, tint);
            b = lerp(b, b + 22.0, tint);

            row_out[x * 4] = clamp_u8(r);
            row_out[x * 4 + 1] = clamp_u8(g);
            row_out[x * 4 + 2] = clamp_u8(b);
            row_out[x * 4 + 3] = clamp_u8(a);
        }
    });

    RgbaImage::from_raw(w, h, dst_raw).unwrap_or_else(|| src.clone())
}

// ============================================================================
// ADD NOISE
// ============================================================================

/// Per-channel uniform noise.  `amount` 0..100 maps to an amplitude of
/// 0..127 levels; alpha is untouched.
pub fn add_noise_core(src: &RgbaImage, amount: f32, seed: u32) -> RgbaImage {
    let amplitude = (amount.clamp(0.0, 100.0) * 1.27).round() as i32;
    if amplitude <= 0 {
        return src.clone();
    }
    let seed = seed.wrapping_mul(747_796_405);
    let mut out = src.clone();
    let buf: &mut [u8] = &mut out;
    buf.par_chunks_mut(4).enumerate().for_each(|(i, px)| {
        let noise = |h: u32| ((h & 0xFF) as i32 - 128) * amplitude / 128;
        let mut h = hash_u32(i as u32 ^ seed);
        let nr = noise(h);
        h = hash_u32(h ^ 0x9E37_79B9);
        let ng = noise(h);
        h = hash_u32(h ^ 0x85EB_CA6B);
        let nb = noise(h);
        px[0] = (px[0] as i32 + nr).clamp(0, 255) as u8;
        px[1] = (px[1] as i32 + ng).clamp(0, 255) as u8;
        px[2] = (px[2] as i32 + nb).clamp(0, 255) as u8;
    });
    out
}

// ============================================================================
// VIGNETTE
// ============================================================================

/// Darken toward the corners.  `strength` 0..1; `radius` 0.05..0.999 is the
/// normalized distance where darkening starts, reaching full strength at the
/// corners through a smoothstep.
pub fn vignette_core(src: &RgbaImage, strength: f32, radius: f32) -> RgbaImage {
    let strength = strength.clamp(0.0, 1.0);
    let radius = radius.clamp(0.05, 0.999);
    let (w, h) = src.dimensions();
    if strength <= 0.0 || w == 0 || h == 0 {
        return src.clone();
    }

    let cx = (w - 1) as f32 * 0.5;
    let cy = (h - 1) as f32 * 0.5;
    let inv_cx = if cx > 0.0 { 1.0 / cx } else { 1.0 };
    let inv_cy = if cy > 0.0 { 1.0 / cy } else { 1.0 };
    let width = w as usize;

    let mut out = src.clone();
    let buf: &mut [u8] = &mut out;
    buf.par_chunks_mut(width * 4).enumerate().for_each(|(y, row)| {
        let dy = (y as f32 - cy) * inv_cy;
        for x in 0..width {
            let dx = (x as f32 - cx) * inv_cx;
            let dist = (dx * dx + dy * dy).sqrt() * std::f32::consts::FRAC_1_SQRT_2;
            let t = ((dist - radius) / (1.0 - radius)).clamp(0.0, 1.0);
            let falloff = t * t * (3.0 - 2.0 * t);
            let factor = 1.0 - strength * falloff;
            for c in 0..3 {
                row[x * 4 + c] = clamp_u8(row[x * 4 + c] as f32 * factor);
            }
        }
    });
    out
}

// ============================================================================
// RGB SPLIT
// ============================================================================

/// Integer per-channel pixel offsets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChannelOffsets {
    pub red: (i32, i32),
    pub green: (i32, i32),
    pub blue: (i32, i32),
}

/// Each channel is read from `(x - dx, y - dy)` with clamped edges and
/// weighted by that sample's alpha; output alpha is the mean of the three
/// sampled alphas.
pub fn rgb_split_core(src: &RgbaImage, offsets: &ChannelOffsets) -> RgbaImage {
    let (w, h) = src.dimensions();
    if w == 0 || h == 0 {
        return src.clone();
    }
    let width = w as usize;
    let mut dst_raw = vec![0u8; width * h as usize * 4];
    dst_raw.par_chunks_mut(width * 4).enumerate().for_each(|(y, row_out)| {
        let yi = y as i32;
        for x in 0..width {
            let xi = x as i32;
            let pr = pixel_clamped(src, xi - offsets.red.0, yi - offsets.red.1);
            let pg = pixel_clamped(src, xi - offsets.green.0, yi - offsets.green.1);
            let pb = pixel_clamped(src, xi - offsets.blue.0, yi - offsets.blue.1);
            row_out[x * 4] = (pr[0] as u32 * pr[3] as u32 / 255) as u8;
            row_out[x * 4 + 1] = (pg[1] as u32 * pg[3] as u32 / 255) as u8;
            row_out[x * 4 + 2] = (pb[2] as u32 * pb[3] as u32 / 255) as u8;
            row_out[x * 4 + 3] = ((pr[3] as u32 + pg[3] as u32 + pb[3] as u32) / 3) as u8;
        }
    });
    RgbaImage::from_raw(w, h, dst_raw).unwrap_or_else(|| src.clone())
}

// ============================================================================
// PIXELATE
// ============================================================================

/// Replace each `block`×`block` tile with its mean color.  Edge tiles are
/// averaged over their clipped area.
pub fn pixelate_core(src: &RgbaImage, block: u32) -> RgbaImage {
    let block = block.max(2) as usize;
    let (w, h) = src.dimensions();
    if w == 0 || h == 0 {
        return src.clone();
    }
    let width = w as usize;
    let height = h as usize;
    let raw = src.as_raw();

    let mut dst_raw = vec![0u8; width * height * 4];
    dst_raw
        .par_chunks_mut(width * 4 * block)
        .enumerate()
        .for_each(|(band, band_out)| {
            let y0 = band * block;
            let rows = band_out.len() / (width * 4);
            let mut bx = 0;
            while bx < width {
                let cols = block.min(width - bx);
                let mut sum = [0u64; 4];
                for dy in 0..rows {
                    let base = (y0 + dy) * width * 4;
                    for dx in 0..cols {
                        let i = base + (bx + dx) * 4;
                        for c in 0..4 {
                            sum[c] += raw[i + c] as u64;
                        }
                    }
                }
                let n = (rows * cols) as u64;
                let mean: [u8; 4] = std::array::from_fn(|c| ((sum[c] + n / 2) / n) as u8);
                for dy in 0..rows {
                    for dx in 0..cols {
                        let i = dy * width * 4 + (bx + dx) * 4;
                        band_out[i..i + 4].copy_from_slice(&mean);
                    }
                }
                bx += block;
            }
        });

    RgbaImage::from_raw(w, h, dst_raw).unwrap_or_else(|| src.clone())
}

// ============================================================================
// OIL PAINT
// ============================================================================

/// Each pixel takes the mean color of the most populated intensity bucket in
/// its `(2r+1)²` neighbourhood.  Radius 1..6, levels 8..64; ties go to the
/// darker bucket.
pub fn oil_paint_core(src: &RgbaImage, radius: u32, levels: u32) -> RgbaImage {
    let r = radius.clamp(1, 6) as i32;
    let levels = levels.clamp(8, 64) as usize;
    let (w, h) = src.dimensions();
    if w == 0 || h == 0 {
        return src.clone();
    }
    let width = w as usize;

    let mut dst_raw = vec![0u8; width * h as usize * 4];
    dst_raw.par_chunks_mut(width * 4).enumerate().for_each(|(y, row_out)| {
        let mut count = vec![0u32; levels];
        let mut sums = vec![[0u32; 4]; levels];
        for x in 0..width {
            count.fill(0);
            sums.fill([0; 4]);
            for ky in -r..=r {
                for kx in -r..=r {
                    let p = pixel_clamped(src, x as i32 + kx, y as i32 + ky);
                    let bucket = ((p[0] as usize + p[1] as usize + p[2] as usize) * levels / 768).min(levels - 1);
                    count[bucket] += 1;
                    for c in 0..4 {
                        sums[bucket][c] += p[c] as u32;
                    }
                }
            }
            let best = (1..levels).fold(0, |best, i| if count[i] > count[best] { i } else { best });
            let n = count[best].max(1);
            for c in 0..4 {
                row_out[x * 4 + c] = (sums[best][c] / n) as u8;
            }
        }
    });

    RgbaImage::from_raw(w, h, dst_raw).unwrap_or_else(|| src.clone())
}
