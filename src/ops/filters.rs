// ============================================================================
// FILTERS — convolution, blurs, median, sharpening, Sobel edges
// ============================================================================

use image::RgbaImage;
use rayon::prelude::*;

use super::sampling::sample_clamped;

/// Shared 3×3 convolution.
///
/// Per color channel: `out = Σ(kernel[i] * neighbour[i]) * gain + bias`, with
/// `bias` in 0..255 units and neighbours outside the image taken from the
/// nearest edge pixel.  Alpha is copied from the source unless
/// `convolve_alpha` is set.  The kernel is row-major, top-left first.
pub fn convolve_3x3(
    src: &RgbaImage,
    kernel: &[f32; 9],
    gain: f32,
    bias: f32,
    convolve_alpha: bool,
) -> RgbaImage {
    let w = src.width() as usize;
    let h = src.height() as usize;
    if w == 0 || h == 0 {
        return src.clone();
    }

    let stride = w * 4;
    let src_raw = src.as_raw();
    let mut dst_raw = vec![0u8; w * h * 4];
    let channels = if convolve_alpha { 4 } else { 3 };

    dst_raw
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row_out)| {
            for x in 0..w {
                let mut acc = [0.0f32; 4];
                for ky in 0..3 {
                    for kx in 0..3 {
                        let k = kernel[ky * 3 + kx];
                        if k == 0.0 {
                            continue;
                        }
                        let p = sample_clamped(src, x as i32 + kx as i32 - 1, y as i32 + ky as i32 - 1);
                        for c in 0..channels {
                            acc[c] += k * p[c];
                        }
                    }
                }
                let pi = x * 4;
                for c in 0..channels {
                    row_out[pi + c] = (acc[c] * gain + bias).round().clamp(0.0, 255.0) as u8;
                }
                if !convolve_alpha {
                    row_out[pi + 3] = src_raw[y * stride + pi + 3];
                }
            }
        });

    RgbaImage::from_raw(w as u32, h as u32, dst_raw).unwrap_or_else(|| src.clone())
}

/// Normalized 1-D Gaussian kernel covering ±3σ.
fn build_gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil() as usize;
    if radius == 0 || sigma <= 0.0 {
        return vec![1.0];
    }
    let len = radius * 2 + 1;
    let mut kernel = vec![0.0f32; len];
    let s2 = 2.0 * sigma * sigma;
    let mut sum = 0.0f32;
    for (i, slot) in kernel.iter_mut().enumerate() {
        let x = i as f32 - radius as f32;
        let v = (-x * x / s2).exp();
        *slot = v;
        sum += v;
    }
    let inv = 1.0 / sum;
    for v in &mut kernel {
        *v *= inv;
    }
    kernel
}

/// Separable Gaussian blur treating everything outside the buffer as
/// transparent black.  Callers that need edge-preserving results pad first
/// (see [`gaussian_blur_padded`]).
pub fn gaussian_blur_decal(src: &RgbaImage, sigma: f32) -> RgbaImage {
    let w = src.width() as usize;
    let h = src.height() as usize;
    if w == 0 || h == 0 {
        return src.clone();
    }

    let kernel = build_gaussian_kernel(sigma);
    if kernel.len() == 1 {
        return src.clone();
    }
    let radius = kernel.len() / 2;
    let buf_in: Vec<f32> = src.as_raw().iter().map(|&b| b as f32).collect();

    // --- Horizontal pass (parallel by row) ---
    let mut buf_h = vec![0.0f32; w * h * 4];
    buf_h.par_chunks_mut(w * 4).enumerate().for_each(|(y, row_out)| {
        let row_in = &buf_in[y * w * 4..(y + 1) * w * 4];
        for x in 0..w {
            let mut acc = [0.0f32; 4];
            for (ki, &kv) in kernel.iter().enumerate() {
                let sx = x as isize + ki as isize - radius as isize;
                if sx < 0 || sx >= w as isize {
                    continue;
                }
                let idx = sx as usize * 4;
                for c in 0..4 {
                    acc[c] += row_in[idx + c] * kv;
                }
            }
            row_out[x * 4..x * 4 + 4].copy_from_slice(&acc);
        }
    });

    // --- Vertical pass (parallel by row) ---
    let mut dst_raw = vec![0u8; w * h * 4];
    dst_raw.par_chunks_mut(w * 4).enumerate().for_each(|(y, row_out)| {
        for x in 0..w {
            let mut acc = [0.0f32; 4];
            for (ki, &kv) in kernel.iter().enumerate() {
                let sy = y as isize + ki as isize - radius as isize;
                if sy < 0 || sy >= h as isize {
                    continue;
                }
                let idx = sy as usize * w * 4 + x * 4;
                for c in 0..4 {
                    acc[c] += buf_h[idx + c] * kv;
                }
            }
            for c in 0..4 {
                row_out[x * 4 + c] = acc[c].round().clamp(0.0, 255.0) as u8;
            }
        }
    });

    RgbaImage::from_raw(w as u32, h as u32, dst_raw).unwrap_or_else(|| src.clone())
}

/// Largest radius [`gaussian_blur_padded`] honours.
pub const MAX_BLUR_RADIUS: u32 = 1000;

/// Gaussian blur without edge darkening: pad by `2 * radius` with clamped
/// edge pixels, blur with `sigma = radius / 3`, crop back to the source size.
/// The radius is clamped to `1..=MAX_BLUR_RADIUS` and the padding never
/// exceeds the larger image side.
pub fn gaussian_blur_padded(src: &RgbaImage, radius: u32) -> RgbaImage {
    let radius = radius.clamp(1, MAX_BLUR_RADIUS);
    if src.width() == 0 || src.height() == 0 {
        return src.clone();
    }
    let sigma = radius as f32 / 3.0;
    let pad = radius.saturating_mul(2).min(src.width().max(src.height()));
    let expanded = RgbaImage::from_fn(src.width() + pad * 2, src.height() + pad * 2, |x, y| {
        super::sampling::pixel_clamped(src, x as i32 - pad as i32, y as i32 - pad as i32)
    });
    let blurred = gaussian_blur_decal(&expanded, sigma);
    image::imageops::crop_imm(&blurred, pad, pad, src.width(), src.height()).to_image()
}

/// Per-channel median over a `(2r+1)²` window with clamped edges.
pub fn median_core(src: &RgbaImage, radius: u32) -> RgbaImage {
    let radius = radius.clamp(1, 5) as i32;
    let w = src.width() as usize;
    let h = src.height() as usize;
    if w == 0 || h == 0 {
        return src.clone();
    }

    let diameter = (radius * 2 + 1) as usize;
    let mut dst_raw = vec![0u8; w * h * 4];
    dst_raw.par_chunks_mut(w * 4).enumerate().for_each(|(y, row_out)| {
        let mut window: [Vec<u8>; 4] = std::array::from_fn(|_| Vec::with_capacity(diameter * diameter));
        for x in 0..w {
            for channel in window.iter_mut() {
                channel.clear();
            }
            for ky in -radius..=radius {
                for kx in -radius..=radius {
                    let p = super::sampling::pixel_clamped(src, x as i32 + kx, y as i32 + ky);
                    for c in 0..4 {
                        window[c].push(p[c]);
                    }
                }
            }
            for c in 0..4 {
                window[c].sort_unstable();
                row_out[x * 4 + c] = window[c][window[c].len() / 2];
            }
        }
    });

    RgbaImage::from_raw(w as u32, h as u32, dst_raw).unwrap_or_else(|| src.clone())
}

/// Unsharp mask: `out = orig + (orig - blurred) * amount` where
/// `|orig - blurred| >= threshold`.  `amount` is a fraction (1.5 = 150 %).
pub fn unsharp_core(src: &RgbaImage, radius: f32, amount: f32, threshold: u8) -> RgbaImage {
    if amount <= 0.0 || src.width() == 0 || src.height() == 0 {
        return src.clone();
    }
    let blurred = gaussian_blur_decal(src, radius / 3.0);
    let w = src.width() as usize;
    let src_raw = src.as_raw();
    let blur_raw = blurred.as_raw();
    let mut dst_raw = src_raw.clone();

    dst_raw.par_chunks_mut(w * 4).enumerate().for_each(|(y, row_out)| {
        let base = y * w * 4;
        for x in 0..w {
            for c in 0..3 {
                let o = src_raw[base + x * 4 + c] as i32;
                let b = blur_raw[base + x * 4 + c] as i32;
                let diff = o - b;
                if diff.abs() < threshold as i32 {
                    continue;
                }
                let v = o as f32 + diff as f32 * amount;
                row_out[x * 4 + c] = v.round().clamp(0.0, 255.0) as u8;
            }
        }
    });

    RgbaImage::from_raw(src.width(), src.height(), dst_raw).unwrap_or_else(|| src.clone())
}

/// 3×3 sharpen kernel: the center gains `4 * strength`, each direct
/// neighbour loses `strength`.  Sums to one, so flat areas are unchanged.
pub fn sharpen_kernel(strength: f32) -> [f32; 9] {
    let s = strength.clamp(0.0, 5.0);
    [0.0, -s, 0.0, -s, 1.0 + 4.0 * s, -s, 0.0, -s, 0.0]
}

/// Sobel gradient magnitude of the `(77r + 150g + 29b) >> 8` luma, scaled by
/// `strength` (0.1..5).  Magnitudes below `threshold` become black; alpha is
/// kept.
pub fn sobel_core(src: &RgbaImage, strength: f32, threshold: u8) -> RgbaImage {
    let w = src.width() as usize;
    let h = src.height() as usize;
    if w == 0 || h == 0 {
        return src.clone();
    }
    let strength = strength.clamp(0.1, 5.0);
    let src_raw = src.as_raw();
    let luma: Vec<i32> = src_raw
        .chunks_exact(4)
        .map(|p| (p[0] as i32 * 77 + p[1] as i32 * 150 + p[2] as i32 * 29) >> 8)
        .collect();
    let at = |x: i32, y: i32| {
        let x = x.clamp(0, w as i32 - 1) as usize;
        let y = y.clamp(0, h as i32 - 1) as usize;
        luma[y * w + x]
    };

    let stride = w * 4;
    let mut dst_raw = vec![0u8; w * h * 4];
    dst_raw.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        let yi = y as i32;
        for x in 0..w {
            let xi = x as i32;
            let gx = -at(xi - 1, yi - 1) + at(xi + 1, yi - 1) - 2 * at(xi - 1, yi) + 2 * at(xi + 1, yi)
                - at(xi - 1, yi + 1)
                + at(xi + 1, yi + 1);
            let gy = -at(xi - 1, yi - 1) - 2 * at(xi, yi - 1) - at(xi + 1, yi - 1)
                + at(xi - 1, yi + 1)
                + 2 * at(xi, yi + 1)
                + at(xi + 1, yi + 1);
            let magnitude = ((gx * gx + gy * gy) as f32).sqrt() * strength;
            let edge = if magnitude >= threshold as f32 { magnitude.round().clamp(0.0, 255.0) as u8 } else { 0 };
            let pi = x * 4;
            row_out[pi..pi + 3].fill(edge);
            row_out[pi + 3] = src_raw[y * stride + pi + 3];
        }
    });

    RgbaImage::from_raw(w as u32, h as u32, dst_raw).unwrap_or_else(|| src.clone())
}

/// Mean of `distance` (1..200) samples along a line at `angle_deg`, centered
/// on each pixel with clamped edges.  All four channels are averaged.
pub fn motion_blur_core(src: &RgbaImage, distance: u32, angle_deg: f32) -> RgbaImage {
    let distance = distance.clamp(1, 200) as i32;
    let w = src.width() as usize;
    let h = src.height() as usize;
    if distance <= 1 || w == 0 || h == 0 {
        return src.clone();
    }

    let (dy, dx) = angle_deg.to_radians().sin_cos();
    let start = -((distance - 1) / 2);
    let end = distance / 2;
    let samples = (end - start + 1) as u32;

    let mut dst_raw = vec![0u8; w * h * 4];
    dst_raw.par_chunks_mut(w * 4).enumerate().for_each(|(y, row_out)| {
        for x in 0..w {
            let mut sum = [0u32; 4];
            for i in start..=end {
                let sx = (x as f32 + i as f32 * dx).round() as i32;
                let sy = (y as f32 + i as f32 * dy).round() as i32;
                let p = super::sampling::pixel_clamped(src, sx, sy);
                for c in 0..4 {
                    sum[c] += p[c] as u32;
                }
            }
            for c in 0..4 {
                row_out[x * 4 + c] = (sum[c] / samples) as u8;
            }
        }
    });

    RgbaImage::from_raw(w as u32, h as u32, dst_raw).unwrap_or_else(|| src.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn noisy(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            Rgba([
                (x * 37 + y * 11) as u8,
                (x * 5 + y * 91) as u8,
                (x ^ y) as u8,
                (100 + x + y) as u8,
            ])
        })
    }

    #[test]
    fn identity_kernel_reproduces_source() {
        let src = noisy(17, 9);
        let out = convolve_3x3(&src, &[0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0], 1.0, 0.0, false);
        assert_eq!(out, src);
    }

    #[test]
    fn bias_shifts_flat_regions() {
        let src = RgbaImage::from_pixel(5, 5, Rgba([100, 100, 100, 255]));
        // Edge-detect kernel sums to zero, so a flat image becomes pure bias.
        let out = convolve_3x3(&src, &[-1.0, -1.0, -1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0], 1.0, 127.0, false);
        assert!(out.pixels().all(|p| *p == Rgba([127, 127, 127, 255])));
    }

    #[test]
    fn kernel_is_normalized() {
        let k = build_gaussian_kernel(2.0);
        assert_eq!(k.len(), 13);
        assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn padded_blur_keeps_flat_images_flat() {
        let src = RgbaImage::from_pixel(12, 7, Rgba([200, 40, 10, 255]));
        let out = gaussian_blur_padded(&src, 5);
        assert_eq!(out.dimensions(), (12, 7));
        assert!(out.pixels().all(|p| *p == Rgba([200, 40, 10, 255])));
    }

    #[test]
    fn huge_radius_is_clamped_not_overflowed() {
        let src = RgbaImage::from_pixel(4, 4, Rgba([90, 90, 90, 255]));
        let out = gaussian_blur_padded(&src, 1_500_000_000);
        assert_eq!(out.dimensions(), (4, 4));
        assert_eq!(gaussian_blur_padded(&src, u32::MAX), gaussian_blur_padded(&src, MAX_BLUR_RADIUS));
    }

    #[test]
    fn unpadded_blur_darkens_edges() {
        let src = RgbaImage::from_pixel(12, 12, Rgba([200, 200, 200, 255]));
        let out = gaussian_blur_decal(&src, 2.0);
        assert!(out.get_pixel(0, 0)[3] < 255);
    }

    #[test]
    fn median_removes_single_outlier() {
        let mut src = RgbaImage::from_pixel(5, 5, Rgba([10, 10, 10, 255]));
        src.put_pixel(2, 2, Rgba([255, 255, 255, 255]));
        let out = median_core(&src, 1);
        assert_eq!(*out.get_pixel(2, 2), Rgba([10, 10, 10, 255]));
    }

    #[test]
    fn unsharp_with_zero_amount_is_copy() {
        let src = noisy(6, 6);
        assert_eq!(unsharp_core(&src, 5.0, 0.0, 0), src);
    }

    #[test]
    fn sharpen_leaves_flat_areas_and_lifts_peaks() {
        let flat = RgbaImage::from_pixel(5, 5, Rgba([90, 90, 90, 255]));
        assert_eq!(convolve_3x3(&flat, &sharpen_kernel(1.0), 1.0, 0.0, false), flat);

        let mut peak = flat.clone();
        peak.put_pixel(2, 2, Rgba([120, 120, 120, 255]));
        let out = convolve_3x3(&peak, &sharpen_kernel(1.0), 1.0, 0.0, false);
        assert_eq!(out.get_pixel(2, 2)[0], 240);
        assert_eq!(out.get_pixel(2, 1)[0], 60);
    }

    #[test]
    fn sobel_finds_vertical_edge_only() {
        let src = RgbaImage::from_fn(6, 4, |x, _| if x < 3 { Rgba([0, 0, 0, 180]) } else { Rgba([255, 255, 255, 180]) });
        let out = sobel_core(&src, 1.0, 20);
        assert_eq!(*out.get_pixel(0, 1), Rgba([0, 0, 0, 180]));
        assert_eq!(*out.get_pixel(5, 1), Rgba([0, 0, 0, 180]));
        assert_eq!(out.get_pixel(2, 1)[0], 255);
        assert_eq!(out.get_pixel(3, 1)[0], 255);
    }

    #[test]
    fn motion_blur_along_stripes_is_noop() {
        // Columns are constant, so a vertical streak changes nothing.
        let src = RgbaImage::from_fn(8, 8, |x, _| Rgba([(x * 30) as u8, 10, 200, 255]));
        assert_eq!(motion_blur_core(&src, 9, 90.0), src);
        assert_eq!(motion_blur_core(&src, 1, 0.0), src);
        let across = motion_blur_core(&src, 9, 0.0);
        assert_ne!(across, src);
        assert_eq!(across.dimensions(), (8, 8));
    }
}
