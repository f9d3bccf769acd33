// ============================================================================
// SAMPLING — coordinate lookup, bilinear interpolation, deterministic hashing
// ============================================================================

use image::{Rgba, RgbaImage};

/// Clamp-sample a pixel (nearest edge pixel outside the image).
#[inline]
pub fn sample_clamped(img: &RgbaImage, x: i32, y: i32) -> [f32; 4] {
    let p = pixel_clamped(img, x, y);
    [p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32]
}

#[inline]
pub fn pixel_clamped(img: &RgbaImage, x: i32, y: i32) -> Rgba<u8> {
    let cx = x.clamp(0, img.width() as i32 - 1) as u32;
    let cy = y.clamp(0, img.height() as i32 - 1) as u32;
    *img.get_pixel(cx, cy)
}

/// Wrap-sample a pixel (the image tiles infinitely in both directions).
#[inline]
pub fn sample_wrapped(img: &RgbaImage, x: i32, y: i32) -> [f32; 4] {
    let cx = x.rem_euclid(img.width() as i32) as u32;
    let cy = y.rem_euclid(img.height() as i32) as u32;
    let p = img.get_pixel(cx, cy);
    [p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32]
}

/// Bilinear-sample at fractional coordinates, clamping at the edges.
#[inline]
pub fn sample_bilinear(img: &RgbaImage, fx: f32, fy: f32) -> [f32; 4] {
    let x0 = fx.floor() as i32;
    let y0 = fy.floor() as i32;
    let dx = fx - x0 as f32;
    let dy = fy - y0 as f32;

    let p00 = sample_clamped(img, x0, y0);
    let p10 = sample_clamped(img, x0 + 1, y0);
    let p01 = sample_clamped(img, x0, y0 + 1);
    let p11 = sample_clamped(img, x0 + 1, y0 + 1);

    let mut out = [0.0f32; 4];
    for c in 0..4 {
        out[c] = p00[c] * (1.0 - dx) * (1.0 - dy)
            + p10[c] * dx * (1.0 - dy)
            + p01[c] * (1.0 - dx) * dy
            + p11[c] * dx * dy;
    }
    out
}

/// Bilinear sample rounded back to RGBA8.
#[inline]
pub fn bilinear_rgba(img: &RgbaImage, fx: f32, fy: f32) -> Rgba<u8> {
    to_rgba(sample_bilinear(img, fx, fy))
}

#[inline]
pub fn to_rgba(c: [f32; 4]) -> Rgba<u8> {
    Rgba([clamp_u8(c[0]), clamp_u8(c[1]), clamp_u8(c[2]), clamp_u8(c[3])])
}

#[inline]
pub fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Rec.709 luminance of a straight-alpha pixel in 0..1.
#[inline]
pub fn luminance(p: Rgba<u8>) -> f32 {
    (0.2126 * p[0] as f32 + 0.7152 * p[1] as f32 + 0.0722 * p[2] as f32) / 255.0
}

/// Integer avalanche hash used for all seeded noise.
#[inline]
pub fn hash_u32(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x7FEB352D);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846CA68B);
    x ^= x >> 16;
    x
}

/// Hash a lattice coordinate to [0, 1].
#[inline]
pub fn hash01(x: i32, y: i32, seed: u32) -> f32 {
    let h = (x as u32)
        .wrapping_mul(374761393)
        .wrapping_add((y as u32).wrapping_mul(668265263))
        ^ seed;
    (hash_u32(h) & 0x00FF_FFFF) as f32 / 16_777_215.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient() -> RgbaImage {
        RgbaImage::from_fn(4, 4, |x, y| Rgba([(x * 60) as u8, (y * 60) as u8, 0, 255]))
    }

    #[test]
    fn clamped_lookup_uses_edge_pixels() {
        let img = gradient();
        assert_eq!(sample_clamped(&img, -5, -5), [0.0, 0.0, 0.0, 255.0]);
        assert_eq!(sample_clamped(&img, 99, 1), [180.0, 60.0, 0.0, 255.0]);
    }

    #[test]
    fn wrapped_lookup_tiles() {
        let img = gradient();
        assert_eq!(sample_wrapped(&img, -1, 4), sample_clamped(&img, 3, 0));
    }

    #[test]
    fn bilinear_on_integer_coords_is_exact() {
        let img = gradient();
        assert_eq!(bilinear_rgba(&img, 2.0, 1.0), *img.get_pixel(2, 1));
    }

    #[test]
    fn bilinear_midpoint_averages_neighbours() {
        let img = gradient();
        let p = sample_bilinear(&img, 0.5, 0.0);
        assert!((p[0] - 30.0).abs() < 1e-4);
    }

    #[test]
    fn hash01_is_deterministic_and_in_range() {
        for i in 0..100 {
            let v = hash01(i, -i, 1337);
            assert_eq!(v, hash01(i, -i, 1337));
            assert!((0.0..=1.0).contains(&v));
        }
        assert_ne!(hash01(3, 4, 1), hash01(3, 4, 2));
    }
}
