// ============================================================================
// CANVAS — pixel buffer helpers shared by effects, annotations and the session
// ============================================================================
//
// The pixel buffer throughout the crate is `image::RgbaImage`: RGBA8 with
// straight (non-premultiplied) alpha.  Effects read and return straight alpha;
// annotation coverage is applied through `blend_pixel`, which composites in
// straight alpha as well.
// ============================================================================

use image::{Rgba, RgbaImage};
use kurbo::Rect;

/// Blend modes used by annotation rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlendMode {
    Normal,
    Multiply,
}

/// Composite `top` over `base` at `opacity` (0..1) with the given blend mode.
pub fn blend_pixel(base: Rgba<u8>, top: Rgba<u8>, mode: BlendMode, opacity: f32) -> Rgba<u8> {
    // Fast path: fully transparent top pixel — nothing to blend
    if top[3] == 0 || opacity <= 0.0 {
        return base;
    }

    // Fast path: Normal blend, full opacity, fully opaque top pixel — just overwrite
    if mode == BlendMode::Normal && opacity >= 1.0 && top[3] == 255 {
        return top;
    }

    let opacity = opacity.clamp(0.0, 1.0);

    let base_r = base[0] as f32 / 255.0;
    let base_g = base[1] as f32 / 255.0;
    let base_b = base[2] as f32 / 255.0;
    let base_a = base[3] as f32 / 255.0;

    let top_r = top[0] as f32 / 255.0;
    let top_g = top[1] as f32 / 255.0;
    let top_b = top[2] as f32 / 255.0;
    let top_a = (top[3] as f32 / 255.0) * opacity;

    let (r, g, b) = match mode {
        BlendMode::Normal => (top_r, top_g, top_b),
        BlendMode::Multiply => (base_r * top_r, base_g * top_g, base_b * top_b),
    };

    let out_a = top_a + base_a * (1.0 - top_a);
    if out_a == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let out_r = (r * top_a + base_r * base_a * (1.0 - top_a)) / out_a;
    let out_g = (g * top_a + base_g * base_a * (1.0 - top_a)) / out_a;
    let out_b = (b * top_a + base_b * base_a * (1.0 - top_a)) / out_a;

    Rgba([
        (out_r * 255.0).round().clamp(0.0, 255.0) as u8,
        (out_g * 255.0).round().clamp(0.0, 255.0) as u8,
        (out_b * 255.0).round().clamp(0.0, 255.0) as u8,
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

/// Integer pixel region, always non-empty and inside its image when produced
/// by [`clamp_rect`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Clamp a float rectangle to an image of `width`×`height`.
///
/// The origin is floored and clamped at zero; the far edge is clipped to the
/// image and the size truncated. Returns `None` when nothing is left.
pub fn clamp_rect(rect: Rect, width: u32, height: u32) -> Option<PixelRect> {
    let rect = rect.abs();
    let x = rect.x0.max(0.0).floor();
    let y = rect.y0.max(0.0).floor();
    if x >= width as f64 || y >= height as f64 {
        return None;
    }
    let w = (rect.x1.min(width as f64) - x).floor();
    let h = (rect.y1.min(height as f64) - y).floor();
    if w <= 0.0 || h <= 0.0 {
        return None;
    }
    Some(PixelRect {
        x: x as u32,
        y: y as u32,
        width: w as u32,
        height: h as u32,
    })
}

/// Copy a sub-region into a new buffer.  The region must lie inside `img`.
pub fn extract_region(img: &RgbaImage, region: PixelRect) -> RgbaImage {
    image::imageops::crop_imm(img, region.x, region.y, region.width, region.height).to_image()
}

/// Paste `src` onto `dst` at (`x`, `y`), clipping at the destination edges.
/// With `blend` the pasted pixels are composited source-over instead of replaced.
pub fn paste(dst: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64, blend: bool) {
    let (dw, dh) = (dst.width() as i64, dst.height() as i64);
    for sy in 0..src.height() as i64 {
        let ty = y + sy;
        if ty < 0 || ty >= dh {
            continue;
        }
        for sx in 0..src.width() as i64 {
            let tx = x + sx;
            if tx < 0 || tx >= dw {
                continue;
            }
            let top = *src.get_pixel(sx as u32, sy as u32);
            let out = if blend {
                blend_pixel(*dst.get_pixel(tx as u32, ty as u32), top, BlendMode::Normal, 1.0)
            } else {
                top
            };
            dst.put_pixel(tx as u32, ty as u32, out);
        }
    }
}

/// A `width`×`height` buffer filled with one color.
pub fn filled(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(color))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_normal_blend_overwrites() {
        let out = blend_pixel(Rgba([1, 2, 3, 255]), Rgba([9, 8, 7, 255]), BlendMode::Normal, 1.0);
        assert_eq!(out, Rgba([9, 8, 7, 255]));
    }

    #[test]
    fn half_opacity_mixes() {
        let out = blend_pixel(Rgba([0, 0, 0, 255]), Rgba([255, 255, 255, 255]), BlendMode::Normal, 0.5);
        assert_eq!(out[3], 255);
        assert!((out[0] as i32 - 128).abs() <= 1);
    }

    #[test]
    fn multiply_with_white_keeps_base() {
        let base = Rgba([120, 60, 30, 255]);
        assert_eq!(blend_pixel(base, Rgba([255, 255, 255, 255]), BlendMode::Multiply, 1.0), base);
    }

    #[test]
    fn clamp_rect_clips_to_image() {
        let r = clamp_rect(Rect::new(-10.0, 5.0, 50.0, 200.0), 40, 100).unwrap();
        assert_eq!(r, PixelRect { x: 0, y: 5, width: 40, height: 95 });
        assert!(clamp_rect(Rect::new(50.0, 50.0, 60.0, 60.0), 40, 40).is_none());
        assert!(clamp_rect(Rect::new(5.0, 5.0, 5.0, 9.0), 40, 40).is_none());
    }

    #[test]
    fn clamp_rect_normalizes_reversed_corners() {
        let r = clamp_rect(Rect::new(30.0, 30.0, 10.0, 20.0), 100, 100).unwrap();
        assert_eq!(r, PixelRect { x: 10, y: 20, width: 20, height: 10 });
    }
}
