// ============================================================================
// TRANSFORM OPERATIONS — inverse-mapped warps, homography, rotate/flip/resize
// ============================================================================
//
// Every warp is an inverse mapping: for each destination pixel we compute the
// source coordinate and resample it bilinearly.  Rows run in parallel.
// ============================================================================

use image::{Rgba, RgbaImage, imageops};
use kurbo::Point;
use rayon::prelude::*;

use super::sampling::bilinear_rgba;

/// Pivot magnitude below which the homography system counts as singular.
const SINGULAR_TOLERANCE: f64 = 1e-12;

/// Build a new image by evaluating `mapper(x, y)` for every destination pixel.
fn map_pixels<F>(src: &RgbaImage, mapper: F) -> RgbaImage
where
    F: Fn(u32, u32) -> Rgba<u8> + Sync,
{
    let w = src.width() as usize;
    let h = src.height() as usize;
    if w == 0 || h == 0 {
        return src.clone();
    }
    let mut dst_raw = vec![0u8; w * h * 4];
    dst_raw.par_chunks_mut(w * 4).enumerate().for_each(|(y, row_out)| {
        for x in 0..w {
            let px = mapper(x as u32, y as u32);
            row_out[x * 4..x * 4 + 4].copy_from_slice(&px.0);
        }
    });
    RgbaImage::from_raw(w as u32, h as u32, dst_raw).unwrap_or_else(|| src.clone())
}

/// Radial region shared by pinch/bulge and twirl: center and radius derived
/// from percentages of the image size.
#[derive(Clone, Copy, Debug)]
struct RadialRegion {
    cx: f32,
    cy: f32,
    radius: f32,
}

impl RadialRegion {
    fn new(img: &RgbaImage, radius_pct: f32, center_x_pct: f32, center_y_pct: f32) -> Self {
        let right = img.width().saturating_sub(1) as f32;
        let bottom = img.height().saturating_sub(1) as f32;
        let min_side = img.width().min(img.height()) as f32;
        Self {
            cx: center_x_pct.clamp(0.0, 100.0) / 100.0 * right,
            cy: center_y_pct.clamp(0.0, 100.0) / 100.0 * bottom,
            radius: (min_side * radius_pct.clamp(1.0, 100.0) / 100.0).max(1.0),
        }
    }
}

// ============================================================================
// PINCH / BULGE
// ============================================================================

/// `strength` in -1..1 (negative pinches, positive bulges).
///
/// Inside the radius the source distance is `d / amount` with
/// `amount = 1 + strength * (1 - (d / radius)^2)`, floored at 0.05.
pub fn pinch_bulge_core(
    src: &RgbaImage,
    strength: f32,
    radius_pct: f32,
    center_x_pct: f32,
    center_y_pct: f32,
) -> RgbaImage {
    let strength = strength.clamp(-1.0, 1.0);
    if strength.abs() < 0.0001 {
        return src.clone();
    }
    let region = RadialRegion::new(src, radius_pct, center_x_pct, center_y_pct);

    map_pixels(src, |x, y| {
        let dx = x as f32 - region.cx;
        let dy = y as f32 - region.cy;
        let dist = (dx * dx + dy * dy).sqrt();
        if dist >= region.radius || dist <= 0.0001 {
            return *src.get_pixel(x, y);
        }
        let n = dist / region.radius;
        let amount = (1.0 + strength * (1.0 - n * n)).max(0.05);
        let scale = 1.0 / amount;
        bilinear_rgba(src, region.cx + dx * scale, region.cy + dy * scale)
    })
}

// ============================================================================
// TWIRL
// ============================================================================

/// Rotate each pixel about the center by `angle * (1 - d / radius)` degrees.
pub fn twirl_core(
    src: &RgbaImage,
    angle_deg: f32,
    radius_pct: f32,
    center_x_pct: f32,
    center_y_pct: f32,
) -> RgbaImage {
    let angle = angle_deg.clamp(-720.0, 720.0).to_radians();
    if angle.abs() < 0.0001 {
        return src.clone();
    }
    let region = RadialRegion::new(src, radius_pct, center_x_pct, center_y_pct);

    map_pixels(src, |x, y| {
        let dx = x as f32 - region.cx;
        let dy = y as f32 - region.cy;
        let dist = (dx * dx + dy * dy).sqrt();
        if dist >= region.radius || dist <= 0.0001 {
            return *src.get_pixel(x, y);
        }
        let twirl = angle * (1.0 - dist / region.radius);
        let theta = dy.atan2(dx) - twirl;
        bilinear_rgba(src, region.cx + dist * theta.cos(), region.cy + dist * theta.sin())
    })
}

// ============================================================================
// DISPLACEMENT MAP
// ============================================================================

/// Offset each pixel by its own red (x) and green (y) channel:
/// `d = (channel / 255 - 0.5) * 2 * amount`.
pub fn displacement_map_core(src: &RgbaImage, amount_x: f32, amount_y: f32) -> RgbaImage {
    if amount_x.abs() < 0.0001 && amount_y.abs() < 0.0001 {
        return src.clone();
    }
    map_pixels(src, |x, y| {
        let map = src.get_pixel(x, y);
        let dx = (map[0] as f32 / 255.0 - 0.5) * 2.0 * amount_x;
        let dy = (map[1] as f32 / 255.0 - 0.5) * 2.0 * amount_y;
        bilinear_rgba(src, x as f32 + dx, y as f32 + dy)
    })
}

// ============================================================================
// HOMOGRAPHY
// ============================================================================

/// Solve an 8×8 system `a · x = b` by Gauss-Jordan elimination with partial
/// pivoting.  Returns `None` when a pivot falls below the singular tolerance.
pub fn solve_linear_system(a: &[[f64; 8]; 8], b: &[f64; 8]) -> Option<[f64; 8]> {
    const N: usize = 8;
    let mut aug = [[0.0f64; N + 1]; N];
    for i in 0..N {
        aug[i][..N].copy_from_slice(&a[i]);
        aug[i][N] = b[i];
    }

    for col in 0..N {
        let mut pivot = col;
        let mut max = aug[col][col].abs();
        for (row, r) in aug.iter().enumerate().skip(col + 1) {
            if r[col].abs() > max {
                max = r[col].abs();
                pivot = row;
            }
        }
        if max < SINGULAR_TOLERANCE {
            return None;
        }
        aug.swap(col, pivot);

        let div = aug[col][col];
        for v in aug[col][col..].iter_mut() {
            *v /= div;
        }

        let pivot_row = aug[col];
        for (row, r) in aug.iter_mut().enumerate() {
            if row == col {
                continue;
            }
            let factor = r[col];
            if factor.abs() < SINGULAR_TOLERANCE {
                continue;
            }
            for j in col..=N {
                r[j] -= factor * pivot_row[j];
            }
        }
    }

    let mut x = [0.0f64; N];
    for (i, slot) in x.iter_mut().enumerate() {
        *slot = aug[i][N];
    }
    Some(x)
}

/// Projective mapping taking each `from[i]` onto `to[i]`, as a row-major
/// 3×3 matrix with `h[8] = 1`.
pub fn solve_homography(from: &[Point; 4], to: &[Point; 4]) -> Option<[f64; 9]> {
    let mut a = [[0.0f64; 8]; 8];
    let mut b = [0.0f64; 8];
    for i in 0..4 {
        let (x, y) = (from[i].x, from[i].y);
        let (u, v) = (to[i].x, to[i].y);
        a[i * 2] = [x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y];
        b[i * 2] = u;
        a[i * 2 + 1] = [0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y];
        b[i * 2 + 1] = v;
    }
    let s = solve_linear_system(&a, &b)?;
    Some([s[0], s[1], s[2], s[3], s[4], s[5], s[6], s[7], 1.0])
}

/// Corner offsets for a perspective warp, in pixels, clockwise from top-left.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CornerOffsets {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_right: Point,
    pub bottom_left: Point,
}

impl CornerOffsets {
    pub fn is_zero(&self) -> bool {
        [self.top_left, self.top_right, self.bottom_right, self.bottom_left]
            .iter()
            .all(|p| p.x == 0.0 && p.y == 0.0)
    }
}

/// Move the image corners by `offsets`.  Destination pixels whose inverse
/// mapping lands outside the source become transparent; a singular system
/// leaves the image unchanged.
pub fn perspective_warp_core(src: &RgbaImage, offsets: &CornerOffsets) -> RgbaImage {
    if offsets.is_zero() || src.width() == 0 || src.height() == 0 {
        return src.clone();
    }
    let right = (src.width() - 1) as f64;
    let bottom = (src.height() - 1) as f64;
    let src_quad = [
        Point::new(0.0, 0.0),
        Point::new(right, 0.0),
        Point::new(right, bottom),
        Point::new(0.0, bottom),
    ];
    let dst_quad = [
        Point::new(offsets.top_left.x, offsets.top_left.y),
        Point::new(right + offsets.top_right.x, offsets.top_right.y),
        Point::new(right + offsets.bottom_right.x, bottom + offsets.bottom_right.y),
        Point::new(offsets.bottom_left.x, bottom + offsets.bottom_left.y),
    ];
    // Inverse mapping: destination quad back onto the source rectangle.
    let Some(inv) = solve_homography(&dst_quad, &src_quad) else {
        return src.clone();
    };

    map_pixels(src, |x, y| {
        let (fx, fy) = (x as f64, y as f64);
        let w = inv[6] * fx + inv[7] * fy + inv[8];
        if w.abs() < 1e-8 {
            return Rgba([0, 0, 0, 0]);
        }
        let sx = (inv[0] * fx + inv[1] * fy + inv[2]) / w;
        let sy = (inv[3] * fx + inv[4] * fy + inv[5]) / w;
        // Tolerate float noise on the boundary.
        const EPS: f64 = 1e-6;
        if sx < -EPS || sy < -EPS || sx > right + EPS || sy > bottom + EPS {
            return Rgba([0, 0, 0, 0]);
        }
        bilinear_rgba(src, sx.clamp(0.0, right) as f32, sy.clamp(0.0, bottom) as f32)
    })
}

// ============================================================================
// ROTATE / FLIP / RESIZE (self-sizing)
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    Cw90,
    Cw180,
    Cw270,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlipAxis {
    #[default]
    Horizontal,
    Vertical,
}

pub fn rotate_core(src: &RgbaImage, rotation: Rotation) -> RgbaImage {
    match rotation {
        Rotation::Cw90 => imageops::rotate90(src),
        Rotation::Cw180 => imageops::rotate180(src),
        Rotation::Cw270 => imageops::rotate270(src),
    }
}

pub fn flip_core(src: &RgbaImage, axis: FlipAxis) -> RgbaImage {
    match axis {
        FlipAxis::Horizontal => imageops::flip_horizontal(src),
        FlipAxis::Vertical => imageops::flip_vertical(src),
    }
}

/// Bilinear resize; zero target dimensions are raised to 1.
pub fn resize_core(src: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let (w, h) = (width.max(1), height.max(1));
    if (w, h) == src.dimensions() {
        return src.clone();
    }
    imageops::resize(src, w, h, imageops::FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            Rgba([(x * 13 % 256) as u8, (y * 29 % 256) as u8, ((x + y) * 7 % 256) as u8, 255])
        })
    }

    #[test]
    fn zero_offsets_return_identical_buffer() {
        let src = checker(31, 17);
        assert_eq!(perspective_warp_core(&src, &CornerOffsets::default()), src);
    }

    #[test]
    fn uniform_shift_translates_content() {
        let src = checker(40, 20);
        let d = Point::new(5.0, 0.0);
        let offsets = CornerOffsets { top_left: d, top_right: d, bottom_right: d, bottom_left: d };
        let out = perspective_warp_core(&src, &offsets);
        assert_eq!(*out.get_pixel(15, 10), *src.get_pixel(10, 10));
        // Left strip maps outside the source.
        assert_eq!(out.get_pixel(2, 10)[3], 0);
    }

    #[test]
    fn collapsed_quad_is_singular_and_noop() {
        let src = checker(10, 10);
        let offsets = CornerOffsets {
            top_left: Point::ZERO,
            top_right: Point::new(-9.0, 0.0),
            bottom_right: Point::new(-9.0, -9.0),
            bottom_left: Point::new(0.0, -9.0),
        };
        assert_eq!(perspective_warp_core(&src, &offsets), src);
    }

    #[test]
    fn homography_of_identical_quads_is_identity() {
        let q = [Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 5.0), Point::new(0.0, 5.0)];
        let h = solve_homography(&q, &q).unwrap();
        let expected = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        for (a, b) in h.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn linear_solver_needs_pivoting() {
        // Zero on the first diagonal entry forces a row swap.
        let mut a = [[0.0f64; 8]; 8];
        for (i, row) in a.iter_mut().enumerate() {
            row[(i + 1) % 8] = (i + 1) as f64;
        }
        let b = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let x = solve_linear_system(&a, &b).unwrap();
        for v in x {
            assert!((v - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn zero_strength_warps_are_copies() {
        let src = checker(16, 16);
        assert_eq!(pinch_bulge_core(&src, 0.0, 50.0, 50.0, 50.0), src);
        assert_eq!(twirl_core(&src, 0.0, 50.0, 50.0, 50.0), src);
        assert_eq!(displacement_map_core(&src, 0.0, 0.0), src);
    }

    #[test]
    fn pixels_outside_radius_pass_through() {
        let src = checker(40, 40);
        let out = twirl_core(&src, 180.0, 25.0, 50.0, 50.0);
        assert_eq!(out.get_pixel(0, 0), src.get_pixel(0, 0));
        assert_eq!(out.get_pixel(39, 39), src.get_pixel(39, 39));
        let out = pinch_bulge_core(&src, 1.0, 25.0, 50.0, 50.0);
        assert_eq!(out.get_pixel(0, 39), src.get_pixel(0, 39));
    }

    #[test]
    fn rotate_and_resize_change_dimensions() {
        let src = checker(8, 3);
        assert_eq!(rotate_core(&src, Rotation::Cw90).dimensions(), (3, 8));
        assert_eq!(resize_core(&src, 16, 0).dimensions(), (16, 1));
        assert_eq!(flip_core(&flip_core(&src, FlipAxis::Horizontal), FlipAxis::Horizontal), src);
    }
}
