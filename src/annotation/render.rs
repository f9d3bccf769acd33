// ============================================================================
// ANNOTATION RENDERING — SDF coverage rasterization onto the composite
// ============================================================================
//
// Shapes are drawn by evaluating a signed distance per pixel center over the
// shape's bounding box and converting it to anti-aliased coverage with
// `smoothstep(0.5, -0.5, d)`.  Outlines use the band `|d| - stroke/2`.
// Rows are processed in parallel; each row only touches its own pixels.
// ============================================================================

use image::{Rgba, RgbaImage};
use kurbo::{Point, Rect};
use rayon::prelude::*;

use super::{Annotation, AnnotationKind};
use crate::canvas::{BlendMode, blend_pixel, clamp_rect, paste};
use crate::ops::text::{TextAlignment, default_font, draw_text, measure_text};

/// DodgerBlue, used for the selection rectangle and handle borders.
pub const SELECTION_COLOR: [u8; 4] = [30, 144, 255, 255];
pub const HIGHLIGHT_COLOR: [u8; 4] = [255, 255, 0, 255];
/// 50 % black laid over everything outside a spotlight.
pub const SPOTLIGHT_DIM: [u8; 4] = [0, 0, 0, 128];

const WHITE: [u8; 4] = [255, 255, 255, 255];
const BLACK: [u8; 4] = [0, 0, 0, 255];
const SELECTION_STROKE: f32 = 2.0;
const CROP_DASH: i64 = 6;
const BALLOON_PADDING: f32 = 8.0;

// ============================================================================
// DISTANCE FUNCTIONS
// ============================================================================

#[inline]
fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Coverage of the inside of a shape with signed distance `d`.
#[inline]
fn fill_coverage(d: f32) -> f32 {
    smoothstep(0.5, -0.5, d)
}

/// Coverage of a stroke of width `stroke` centered on the shape edge.
#[inline]
fn outline_coverage(d: f32, stroke: f32) -> f32 {
    smoothstep(0.5, -0.5, d.abs() - stroke * 0.5)
}

#[inline]
fn sdf_box(px: f32, py: f32, hx: f32, hy: f32) -> f32 {
    let dx = px.abs() - hx;
    let dy = py.abs() - hy;
    let outside = (dx.max(0.0) * dx.max(0.0) + dy.max(0.0) * dy.max(0.0)).sqrt();
    let inside = dx.max(dy).min(0.0);
    outside + inside
}

#[inline]
fn sdf_rounded_box(px: f32, py: f32, hx: f32, hy: f32, r: f32) -> f32 {
    let r = r.min(hx).min(hy);
    sdf_box(px, py, hx - r, hy - r) - r
}

/// Ellipse distance, approximated by normalizing to circle space.
#[inline]
fn sdf_ellipse(px: f32, py: f32, rx: f32, ry: f32) -> f32 {
    let (rx, ry) = (rx.max(0.5), ry.max(0.5));
    let nx = px / rx;
    let ny = py / ry;
    let len = (nx * nx + ny * ny).sqrt();
    if len < 1e-8 {
        return -rx.min(ry);
    }
    let scale = (rx * rx * ny * ny + ry * ry * nx * nx).sqrt() / (rx * ry * len);
    (len - 1.0) / scale
}

#[inline]
fn segment_distance(px: f32, py: f32, a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq < 1e-12 {
        0.0
    } else {
        (((px - a.0) * dx + (py - a.1) * dy) / len_sq).clamp(0.0, 1.0)
    };
    let cx = a.0 + t * dx;
    let cy = a.1 + t * dy;
    ((px - cx) * (px - cx) + (py - cy) * (py - cy)).sqrt()
}

/// Signed distance to a convex polygon.
fn sdf_convex_polygon(verts: &[(f32, f32)], px: f32, py: f32) -> f32 {
    let n = verts.len();
    let mut d = (px - verts[0].0) * (px - verts[0].0) + (py - verts[0].1) * (py - verts[0].1);
    let mut s: f32 = 1.0;
    let mut j = n - 1;
    for i in 0..n {
        let ex = verts[j].0 - verts[i].0;
        let ey = verts[j].1 - verts[i].1;
        let wx = px - verts[i].0;
        let wy = py - verts[i].1;
        let t = ((wx * ex + wy * ey) / (ex * ex + ey * ey).max(1e-12)).clamp(0.0, 1.0);
        let bx = wx - ex * t;
        let by = wy - ey * t;
        d = d.min(bx * bx + by * by);
        // Crossing test flips the sign for points inside.
        let c1 = py >= verts[i].1;
        let c2 = py < verts[j].1;
        let c3 = ex * wy > ey * wx;
        if (c1 && c2 && c3) || (!c1 && !c2 && !c3) {
            s = -s;
        }
        j = i;
    }
    s * d.sqrt()
}

fn pt(p: Point) -> (f32, f32) {
    (p.x as f32, p.y as f32)
}

// ============================================================================
// RASTERIZER
// ============================================================================

/// Blend `color` onto every pixel of `canvas` inside `area`, weighted by
/// `coverage(x, y)` evaluated at pixel centers.
fn paint<F>(canvas: &mut RgbaImage, area: Rect, color: [u8; 4], mode: BlendMode, coverage: F)
where
    F: Fn(f32, f32) -> f32 + Sync,
{
    let coverage = &coverage;
    paint_rows(canvas, area, color, mode, |py| move |px| coverage(px, py));
}

/// [`paint`] with a per-row coverage builder: `for_row(py)` runs once per
/// row and returns the coverage along it.
fn paint_rows<R, G>(canvas: &mut RgbaImage, area: Rect, color: [u8; 4], mode: BlendMode, for_row: R)
where
    R: Fn(f32) -> G + Sync,
    G: Fn(f32) -> f32,
{
    let (w, h) = canvas.dimensions();
    let Some(region) = clamp_rect(area.inflate(1.0, 1.0).expand(), w, h) else {
        return;
    };
    let stride = w as usize * 4;
    let top = Rgba(color);
    let (x0, x1) = (region.x, region.x + region.width);
    let raw: &mut [u8] = canvas;

    raw.par_chunks_mut(stride)
        .enumerate()
        .skip(region.y as usize)
        .take(region.height as usize)
        .for_each(|(y, row)| {
            let coverage = for_row(y as f32 + 0.5);
            for x in x0..x1 {
                let c = coverage(x as f32 + 0.5);
                if c <= 0.0 {
                    continue;
                }
                let i = x as usize * 4;
                let base = Rgba([row[i], row[i + 1], row[i + 2], row[i + 3]]);
                let out = blend_pixel(base, top, mode, c.min(1.0));
                row[i..i + 4].copy_from_slice(&out.0);
            }
        });
}

fn stroke_rect(canvas: &mut RgbaImage, rect: Rect, stroke: f32, color: [u8; 4]) {
    let c = rect.center();
    let (cx, cy) = pt(c);
    let (hx, hy) = ((rect.width() * 0.5) as f32, (rect.height() * 0.5) as f32);
    let pad = stroke as f64;
    paint(canvas, rect.inflate(pad, pad), color, BlendMode::Normal, |x, y| {
        outline_coverage(sdf_box(x - cx, y - cy, hx, hy), stroke)
    });
}

fn fill_rect(canvas: &mut RgbaImage, rect: Rect, color: [u8; 4], mode: BlendMode) {
    let (cx, cy) = pt(rect.center());
    let (hx, hy) = ((rect.width() * 0.5) as f32, (rect.height() * 0.5) as f32);
    paint(canvas, rect, color, mode, |x, y| fill_coverage(sdf_box(x - cx, y - cy, hx, hy)));
}

// ============================================================================
// PER-VARIANT RENDERING
// ============================================================================

/// Draw one annotation onto the composite.
pub fn render_annotation(canvas: &mut RgbaImage, ann: &Annotation) {
    let color = ann.stroke_color;
    let stroke = ann.stroke_width.max(0.5);
    let bounds = ann.bounds();

    match &ann.kind {
        AnnotationKind::Rectangle => stroke_rect(canvas, bounds, stroke, color),
        AnnotationKind::Ellipse => {
            let (cx, cy) = pt(bounds.center());
            let (rx, ry) = ((bounds.width() * 0.5) as f32, (bounds.height() * 0.5) as f32);
            let pad = stroke as f64;
            paint(canvas, bounds.inflate(pad, pad), color, BlendMode::Normal, |x, y| {
                outline_coverage(sdf_ellipse(x - cx, y - cy, rx, ry), stroke)
            });
        }
        AnnotationKind::Line => draw_segment(canvas, ann.start, ann.end, stroke, color),
        AnnotationKind::Arrow => draw_arrow(canvas, ann.start, ann.end, stroke, color),
        AnnotationKind::Freehand { points } => draw_polyline(canvas, points, stroke, color),
        AnnotationKind::Highlighter => fill_rect(canvas, bounds, HIGHLIGHT_COLOR, BlendMode::Multiply),
        AnnotationKind::Number { number, font_size } => {
            draw_number(canvas, ann.start, ann.number_radius() as f32, *number, *font_size, color)
        }
        AnnotationKind::Text { text, font_size } => {
            if let Some(font) = default_font() {
                draw_text(
                    canvas,
                    font,
                    text,
                    *font_size,
                    bounds.x0 as f32,
                    bounds.y0 as f32,
                    color,
                    TextAlignment::Left,
                );
            }
        }
        AnnotationKind::SpeechBalloon { text, font_size } => draw_balloon(canvas, bounds, text, *font_size, stroke, color),
        AnnotationKind::Blur { .. } | AnnotationKind::Pixelate { .. } => {
            if let Some(cache) = ann.cache() {
                paste(canvas, &cache.pixels, cache.region.x as i64, cache.region.y as i64, false);
            }
        }
        AnnotationKind::Magnify { .. } => {
            if let Some(cache) = ann.cache() {
                paste(canvas, &cache.pixels, cache.region.x as i64, cache.region.y as i64, false);
            }
            stroke_rect(canvas, bounds, stroke, color);
        }
        AnnotationKind::Spotlight { canvas: size } => draw_spotlight(canvas, bounds, *size),
        AnnotationKind::Crop => draw_crop_frame(canvas, bounds),
    }
}

fn draw_segment(canvas: &mut RgbaImage, a: Point, b: Point, stroke: f32, color: [u8; 4]) {
    let (pa, pb) = (pt(a), pt(b));
    let pad = stroke as f64;
    paint(canvas, Rect::from_points(a, b).inflate(pad, pad), color, BlendMode::Normal, |x, y| {
        fill_coverage(segment_distance(x, y, pa, pb) - stroke * 0.5)
    });
}

fn draw_arrow(canvas: &mut RgbaImage, start: Point, end: Point, stroke: f32, color: [u8; 4]) {
    let (sx, sy) = pt(start);
    let (ex, ey) = pt(end);
    let (dx, dy) = (ex - sx, ey - sy);
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1e-3 {
        draw_segment(canvas, start, end, stroke, color);
        return;
    }
    let (ux, uy) = (dx / len, dy / len);
    let head = (stroke * 3.0).max(10.0).min(len);
    let half = head * 0.5;
    let (bx, by) = (ex - ux * head, ey - uy * head);
    let triangle = [(ex, ey), (bx - uy * half, by + ux * half), (bx + uy * half, by - ux * half)];
    let shaft_end = (ex - ux * head * 0.8, ey - uy * head * 0.8);

    let pad = (head + stroke) as f64;
    paint(canvas, Rect::from_points(start, end).inflate(pad, pad), color, BlendMode::Normal, |x, y| {
        let shaft = segment_distance(x, y, (sx, sy), shaft_end) - stroke * 0.5;
        fill_coverage(shaft.min(sdf_convex_polygon(&triangle, x, y)))
    });
}

fn draw_polyline(canvas: &mut RgbaImage, points: &[Point], stroke: f32, color: [u8; 4]) {
    let Some(first) = points.first() else { return };
    let pts: Vec<(f32, f32)> = points.iter().map(|p| pt(*p)).collect();
    let segments: Vec<((f32, f32), (f32, f32))> = if pts.len() == 1 {
        vec![(pts[0], pts[0])]
    } else {
        pts.windows(2).map(|w| (w[0], w[1])).collect()
    };
    let area = points.iter().fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p));
    let pad = stroke as f64;
    // Coverage is zero beyond stroke/2 + 0.5 from every segment.
    let reach = stroke * 0.5 + 1.0;
    paint_rows(canvas, area.inflate(pad, pad), color, BlendMode::Normal, |py| {
        let near: Vec<_> = segments
            .iter()
            .filter(|(a, b)| py >= a.1.min(b.1) - reach && py <= a.1.max(b.1) + reach)
            .copied()
            .collect();
        move |px| {
            let d = near
                .iter()
                .map(|&(a, b)| segment_distance(px, py, a, b))
                .fold(f32::MAX, f32::min);
            fill_coverage(d - stroke * 0.5)
        }
    });
}

fn draw_number(canvas: &mut RgbaImage, center: Point, radius: f32, number: u32, font_size: f32, color: [u8; 4]) {
    let (cx, cy) = pt(center);
    let area = Rect::from_center_size(center, (radius as f64 * 2.0, radius as f64 * 2.0));
    paint(canvas, area, color, BlendMode::Normal, |x, y| {
        let (dx, dy) = (x - cx, y - cy);
        fill_coverage((dx * dx + dy * dy).sqrt() - radius)
    });

    let Some(font) = default_font() else { return };
    let label = number.to_string();
    let size = font_size.min(radius * 1.3);
    let metrics = measure_text(font, &label, size);
    draw_text(canvas, font, &label, size, cx, cy - metrics.height * 0.5, WHITE, TextAlignment::Center);
}

fn draw_balloon(canvas: &mut RgbaImage, bounds: Rect, text: &str, font_size: f32, stroke: f32, color: [u8; 4]) {
    let (cx, cy) = pt(bounds.center());
    let (hx, hy) = ((bounds.width() * 0.5) as f32, (bounds.height() * 0.5) as f32);
    let radius = (hx.min(hy) * 0.4).min(16.0);

    // Tail hangs from the bottom edge, a quarter of the way in.
    let (x0, y1) = (bounds.x0 as f32, bounds.y1 as f32);
    let w = bounds.width() as f32;
    let tail_w = (w * 0.2).clamp(6.0, 24.0);
    let tail_h = (hy.max(4.0)).min(24.0);
    let tail_x = x0 + w * 0.25;
    let tail = [(tail_x, y1 - 1.0), (tail_x + tail_w, y1 - 1.0), (tail_x - tail_w * 0.25, y1 + tail_h)];

    let shape = move |x: f32, y: f32| {
        sdf_rounded_box(x - cx, y - cy, hx, hy, radius).min(sdf_convex_polygon(&tail, x, y))
    };
    let area = bounds.union_pt(Point::new(tail[2].0 as f64, tail[2].1 as f64));
    let pad = stroke as f64;
    paint(canvas, area, WHITE, BlendMode::Normal, |x, y| fill_coverage(shape(x, y)));
    paint(canvas, area.inflate(pad, pad), color, BlendMode::Normal, |x, y| outline_coverage(shape(x, y), stroke));

    if let Some(font) = default_font() {
        draw_text(
            canvas,
            font,
            text,
            font_size,
            bounds.x0 as f32 + BALLOON_PADDING,
            bounds.y0 as f32 + BALLOON_PADDING,
            color,
            TextAlignment::Left,
        );
    }
}

fn draw_spotlight(canvas: &mut RgbaImage, bounds: Rect, size: (u32, u32)) {
    let (w, h) = match size {
        (0, _) | (_, 0) => canvas.dimensions(),
        s => s,
    };
    let (cx, cy) = pt(bounds.center());
    let (rx, ry) = ((bounds.width() * 0.5) as f32, (bounds.height() * 0.5) as f32);
    let area = Rect::new(0.0, 0.0, w as f64, h as f64);
    paint(canvas, area, SPOTLIGHT_DIM, BlendMode::Normal, |x, y| {
        1.0 - fill_coverage(sdf_ellipse(x - cx, y - cy, rx, ry))
    });
}

/// Dashed black/white frame marking the pending crop.
fn draw_crop_frame(canvas: &mut RgbaImage, bounds: Rect) {
    let (cx, cy) = pt(bounds.center());
    let (hx, hy) = ((bounds.width() * 0.5) as f32, (bounds.height() * 0.5) as f32);
    let dash = |x: f32, y: f32| ((x as i64 + y as i64) / CROP_DASH) % 2 == 0;
    let area = bounds.inflate(2.0, 2.0);
    paint(canvas, area, WHITE, BlendMode::Normal, |x, y| {
        if dash(x, y) {
            outline_coverage(sdf_box(x - cx, y - cy, hx, hy), 2.0)
        } else {
            0.0
        }
    });
    paint(canvas, area, BLACK, BlendMode::Normal, |x, y| {
        if dash(x, y) {
            0.0
        } else {
            outline_coverage(sdf_box(x - cx, y - cy, hx, hy), 2.0)
        }
    });
}

// ============================================================================
// SELECTION HANDLES
// ============================================================================

/// The eight handle centers: corners and edge midpoints, clockwise from the
/// top-left corner.
pub fn handle_points(bounds: Rect) -> [Point; 8] {
    let (x0, y0, x1, y1) = (bounds.x0, bounds.y0, bounds.x1, bounds.y1);
    let (mx, my) = ((x0 + x1) * 0.5, (y0 + y1) * 0.5);
    [
        Point::new(x0, y0),
        Point::new(mx, y0),
        Point::new(x1, y0),
        Point::new(x1, my),
        Point::new(x1, y1),
        Point::new(mx, y1),
        Point::new(x0, y1),
        Point::new(x0, my),
    ]
}

/// Selection rectangle plus eight square handles of edge `handle_size`.
pub fn draw_selection_handles(canvas: &mut RgbaImage, bounds: Rect, handle_size: f32) {
    stroke_rect(canvas, bounds, SELECTION_STROKE, SELECTION_COLOR);
    let size = handle_size.max(2.0) as f64;
    for center in handle_points(bounds) {
        let square = Rect::from_center_size(center, (size, size));
        fill_rect(canvas, square, WHITE, BlendMode::Normal);
        stroke_rect(canvas, square, 1.0, SELECTION_COLOR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255]))
    }

    fn drawn(kind: AnnotationKind, a: (f64, f64), b: (f64, f64), color: [u8; 4]) -> Annotation {
        let mut ann = Annotation::new(kind, Point::new(a.0, a.1), color, 4.0);
        ann.extend_to(Point::new(b.0, b.1));
        ann
    }

    #[test]
    fn rectangle_outline_leaves_interior() {
        let mut img = blank(64, 64);
        let ann = drawn(AnnotationKind::Rectangle, (10.0, 10.0), (50.0, 50.0), [255, 0, 0, 255]);
        render_annotation(&mut img, &ann);
        assert_eq!(*img.get_pixel(10, 30), Rgba([255, 0, 0, 255]));
        assert_eq!(*img.get_pixel(30, 30), Rgba([255, 255, 255, 255]));
        assert_eq!(*img.get_pixel(2, 2), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn line_covers_its_path() {
        let mut img = blank(64, 64);
        let ann = drawn(AnnotationKind::Line, (5.0, 32.0), (60.0, 32.0), [0, 0, 255, 255]);
        render_annotation(&mut img, &ann);
        assert_eq!(*img.get_pixel(30, 31), Rgba([0, 0, 255, 255]));
        assert_eq!(*img.get_pixel(30, 10), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn highlighter_multiplies_yellow() {
        let mut img = RgbaImage::from_pixel(20, 20, Rgba([200, 100, 50, 255]));
        let ann = drawn(AnnotationKind::Highlighter, (0.0, 0.0), (20.0, 20.0), [0, 0, 0, 255]);
        render_annotation(&mut img, &ann);
        assert_eq!(*img.get_pixel(10, 10), Rgba([200, 100, 0, 255]));
    }

    #[test]
    fn spotlight_dims_only_outside() {
        let mut img = blank(100, 100);
        let ann = drawn(AnnotationKind::Spotlight { canvas: (100, 100) }, (25.0, 25.0), (75.0, 75.0), [0; 4]);
        render_annotation(&mut img, &ann);
        assert_eq!(*img.get_pixel(50, 50), Rgba([255, 255, 255, 255]));
        let corner = img.get_pixel(1, 1);
        assert!((corner[0] as i32 - 127).abs() <= 1, "corner = {corner:?}");
        assert_eq!(corner[3], 255);
    }

    #[test]
    fn pixelate_paints_cached_region() {
        let mut src = blank(20, 20);
        for x in 0..20 {
            src.put_pixel(x, 0, Rgba([0, 0, 0, 255]));
        }
        let mut ann = drawn(AnnotationKind::Pixelate { block: 10 }, (0.0, 0.0), (10.0, 10.0), [0; 4]);
        ann.refresh_cache(&src);
        let mut canvas = src.clone();
        render_annotation(&mut canvas, &ann);
        // The black top row is averaged into the whole 10×10 block.
        assert_eq!(canvas.get_pixel(5, 5), canvas.get_pixel(0, 0));
        assert!(canvas.get_pixel(5, 5)[0] < 255);
        assert_eq!(*canvas.get_pixel(15, 15), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn selection_handles_sit_on_corners_and_midpoints() {
        let bounds = Rect::new(10.0, 20.0, 50.0, 60.0);
        let pts = handle_points(bounds);
        assert_eq!(pts[0], Point::new(10.0, 20.0));
        assert_eq!(pts[1], Point::new(30.0, 20.0));
        assert_eq!(pts[4], Point::new(50.0, 60.0));
        assert_eq!(pts[7], Point::new(10.0, 40.0));

        let mut img = RgbaImage::from_pixel(80, 80, Rgba([0, 0, 0, 255]));
        draw_selection_handles(&mut img, bounds, 8.0);
        // Handle interior is white, the box interior untouched.
        assert_eq!(*img.get_pixel(30, 18), Rgba([255, 255, 255, 255]));
        assert_eq!(*img.get_pixel(30, 40), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn long_freehand_matches_full_segment_scan() {
        // Zigzag with many short segments; rows far from a segment skip it.
        let points: Vec<Point> = (0..400)
            .map(|i| Point::new(4.0 + i as f64 * 0.3, 20.0 + ((i % 40) as f64 - 20.0).abs() * 1.5))
            .collect();
        let color = [200, 30, 60, 255];
        let stroke = 3.0;

        let mut fast = blank(140, 64);
        draw_polyline(&mut fast, &points, stroke, color);

        let pts: Vec<(f32, f32)> = points.iter().map(|p| pt(*p)).collect();
        let area = points.iter().fold(Rect::from_points(points[0], points[0]), |r, p| r.union_pt(*p));
        let mut full = blank(140, 64);
        paint(&mut full, area.inflate(3.0, 3.0), color, BlendMode::Normal, |x, y| {
            let d = pts.windows(2).map(|w| segment_distance(x, y, w[0], w[1])).fold(f32::MAX, f32::min);
            fill_coverage(d - stroke * 0.5)
        });

        assert_eq!(fast, full);
        assert_eq!(*fast.get_pixel(4, 50), Rgba([200, 30, 60, 255]));
        assert_eq!(*fast.get_pixel(60, 2), Rgba([255, 255, 255, 255]));
    }
}
