// ============================================================================
// ANNOTATIONS — typed overlay objects with bounds, hit-testing and caches
// ============================================================================
//
// Every annotation shares a start/end pair in image-pixel coordinates plus a
// stroke style.  The variant-specific data lives in `AnnotationKind`, a closed
// enum matched exhaustively by bounds, hit-testing and rendering.
//
// Bounds are the single source of truth for hit-testing, selection handles
// and region caches.
// ============================================================================

pub mod render;

use image::RgbaImage;
use kurbo::{Line, ParamCurveNearest, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::canvas::{PixelRect, clamp_rect, extract_region};
use crate::ops::effects::pixelate_core;
use crate::ops::filters::gaussian_blur_padded;
use crate::ops::sampling::bilinear_rgba;

/// Extra slack (in image pixels) granted to thin shapes when hit-testing.
pub const HIT_TOLERANCE: f64 = 4.0;

pub const DEFAULT_BLUR_RADIUS: u32 = 10;
pub const DEFAULT_PIXELATE_BLOCK: u32 = 10;
pub const DEFAULT_MAGNIFY_ZOOM: f32 = 2.0;

/// Stable identifier; survives moves between the active list and the
/// undo/redo stacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnnotationId(Uuid);

impl AnnotationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AnnotationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// TOOLS
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tool {
    #[default]
    Select,
    Rectangle,
    Ellipse,
    Line,
    Arrow,
    Text,
    Pen,
    Number,
    Blur,
    Pixelate,
    Highlighter,
    Spotlight,
    Magnify,
    SpeechBalloon,
    Crop,
}

impl Tool {
    pub const ALL: [Tool; 15] = [
        Tool::Select,
        Tool::Rectangle,
        Tool::Ellipse,
        Tool::Line,
        Tool::Arrow,
        Tool::Text,
        Tool::Pen,
        Tool::Number,
        Tool::Blur,
        Tool::Pixelate,
        Tool::Highlighter,
        Tool::Spotlight,
        Tool::Magnify,
        Tool::SpeechBalloon,
        Tool::Crop,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Tool::Select => "Select",
            Tool::Rectangle => "Rectangle",
            Tool::Ellipse => "Ellipse",
            Tool::Line => "Line",
            Tool::Arrow => "Arrow",
            Tool::Text => "Text",
            Tool::Pen => "Pen",
            Tool::Number => "Number",
            Tool::Blur => "Blur",
            Tool::Pixelate => "Pixelate",
            Tool::Highlighter => "Highlighter",
            Tool::Spotlight => "Spotlight",
            Tool::Magnify => "Magnify",
            Tool::SpeechBalloon => "Speech balloon",
            Tool::Crop => "Crop",
        }
    }

    /// True for tools that draw something when the pointer goes down.
    pub fn creates_annotation(self) -> bool {
        self != Tool::Select
    }
}

// ============================================================================
// KINDS
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AnnotationKind {
    Rectangle,
    Ellipse,
    Line,
    Arrow,
    Text { text: String, font_size: f32 },
    /// Append-only while drawing.
    Freehand { points: Vec<Point> },
    Number { number: u32, font_size: f32 },
    Blur { radius: u32 },
    Pixelate { block: u32 },
    Highlighter,
    /// `canvas` is the image size at creation; the dimming overlay covers it.
    Spotlight { canvas: (u32, u32) },
    Magnify { zoom: f32 },
    SpeechBalloon { text: String, font_size: f32 },
    Crop,
}

impl AnnotationKind {
    /// The blank variant a tool draws.  `None` for [`Tool::Select`].
    pub fn for_tool(tool: Tool, font_size: f32) -> Option<Self> {
        Some(match tool {
            Tool::Select => return None,
            Tool::Rectangle => AnnotationKind::Rectangle,
            Tool::Ellipse => AnnotationKind::Ellipse,
            Tool::Line => AnnotationKind::Line,
            Tool::Arrow => AnnotationKind::Arrow,
            Tool::Text => AnnotationKind::Text { text: String::new(), font_size },
            Tool::Pen => AnnotationKind::Freehand { points: Vec::new() },
            Tool::Number => AnnotationKind::Number { number: 0, font_size },
            Tool::Blur => AnnotationKind::Blur { radius: DEFAULT_BLUR_RADIUS },
            Tool::Pixelate => AnnotationKind::Pixelate { block: DEFAULT_PIXELATE_BLOCK },
            Tool::Highlighter => AnnotationKind::Highlighter,
            Tool::Spotlight => AnnotationKind::Spotlight { canvas: (0, 0) },
            Tool::Magnify => AnnotationKind::Magnify { zoom: DEFAULT_MAGNIFY_ZOOM },
            Tool::SpeechBalloon => AnnotationKind::SpeechBalloon { text: String::new(), font_size },
            Tool::Crop => AnnotationKind::Crop,
        })
    }

    pub fn tool(&self) -> Tool {
        match self {
            AnnotationKind::Rectangle => Tool::Rectangle,
            AnnotationKind::Ellipse => Tool::Ellipse,
            AnnotationKind::Line => Tool::Line,
            AnnotationKind::Arrow => Tool::Arrow,
            AnnotationKind::Text { .. } => Tool::Text,
            AnnotationKind::Freehand { .. } => Tool::Pen,
            AnnotationKind::Number { .. } => Tool::Number,
            AnnotationKind::Blur { .. } => Tool::Blur,
            AnnotationKind::Pixelate { .. } => Tool::Pixelate,
            AnnotationKind::Highlighter => Tool::Highlighter,
            AnnotationKind::Spotlight { .. } => Tool::Spotlight,
            AnnotationKind::Magnify { .. } => Tool::Magnify,
            AnnotationKind::SpeechBalloon { .. } => Tool::SpeechBalloon,
            AnnotationKind::Crop => Tool::Crop,
        }
    }

    /// Variants that own a cached, filtered copy of the source under them.
    pub fn is_region_effect(&self) -> bool {
        matches!(
            self,
            AnnotationKind::Blur { .. } | AnnotationKind::Pixelate { .. } | AnnotationKind::Magnify { .. }
        )
    }
}

/// Filtered source pixels for a region-effect annotation.
#[derive(Clone, Debug)]
pub struct RegionCache {
    pub region: PixelRect,
    pub pixels: RgbaImage,
}

// ============================================================================
// ANNOTATION
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub kind: AnnotationKind,
    pub start: Point,
    pub end: Point,
    pub stroke_color: [u8; 4],
    pub stroke_width: f32,
    #[serde(skip)]
    cache: Option<RegionCache>,
}

impl PartialEq for Annotation {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.kind == other.kind
            && self.start == other.start
            && self.end == other.end
            && self.stroke_color == other.stroke_color
            && self.stroke_width == other.stroke_width
    }
}

impl Annotation {
    /// A fresh annotation with start = end = `at`.  Freehand paths are seeded
    /// with `at` as their first point.
    pub fn new(mut kind: AnnotationKind, at: Point, stroke_color: [u8; 4], stroke_width: f32) -> Self {
        if let AnnotationKind::Freehand { points } = &mut kind {
            if points.is_empty() {
                points.push(at);
            }
        }
        Self {
            id: AnnotationId::new(),
            kind,
            start: at,
            end: at,
            stroke_color,
            stroke_width: stroke_width.max(0.5),
            cache: None,
        }
    }

    pub fn tool(&self) -> Tool {
        self.kind.tool()
    }

    pub fn cache(&self) -> Option<&RegionCache> {
        self.cache.as_ref()
    }

    /// Axis-aligned bounds in image coordinates.
    pub fn bounds(&self) -> Rect {
        match &self.kind {
            AnnotationKind::Freehand { points } => {
                let mut iter = points.iter();
                let Some(first) = iter.next() else {
                    return Rect::from_points(self.start, self.end);
                };
                iter.fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p))
            }
            AnnotationKind::Number { .. } => {
                let r = self.number_radius();
                Rect::from_center_size(self.start, (r * 2.0, r * 2.0))
            }
            AnnotationKind::Text { text, font_size } | AnnotationKind::SpeechBalloon { text, font_size } => {
                let dragged = Rect::from_points(self.start, self.end);
                if dragged.width() >= 1.0 && dragged.height() >= 1.0 {
                    return dragged;
                }
                let (w, h) = estimated_text_extent(text, *font_size);
                Rect::new(self.start.x, self.start.y, self.start.x + w, self.start.y + h)
            }
            _ => Rect::from_points(self.start, self.end),
        }
    }

    /// Radius of the number marker circle.
    pub fn number_radius(&self) -> f64 {
        match &self.kind {
            AnnotationKind::Number { font_size, .. } => (*font_size as f64 * 0.75).max(self.stroke_width as f64 * 3.0).max(8.0),
            _ => 0.0,
        }
    }

    /// Per-variant containment test.
    pub fn hit_test(&self, p: Point) -> bool {
        let half = self.stroke_width as f64 * 0.5 + HIT_TOLERANCE;
        match &self.kind {
            AnnotationKind::Line | AnnotationKind::Arrow => segment_distance(self.start, self.end, p) <= half,
            AnnotationKind::Freehand { points } => {
                if points.len() == 1 {
                    return points[0].distance(p) <= half;
                }
                points.windows(2).any(|w| segment_distance(w[0], w[1], p) <= half)
            }
            AnnotationKind::Number { .. } => self.start.distance(p) <= self.number_radius(),
            AnnotationKind::Ellipse => {
                let b = self.bounds().inflate(half, half);
                let (rx, ry) = (b.width() * 0.5, b.height() * 0.5);
                if rx <= 0.0 || ry <= 0.0 {
                    return false;
                }
                let c = b.center();
                let (dx, dy) = ((p.x - c.x) / rx, (p.y - c.y) / ry);
                dx * dx + dy * dy <= 1.0
            }
            _ => self.bounds().inflate(HIT_TOLERANCE, HIT_TOLERANCE).contains(p),
        }
    }

    /// Move the annotation by `delta`, freehand points included.  The region
    /// cache goes stale and must be refreshed by the owner.
    pub fn translate(&mut self, delta: Vec2) {
        self.start += delta;
        self.end += delta;
        if let AnnotationKind::Freehand { points } = &mut self.kind {
            for p in points.iter_mut() {
                *p += delta;
            }
        }
    }

    /// Set the moving end while drawing.  Freehand appends instead.
    pub fn extend_to(&mut self, p: Point) {
        match &mut self.kind {
            AnnotationKind::Freehand { points } => {
                if points.last() != Some(&p) {
                    points.push(p);
                }
            }
            _ => self.end = p,
        }
    }

    /// Replace the text of a Text or SpeechBalloon annotation.  Returns false
    /// for other variants.
    pub fn set_text(&mut self, new_text: &str) -> bool {
        match &mut self.kind {
            AnnotationKind::Text { text, .. } | AnnotationKind::SpeechBalloon { text, .. } => {
                *text = new_text.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            AnnotationKind::Text { text, .. } | AnnotationKind::SpeechBalloon { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Recompute the cached filtered pixels of a region-effect variant from
    /// `source`.  No-op for other variants.
    pub fn refresh_cache(&mut self, source: &RgbaImage) {
        if !self.kind.is_region_effect() {
            self.cache = None;
            return;
        }
        let Some(region) = clamp_rect(self.bounds(), source.width(), source.height()) else {
            self.cache = None;
            return;
        };
        let pixels = match &self.kind {
            AnnotationKind::Blur { radius } => gaussian_blur_padded(&extract_region(source, region), (*radius).max(1)),
            AnnotationKind::Pixelate { block } => pixelate_core(&extract_region(source, region), (*block).max(2)),
            AnnotationKind::Magnify { zoom } => magnify_region(source, region, *zoom),
            _ => return,
        };
        self.cache = Some(RegionCache { region, pixels });
    }

    pub fn clear_cache(&mut self) {
        self.cache = None;
    }
}

/// Distance from `p` to the segment `a`-`b`.
fn segment_distance(a: Point, b: Point, p: Point) -> f64 {
    if a == b {
        return a.distance(p);
    }
    Line::new(a, b).nearest(p, 1e-6).distance_sq.sqrt()
}

/// Font-independent size estimate for a text block that was placed with a
/// click rather than dragged out.
fn estimated_text_extent(text: &str, font_size: f32) -> (f64, f64) {
    let size = font_size.max(1.0) as f64;
    let lines = text.split('\n').count().max(1);
    let widest = text.split('\n').map(|l| l.chars().count()).max().unwrap_or(0).max(1);
    (widest as f64 * size * 0.6, lines as f64 * size * 1.2)
}

/// Source pixels around the region center, enlarged by `zoom`.
fn magnify_region(source: &RgbaImage, region: PixelRect, zoom: f32) -> RgbaImage {
    let zoom = zoom.clamp(1.0, 16.0);
    let cx = region.x as f32 + region.width as f32 * 0.5;
    let cy = region.y as f32 + region.height as f32 * 0.5;
    RgbaImage::from_fn(region.width, region.height, |x, y| {
        let dx = region.x as f32 + x as f32 + 0.5 - cx;
        let dy = region.y as f32 + y as f32 + 0.5 - cy;
        bilinear_rgba(source, cx + dx / zoom - 0.5, cy + dy / zoom - 0.5)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn rect_annotation(kind: AnnotationKind, a: (f64, f64), b: (f64, f64)) -> Annotation {
        let mut ann = Annotation::new(kind, Point::new(a.0, a.1), [255, 0, 0, 255], 4.0);
        ann.extend_to(Point::new(b.0, b.1));
        ann
    }

    #[test]
    fn bounds_normalize_drag_direction() {
        let ann = rect_annotation(AnnotationKind::Rectangle, (50.0, 40.0), (10.0, 10.0));
        assert_eq!(ann.bounds(), Rect::new(10.0, 10.0, 50.0, 40.0));
    }

    #[test]
    fn freehand_bounds_follow_points() {
        let mut ann = Annotation::new(AnnotationKind::Freehand { points: vec![] }, Point::new(5.0, 5.0), [0; 4], 2.0);
        ann.extend_to(Point::new(20.0, 2.0));
        ann.extend_to(Point::new(8.0, 30.0));
        assert_eq!(ann.bounds(), Rect::new(5.0, 2.0, 20.0, 30.0));
        ann.translate(Vec2::new(1.0, 1.0));
        assert_eq!(ann.bounds(), Rect::new(6.0, 3.0, 21.0, 31.0));
    }

    #[test]
    fn line_hit_test_uses_stroke_band() {
        let ann = rect_annotation(AnnotationKind::Line, (0.0, 0.0), (100.0, 0.0));
        assert!(ann.hit_test(Point::new(50.0, 5.0)));
        assert!(!ann.hit_test(Point::new(50.0, 20.0)));
    }

    #[test]
    fn ellipse_hit_test_excludes_corners() {
        let ann = rect_annotation(AnnotationKind::Ellipse, (0.0, 0.0), (100.0, 100.0));
        assert!(ann.hit_test(Point::new(50.0, 50.0)));
        assert!(!ann.hit_test(Point::new(2.0, 2.0)));
    }

    #[test]
    fn number_hit_test_is_circular() {
        let ann = Annotation::new(AnnotationKind::Number { number: 1, font_size: 24.0 }, Point::new(50.0, 50.0), [0; 4], 4.0);
        let r = ann.number_radius();
        assert!(ann.hit_test(Point::new(50.0 + r - 1.0, 50.0)));
        assert!(!ann.hit_test(Point::new(50.0 + r, 50.0 + r)));
    }

    #[test]
    fn blur_cache_covers_clamped_bounds() {
        let src = RgbaImage::from_pixel(40, 30, Rgba([10, 20, 30, 255]));
        let mut ann = rect_annotation(AnnotationKind::Blur { radius: 3 }, (-10.0, 5.0), (20.0, 100.0));
        ann.refresh_cache(&src);
        let cache = ann.cache().unwrap();
        assert_eq!(cache.region, PixelRect { x: 0, y: 5, width: 20, height: 25 });
        assert_eq!(cache.pixels.dimensions(), (20, 25));
        assert_eq!(*cache.pixels.get_pixel(10, 10), Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn rectangle_has_no_cache() {
        let src = RgbaImage::new(10, 10);
        let mut ann = rect_annotation(AnnotationKind::Rectangle, (0.0, 0.0), (5.0, 5.0));
        ann.refresh_cache(&src);
        assert!(ann.cache().is_none());
    }

    #[test]
    fn text_placed_with_click_gets_estimated_bounds() {
        let mut ann = Annotation::new(
            AnnotationKind::Text { text: String::new(), font_size: 20.0 },
            Point::new(10.0, 10.0),
            [0; 4],
            2.0,
        );
        ann.set_text("abc");
        let b = ann.bounds();
        assert_eq!(b.x0, 10.0);
        assert!(b.width() > 20.0 && b.height() > 20.0);
    }

    #[test]
    fn every_drawing_tool_has_a_kind() {
        for tool in Tool::ALL {
            let kind = AnnotationKind::for_tool(tool, 24.0);
            assert_eq!(kind.is_some(), tool.creates_annotation());
            if let Some(kind) = kind {
                assert_eq!(kind.tool(), tool);
            }
        }
    }
}
