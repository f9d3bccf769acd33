// ============================================================================
// EDITOR SESSION — annotation state machine, undo/redo, crop and composite
// ============================================================================
//
// Ownership model: the active list owns live annotations; the undo stack holds
// the ids of finished annotations (newest last) that are still in the active
// list; the redo stack owns annotations that were undone.  An annotation is
// owned by exactly one of {active list, redo stack}, and an id is never in
// both the undo and redo stacks.
//
// Every mutating call marks the session dirty and updates the status line;
// the host polls `take_invalidation()` and `status_text()` instead of
// registering callbacks.
// ============================================================================

use std::io::Cursor;

use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use kurbo::Point;

use crate::annotation::render::{draw_selection_handles, render_annotation};
use crate::annotation::{Annotation, AnnotationId, AnnotationKind, Tool};
use crate::canvas::{clamp_rect, extract_region};
use crate::config::EditorConfig;
use crate::effect::Effect;
use crate::error::{PixmarkError, Result};
use crate::gpu::EffectDispatcher;

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 16.0;

/// Host-side actions requested from inside the editor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    Save,
    Copy,
    Upload,
    Pin,
}

/// Pointer interaction state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Interaction {
    Idle,
    /// Moving the selected annotation; `last` is the previous pointer position.
    Dragging { last: Point },
    /// Building the annotation with this id under the active tool.
    Drawing { id: AnnotationId },
}

// ============================================================================
// EXPORT FORMATS
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
    Bmp,
    Gif,
    WebP,
}

impl ExportFormat {
    /// Parse a format name or file extension (case-insensitive).
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "jpg" | "jpeg" => Ok(ExportFormat::Jpeg),
            "bmp" => Ok(ExportFormat::Bmp),
            "gif" => Ok(ExportFormat::Gif),
            "webp" => Ok(ExportFormat::WebP),
            other => Err(PixmarkError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
            ExportFormat::Bmp => "bmp",
            ExportFormat::Gif => "gif",
            ExportFormat::WebP => "webp",
        }
    }
}

/// Encode `image` into an in-memory file.  JPEG drops alpha; `quality`
/// (1-100) only affects JPEG.
pub fn encode_image(image: &RgbaImage, format: ExportFormat, quality: u8) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    match format {
        ExportFormat::Png => {
            let encoder = PngEncoder::new(&mut bytes);
            #[allow(deprecated)]
            encoder
                .encode(image.as_raw(), image.width(), image.height(), image::ColorType::Rgba8)
                .map_err(PixmarkError::Encode)?;
        }
        ExportFormat::Jpeg => {
            let rgb_image = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
            encoder
                .encode(rgb_image.as_raw(), rgb_image.width(), rgb_image.height(), image::ColorType::Rgb8)
                .map_err(PixmarkError::Encode)?;
        }
        ExportFormat::Bmp => {
            let mut encoder = BmpEncoder::new(&mut bytes);
            encoder
                .encode(image.as_raw(), image.width(), image.height(), image::ColorType::Rgba8)
                .map_err(PixmarkError::Encode)?;
        }
        ExportFormat::Gif => {
            DynamicImage::ImageRgba8(image.clone())
                .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Gif)
                .map_err(PixmarkError::Encode)?;
        }
        ExportFormat::WebP => {
            DynamicImage::ImageRgba8(image.clone())
                .write_to(&mut Cursor::new(&mut bytes), ImageFormat::WebP)
                .map_err(PixmarkError::Encode)?;
        }
    }
    Ok(bytes)
}

// ============================================================================
// SESSION
// ============================================================================

pub struct EditorSession {
    source: Option<RgbaImage>,
    /// Transient effect result shown in place of `source` until committed.
    preview: Option<RgbaImage>,
    canvas_size: (u32, u32),

    annotations: Vec<Annotation>,
    undo_stack: Vec<AnnotationId>,
    redo_stack: Vec<Annotation>,
    selected: Option<AnnotationId>,
    interaction: Interaction,

    active_tool: Tool,
    stroke_color: [u8; 4],
    stroke_width: f32,
    font_size: f32,
    handle_size: f32,
    zoom: f64,
    number_counter: u32,

    status: String,
    invalidated: bool,
    intents: Vec<Intent>,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::with_config(&EditorConfig::default())
    }
}

impl EditorSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session whose stroke and handle defaults come from `config`.
    pub fn with_config(config: &EditorConfig) -> Self {
        Self {
            source: None,
            preview: None,
            canvas_size: (0, 0),
            annotations: Vec::new(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            selected: None,
            interaction: Interaction::Idle,
            active_tool: Tool::Select,
            stroke_color: config.stroke_rgba(),
            stroke_width: config.stroke_width.clamp(0.5, 100.0),
            font_size: config.font_size.clamp(6.0, 400.0),
            handle_size: config.handle_size.clamp(2.0, 64.0),
            zoom: 1.0,
            number_counter: 1,
            status: String::from("Ready"),
            invalidated: false,
            intents: Vec::new(),
        }
    }

    // ---- accessors ---------------------------------------------------------

    /// The working image (not the preview).
    pub fn image(&self) -> Option<&RgbaImage> {
        self.source.as_ref()
    }

    pub fn preview(&self) -> Option<&RgbaImage> {
        self.preview.as_ref()
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        self.canvas_size
    }

    /// Active annotations in paint order.
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn annotation(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    pub fn undo_ids(&self) -> &[AnnotationId] {
        &self.undo_stack
    }

    pub fn redo_ids(&self) -> Vec<AnnotationId> {
        self.redo_stack.iter().map(|a| a.id).collect()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn selected(&self) -> Option<AnnotationId> {
        self.selected
    }

    pub fn selected_annotation(&self) -> Option<&Annotation> {
        self.selected.and_then(|id| self.annotation(id))
    }

    pub fn interaction(&self) -> Interaction {
        self.interaction
    }

    pub fn active_tool(&self) -> Tool {
        self.active_tool
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.active_tool = tool;
        self.set_status(format!("{} tool", tool.label()));
    }

    pub fn stroke_color(&self) -> [u8; 4] {
        self.stroke_color
    }

    pub fn set_stroke_color(&mut self, color: [u8; 4]) {
        self.stroke_color = color;
    }

    pub fn stroke_width(&self) -> f32 {
        self.stroke_width
    }

    pub fn set_stroke_width(&mut self, width: f32) {
        if width.is_finite() {
            self.stroke_width = width.clamp(0.5, 100.0);
        }
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    pub fn set_font_size(&mut self, size: f32) {
        if size.is_finite() {
            self.font_size = size.clamp(6.0, 400.0);
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Set the view zoom, clamped to `MIN_ZOOM..=MAX_ZOOM`.
    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
            self.invalidated = true;
        }
    }

    /// The number the next Number annotation will get.
    pub fn number_counter(&self) -> u32 {
        self.number_counter
    }

    pub fn status_text(&self) -> &str {
        &self.status
    }

    /// Return and reset the dirty flag.
    pub fn take_invalidation(&mut self) -> bool {
        std::mem::take(&mut self.invalidated)
    }

    fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        self.invalidated = true;
    }

    // ---- intents -----------------------------------------------------------

    pub fn request_intent(&mut self, intent: Intent) {
        log_info!("Intent requested: {:?}", intent);
        self.intents.push(intent);
    }

    pub fn drain_intents(&mut self) -> Vec<Intent> {
        std::mem::take(&mut self.intents)
    }

    // ---- image lifecycle ---------------------------------------------------

    /// Replace the working image and drop every annotation, selection and
    /// history entry.
    pub fn load_image(&mut self, image: RgbaImage) {
        let (w, h) = image.dimensions();
        self.source = Some(image);
        self.preview = None;
        self.canvas_size = (w, h);
        self.reset_annotations();
        log_info!("Image loaded ({}x{})", w, h);
        self.set_status(format!("Image loaded ({w}x{h})"));
    }

    /// Decode an encoded image and load it.  On error the session is left
    /// untouched.
    pub fn load_image_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let image = image::load_from_memory(bytes).map_err(PixmarkError::Decode)?.to_rgba8();
        self.load_image(image);
        Ok(())
    }

    /// Swap in a new working image while keeping annotations.  Region caches
    /// are rebuilt against it.
    pub fn replace_image(&mut self, image: RgbaImage) {
        self.canvas_size = image.dimensions();
        self.source = Some(image);
        self.preview = None;
        self.refresh_region_caches();
        self.invalidated = true;
    }

    /// Remove every annotation and all history; resets the number counter.
    pub fn clear_all(&mut self) {
        self.reset_annotations();
        self.set_status("All annotations cleared");
    }

    fn reset_annotations(&mut self) {
        self.annotations.clear();
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.selected = None;
        self.interaction = Interaction::Idle;
        self.number_counter = 1;
    }

    /// Rebuild a session from persisted parts.  The restored annotations
    /// have no history.
    pub(crate) fn restore(&mut self, image: RgbaImage, annotations: Vec<Annotation>, number_counter: u32) {
        self.load_image(image);
        self.annotations = annotations;
        self.number_counter = number_counter.max(1);
        self.refresh_region_caches();
    }

    /// Append finished annotations (e.g. from a project) on top of the
    /// current ones.  They get no undo entries.
    pub fn import_annotations(&mut self, annotations: impl IntoIterator<Item = Annotation>) {
        let source = self.source.as_ref();
        for mut ann in annotations {
            if self.annotation(ann.id).is_some() {
                ann.id = AnnotationId::new();
            }
            if let Some(src) = source {
                ann.refresh_cache(src);
            }
            self.annotations.push(ann);
        }
        self.invalidated = true;
    }

    // ---- pointer events ----------------------------------------------------

    /// Pointer down at `point` (image coordinates).  A right press deletes
    /// the top-most annotation under the pointer without an undo entry.
    pub fn pointer_pressed(&mut self, point: Point, is_right: bool) {
        if let Interaction::Drawing { .. } = self.interaction {
            // A press without a release for the previous shape: finish it there.
            self.pointer_released(point);
        }

        if is_right {
            if let Some(id) = self.hit_test(point) {
                self.remove_annotation(id);
                self.set_status("Annotation deleted");
            }
            return;
        }

        if self.active_tool == Tool::Select {
            match self.hit_test(point) {
                Some(id) => {
                    self.selected = Some(id);
                    self.interaction = Interaction::Dragging { last: point };
                    self.invalidated = true;
                }
                None => {
                    if self.selected.take().is_some() {
                        self.invalidated = true;
                    }
                }
            }
            return;
        }

        let Some(mut kind) = AnnotationKind::for_tool(self.active_tool, self.font_size) else {
            return;
        };
        match &mut kind {
            AnnotationKind::Number { number, .. } => {
                *number = self.number_counter;
                self.number_counter += 1;
            }
            AnnotationKind::Spotlight { canvas } => *canvas = self.canvas_size,
            AnnotationKind::Crop => self.remove_crop_annotations(),
            _ => {}
        }

        self.redo_stack.clear();
        self.selected = None;

        let mut annotation = Annotation::new(kind, point, self.stroke_color, self.stroke_width);
        if let Some(src) = &self.source {
            annotation.refresh_cache(src);
        }
        let id = annotation.id;
        self.annotations.push(annotation);
        self.interaction = Interaction::Drawing { id };
        self.invalidated = true;
    }

    pub fn pointer_moved(&mut self, point: Point) {
        match self.interaction {
            Interaction::Idle => {}
            Interaction::Dragging { last } => {
                let delta = point - last;
                if let Some(id) = self.selected {
                    let source = self.source.as_ref();
                    if let Some(ann) = self.annotations.iter_mut().find(|a| a.id == id) {
                        ann.translate(delta);
                        if let Some(src) = source {
                            ann.refresh_cache(src);
                        }
                    }
                }
                self.interaction = Interaction::Dragging { last: point };
                self.invalidated = true;
            }
            Interaction::Drawing { id } => {
                let source = self.source.as_ref();
                if let Some(ann) = self.annotations.iter_mut().find(|a| a.id == id) {
                    ann.extend_to(point);
                    if let Some(src) = source {
                        ann.refresh_cache(src);
                    }
                }
                self.invalidated = true;
            }
        }
    }

    pub fn pointer_released(&mut self, point: Point) {
        match std::mem::replace(&mut self.interaction, Interaction::Idle) {
            Interaction::Idle => {}
            Interaction::Dragging { .. } => {
                self.invalidated = true;
            }
            Interaction::Drawing { id } => {
                let source = self.source.as_ref();
                let Some(ann) = self.annotations.iter_mut().find(|a| a.id == id) else {
                    return;
                };
                ann.extend_to(point);
                if let Some(src) = source {
                    ann.refresh_cache(src);
                }
                let label = ann.tool().label();
                self.undo_stack.push(id);
                self.selected = Some(id);
                self.set_status(format!("{label} created"));
            }
        }
    }

    /// Top-most annotation containing `point`.
    pub fn hit_test(&self, point: Point) -> Option<AnnotationId> {
        self.annotations.iter().rev().find(|a| a.hit_test(point)).map(|a| a.id)
    }

    // ---- selection and deletion -------------------------------------------

    pub fn select(&mut self, id: AnnotationId) -> bool {
        if self.annotation(id).is_none() {
            return false;
        }
        self.selected = Some(id);
        self.invalidated = true;
        true
    }

    pub fn clear_selection(&mut self) {
        if self.selected.take().is_some() {
            self.invalidated = true;
        }
    }

    /// Delete the selected annotation.  Not undoable.
    pub fn delete_selected(&mut self) -> bool {
        let Some(id) = self.selected else { return false };
        if self.remove_annotation(id).is_none() {
            return false;
        }
        self.set_status("Annotation deleted");
        true
    }

    /// Take an annotation out of the active list and forget its history.
    fn remove_annotation(&mut self, id: AnnotationId) -> Option<Annotation> {
        let idx = self.annotations.iter().position(|a| a.id == id)?;
        let removed = self.annotations.remove(idx);
        self.undo_stack.retain(|u| *u != id);
        if self.selected == Some(id) {
            self.selected = None;
        }
        if self.interaction == (Interaction::Drawing { id }) {
            self.interaction = Interaction::Idle;
        }
        Some(removed)
    }

    fn remove_crop_annotations(&mut self) {
        let crops: Vec<AnnotationId> = self
            .annotations
            .iter()
            .filter(|a| a.kind == AnnotationKind::Crop)
            .map(|a| a.id)
            .collect();
        for id in crops {
            self.remove_annotation(id);
        }
        self.redo_stack.retain(|a| a.kind != AnnotationKind::Crop);
    }

    /// Replace the text of a Text or SpeechBalloon annotation.
    pub fn set_annotation_text(&mut self, id: AnnotationId, text: &str) -> bool {
        let Some(ann) = self.annotations.iter_mut().find(|a| a.id == id) else {
            return false;
        };
        if !ann.set_text(text) {
            return false;
        }
        self.invalidated = true;
        true
    }

    // ---- history -----------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        let Some(id) = self.undo_stack.pop() else { return false };
        let Some(idx) = self.annotations.iter().position(|a| a.id == id) else {
            return false;
        };
        let mut ann = self.annotations.remove(idx);
        ann.clear_cache();
        if self.selected == Some(id) {
            self.selected = None;
        }
        self.redo_stack.push(ann);
        self.set_status("Undo");
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(mut ann) = self.redo_stack.pop() else { return false };
        if let Some(src) = &self.source {
            ann.refresh_cache(src);
        }
        self.undo_stack.push(ann.id);
        self.annotations.push(ann);
        self.set_status("Redo");
        true
    }

    // ---- crop --------------------------------------------------------------

    /// Crop the image to the Crop annotation.  Other annotations keep their
    /// coordinates.  Returns false when there is nothing to crop.
    pub fn perform_crop(&mut self) -> bool {
        let Some(source) = &self.source else { return false };
        let Some(crop) = self.annotations.iter().find(|a| a.kind == AnnotationKind::Crop) else {
            return false;
        };
        let (crop_id, bounds) = (crop.id, crop.bounds());
        let Some(region) = clamp_rect(bounds, source.width(), source.height()) else {
            log_warn!("Crop region lies outside the image; ignoring");
            return false;
        };

        let cropped = extract_region(source, region);
        self.remove_annotation(crop_id);
        self.replace_image(cropped);
        log_info!("Image cropped to {}x{}", region.width, region.height);
        self.set_status("Image cropped");
        true
    }

    // ---- whole-image effects ----------------------------------------------

    /// Run `effect` on the working image and replace it with the result.
    pub fn apply_effect(&mut self, dispatcher: &EffectDispatcher, effect: &dyn Effect) -> bool {
        let Some(source) = &self.source else { return false };
        let result = dispatcher.apply(effect, source);
        self.replace_image(result);
        log_info!("Applied {}", effect.name());
        self.set_status(format!("{} applied", effect.name()));
        true
    }

    /// Show `image` in place of the working image until committed or cancelled.
    pub fn set_preview(&mut self, image: RgbaImage) {
        self.preview = Some(image);
        self.invalidated = true;
    }

    /// Compute `effect` into the preview slot.
    pub fn preview_effect(&mut self, dispatcher: &EffectDispatcher, effect: &dyn Effect) -> bool {
        let Some(source) = &self.source else { return false };
        let result = dispatcher.apply(effect, source);
        self.set_preview(result);
        true
    }

    pub fn commit_preview(&mut self) -> bool {
        let Some(preview) = self.preview.take() else { return false };
        self.replace_image(preview);
        self.set_status("Effect applied");
        true
    }

    pub fn cancel_preview(&mut self) {
        if self.preview.take().is_some() {
            self.invalidated = true;
        }
    }

    fn refresh_region_caches(&mut self) {
        let Some(source) = &self.source else { return };
        for ann in self.annotations.iter_mut() {
            ann.refresh_cache(source);
            if let AnnotationKind::Spotlight { canvas } = &mut ann.kind {
                *canvas = source.dimensions();
            }
        }
    }

    // ---- composition -------------------------------------------------------

    /// Image (or preview) plus annotations plus selection handles.
    pub fn render(&self) -> Option<RgbaImage> {
        let mut canvas = self.composite()?;
        if let Some(ann) = self.selected_annotation() {
            draw_selection_handles(&mut canvas, ann.bounds(), self.handle_size);
        }
        Some(canvas)
    }

    /// Image plus annotations, without selection handles.
    pub fn snapshot(&self) -> Option<RgbaImage> {
        self.composite()
    }

    fn composite(&self) -> Option<RgbaImage> {
        let mut canvas = self.preview.as_ref().or(self.source.as_ref())?.clone();
        for ann in &self.annotations {
            render_annotation(&mut canvas, ann);
        }
        Some(canvas)
    }

    /// Encode the snapshot.
    pub fn export(&self, format: ExportFormat, quality: u8) -> Result<Vec<u8>> {
        let snapshot = self.snapshot().ok_or(PixmarkError::NoImage)?;
        encode_image(&snapshot, format, quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn session_with_image(w: u32, h: u32) -> EditorSession {
        let mut s = EditorSession::new();
        s.load_image(RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255])));
        s.take_invalidation();
        s
    }

    fn draw(s: &mut EditorSession, tool: Tool, a: (f64, f64), b: (f64, f64)) -> AnnotationId {
        s.set_tool(tool);
        s.pointer_pressed(Point::new(a.0, a.1), false);
        s.pointer_moved(Point::new(b.0, b.1));
        s.pointer_released(Point::new(b.0, b.1));
        s.selected().unwrap()
    }

    #[test]
    fn drawing_appends_while_in_progress() {
        let mut s = session_with_image(100, 100);
        s.set_tool(Tool::Rectangle);
        s.pointer_pressed(Point::new(10.0, 10.0), false);
        assert_eq!(s.annotations().len(), 1);
        assert!(!s.can_undo());
        assert!(matches!(s.interaction(), Interaction::Drawing { .. }));
        s.pointer_released(Point::new(40.0, 40.0));
        assert!(s.can_undo());
        assert_eq!(s.interaction(), Interaction::Idle);
        assert_eq!(s.status_text(), "Rectangle created");
    }

    #[test]
    fn number_counter_increments_per_marker() {
        let mut s = session_with_image(100, 100);
        let a = draw(&mut s, Tool::Number, (10.0, 10.0), (10.0, 10.0));
        let b = draw(&mut s, Tool::Number, (60.0, 60.0), (60.0, 60.0));
        let num = |id| match s.annotation(id).unwrap().kind {
            AnnotationKind::Number { number, .. } => number,
            _ => 0,
        };
        assert_eq!((num(a), num(b)), (1, 2));
        assert_eq!(s.number_counter(), 3);
    }

    #[test]
    fn drag_moves_without_history() {
        let mut s = session_with_image(100, 100);
        let id = draw(&mut s, Tool::Rectangle, (10.0, 10.0), (30.0, 30.0));
        s.set_tool(Tool::Select);
        s.pointer_pressed(Point::new(10.0, 20.0), false);
        s.pointer_moved(Point::new(15.0, 25.0));
        s.pointer_released(Point::new(15.0, 25.0));
        let ann = s.annotation(id).unwrap();
        assert_eq!(ann.start, Point::new(15.0, 15.0));
        assert_eq!(ann.end, Point::new(35.0, 35.0));
        assert_eq!(s.undo_ids().len(), 1);
    }

    #[test]
    fn select_miss_clears_selection() {
        let mut s = session_with_image(100, 100);
        draw(&mut s, Tool::Rectangle, (10.0, 10.0), (30.0, 30.0));
        s.set_tool(Tool::Select);
        s.pointer_pressed(Point::new(90.0, 90.0), false);
        assert_eq!(s.selected(), None);
        assert_eq!(s.interaction(), Interaction::Idle);
    }

    #[test]
    fn second_crop_replaces_the_first() {
        let mut s = session_with_image(100, 100);
        draw(&mut s, Tool::Crop, (0.0, 0.0), (10.0, 10.0));
        draw(&mut s, Tool::Crop, (20.0, 20.0), (60.0, 50.0));
        let crops = s.annotations().iter().filter(|a| a.kind == AnnotationKind::Crop).count();
        assert_eq!(crops, 1);
        assert!(s.perform_crop());
        assert_eq!(s.image().unwrap().dimensions(), (40, 30));
    }

    #[test]
    fn zoom_is_clamped() {
        let mut s = EditorSession::new();
        s.set_zoom(100.0);
        assert_eq!(s.zoom(), MAX_ZOOM);
        s.set_zoom(0.0);
        assert_eq!(s.zoom(), MIN_ZOOM);
    }

    #[test]
    fn intents_drain_in_order() {
        let mut s = EditorSession::new();
        s.request_intent(Intent::Copy);
        s.request_intent(Intent::Save);
        assert_eq!(s.drain_intents(), vec![Intent::Copy, Intent::Save]);
        assert!(s.drain_intents().is_empty());
    }

    #[test]
    fn export_format_names() {
        assert_eq!(ExportFormat::parse("JPG").unwrap(), ExportFormat::Jpeg);
        assert_eq!(ExportFormat::parse(".webp").unwrap(), ExportFormat::WebP);
        assert!(matches!(ExportFormat::parse("tiff"), Err(PixmarkError::UnsupportedFormat(_))));
    }

    #[test]
    fn preview_replaces_source_only_in_render() {
        let mut s = session_with_image(4, 4);
        s.set_preview(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255])));
        assert_eq!(*s.render().unwrap().get_pixel(0, 0), Rgba([0, 0, 0, 255]));
        assert_eq!(*s.image().unwrap().get_pixel(0, 0), Rgba([255, 255, 255, 255]));
        s.cancel_preview();
        assert_eq!(*s.render().unwrap().get_pixel(0, 0), Rgba([255, 255, 255, 255]));
    }
}
