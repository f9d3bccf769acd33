// ============================================================================
// EFFECT CATALOG — every built-in effect as a serializable parameter record
// ============================================================================
//
// `EffectSpec` is internally tagged on `effect`, so
// `{"effect": "gaussian_blur", "radius": 8}` builds a blur; omitted fields take
// their defaults.  Parameters are clamped when applied, never rejected.
// ============================================================================

use image::RgbaImage;
use kurbo::Point;
use serde::{Deserialize, Serialize};

use super::{Effect, EffectCategory, GpuProgram};
use crate::config::parse_hex_color;
use crate::error::{PixmarkError, Result};
use crate::ops::adjustments::{self, ColorMatrix};
use crate::ops::effects::{self, ChannelOffsets, LiquidGlassParams, StainedGlassParams};
use crate::ops::filters;
use crate::ops::transform::{self, CornerOffsets, FlipAxis, Rotation};

// ============================================================================
// PARAMETER RECORDS
// ============================================================================

/// A single signed amount in -100..100.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Amount {
    pub amount: f32,
}

/// Parameterless effects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoParams {}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorMatrixParams {
    pub matrix: ColorMatrix,
}

impl Default for ColorMatrixParams {
    fn default() -> Self {
        Self { matrix: adjustments::IDENTITY_MATRIX }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExposureParams {
    /// EV stops, -5..5.
    pub exposure: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HueParams {
    pub degrees: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GammaParams {
    pub gamma: f32,
}

impl Default for GammaParams {
    fn default() -> Self {
        Self { gamma: 1.0 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelsParams {
    pub input_black: u8,
    pub input_white: u8,
    pub gamma: f32,
    pub output_black: u8,
    pub output_white: u8,
}

impl Default for LevelsParams {
    fn default() -> Self {
        Self { input_black: 0, input_white: 255, gamma: 1.0, output_black: 0, output_white: 255 }
    }
}

impl LevelsParams {
    pub fn levels(&self) -> adjustments::Levels {
        adjustments::Levels {
            input_black: self.input_black,
            input_white: self.input_white,
            gamma: self.gamma,
            output_black: self.output_black,
            output_white: self.output_white,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlphaParams {
    /// Percent of the current alpha kept, 0..100.
    pub opacity: f32,
}

impl Default for AlphaParams {
    fn default() -> Self {
        Self { opacity: 100.0 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdParams {
    pub threshold: u8,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self { threshold: 128 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PosterizeParams {
    pub levels: u32,
}

impl Default for PosterizeParams {
    fn default() -> Self {
        Self { levels: 8 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VibranceParams {
    pub amount: f32,
}

impl Default for VibranceParams {
    fn default() -> Self {
        Self { amount: 25.0 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoContrastParams {
    pub clip_percent: f32,
}

impl Default for AutoContrastParams {
    fn default() -> Self {
        Self { clip_percent: 0.5 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorizeParams {
    /// `#rrggbb` or `#rrggbbaa`; unparseable values fall back to red.
    pub color: String,
    pub strength: f32,
}

impl Default for ColorizeParams {
    fn default() -> Self {
        Self { color: "#ff0000".to_string(), strength: 50.0 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorDepthParams {
    pub bits: u32,
}

impl Default for ColorDepthParams {
    fn default() -> Self {
        Self { bits: 4 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvolutionParams {
    pub kernel: [i32; 9],
    /// Divisor; the applied gain is `1 / max(factor, 0.01)`.
    pub factor: f32,
    /// Added after scaling, in 0..255 units.
    pub offset: f32,
}

impl Default for ConvolutionParams {
    fn default() -> Self {
        Self { kernel: [0, 0, 0, 0, 1, 0, 0, 0, 0], factor: 1.0, offset: 0.0 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlurParams {
    pub radius: u32,
}

impl Default for BlurParams {
    fn default() -> Self {
        Self { radius: 15 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MedianParams {
    /// 1..5.
    pub radius: u32,
}

impl Default for MedianParams {
    fn default() -> Self {
        Self { radius: 1 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnsharpParams {
    pub radius: f32,
    /// Percent, 0..500.
    pub amount: f32,
    pub threshold: u8,
}

impl Default for UnsharpParams {
    fn default() -> Self {
        Self { radius: 5.0, amount: 150.0, threshold: 0 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharpenParams {
    /// 0..5.
    pub strength: f32,
}

impl Default for SharpenParams {
    fn default() -> Self {
        Self { strength: 1.0 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionBlurParams {
    /// Samples along the streak, 1..200.
    pub distance: u32,
    pub angle: f32,
}

impl Default for MotionBlurParams {
    fn default() -> Self {
        Self { distance: 12, angle: 0.0 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OilPaintParams {
    pub radius: u32,
    pub levels: u32,
}

impl Default for OilPaintParams {
    fn default() -> Self {
        Self { radius: 3, levels: 24 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SobelParams {
    pub strength: f32,
    pub threshold: u8,
}

impl Default for SobelParams {
    fn default() -> Self {
        Self { strength: 1.2, threshold: 20 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParams {
    pub amount: f32,
    pub seed: u32,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self { amount: 8.0, seed: 1337 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VignetteParams {
    pub strength: f32,
    pub radius: f32,
}

impl Default for VignetteParams {
    fn default() -> Self {
        Self { strength: 0.5, radius: 0.75 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RgbSplitParams {
    pub red_x: i32,
    pub red_y: i32,
    pub green_x: i32,
    pub green_y: i32,
    pub blue_x: i32,
    pub blue_y: i32,
}

impl Default for RgbSplitParams {
    fn default() -> Self {
        Self { red_x: -5, red_y: 0, green_x: 0, green_y: 0, blue_x: 5, blue_y: 0 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PixelateParams {
    pub block: u32,
}

impl Default for PixelateParams {
    fn default() -> Self {
        Self { block: 10 }
    }
}

/// Radius and center are percentages of the image size.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinchBulgeParams {
    /// -100..100; negative pinches.
    pub strength: f32,
    pub radius: f32,
    pub center_x: f32,
    pub center_y: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwirlParams {
    /// Degrees at the center, -720..720.
    pub angle: f32,
    pub radius: f32,
    pub center_x: f32,
    pub center_y: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplacementParams {
    pub amount_x: f32,
    pub amount_y: f32,
}

impl Default for DisplacementParams {
    fn default() -> Self {
        Self { amount_x: 20.0, amount_y: 20.0 }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerspectiveParams {
    pub top_left_x: f64,
    pub top_left_y: f64,
    pub top_right_x: f64,
    pub top_right_y: f64,
    pub bottom_right_x: f64,
    pub bottom_right_y: f64,
    pub bottom_left_x: f64,
    pub bottom_left_y: f64,
}

impl PerspectiveParams {
    pub fn offsets(&self) -> CornerOffsets {
        CornerOffsets {
            top_left: Point::new(self.top_left_x, self.top_left_y),
            top_right: Point::new(self.top_right_x, self.top_right_y),
            bottom_right: Point::new(self.bottom_right_x, self.bottom_right_y),
            bottom_left: Point::new(self.bottom_left_x, self.bottom_left_y),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotateParams {
    /// Rounded to the nearest quarter turn.
    pub degrees: i32,
}

impl Default for RotateParams {
    fn default() -> Self {
        Self { degrees: 90 }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlipParams {
    pub axis: FlipAxis,
}

/// Target size; a zero dimension keeps the source dimension.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResizeParams {
    pub width: u32,
    pub height: u32,
}

// ============================================================================
// EFFECT SPEC
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum EffectSpec {
    // --- Adjustments (color matrix) ---
    Brightness(Amount),
    Contrast(Amount),
    Saturation(Amount),
    Grayscale(NoParams),
    Invert(NoParams),
    Sepia(NoParams),
    ColorMatrix(ColorMatrixParams),
    Exposure(ExposureParams),
    Alpha(AlphaParams),
    // --- Adjustments (per pixel) ---
    Solarize(ThresholdParams),
    Threshold(ThresholdParams),
    Posterize(PosterizeParams),
    Vibrance(VibranceParams),
    AutoContrast(AutoContrastParams),
    BlackAndWhite(NoParams),
    Colorize(ColorizeParams),
    ColorDepth(ColorDepthParams),
    Gamma(GammaParams),
    Levels(LevelsParams),
    Hue(HueParams),
    // --- Filters ---
    ConvolutionMatrix(ConvolutionParams),
    Emboss(NoParams),
    EdgeDetect(NoParams),
    Smooth(NoParams),
    MeanRemoval(NoParams),
    GaussianBlur(BlurParams),
    Median(MedianParams),
    UnsharpMask(UnsharpParams),
    Sharpen(SharpenParams),
    MotionBlur(MotionBlurParams),
    OilPaint(OilPaintParams),
    SobelEdge(SobelParams),
    AddNoise(NoiseParams),
    Vignette(VignetteParams),
    RgbSplit(RgbSplitParams),
    StainedGlass(StainedGlassParams),
    LiquidGlass(LiquidGlassParams),
    Pixelate(PixelateParams),
    // --- Manipulations ---
    PinchBulge(PinchBulgeParams),
    Twirl(TwirlParams),
    DisplacementMap(DisplacementParams),
    PerspectiveWarp(PerspectiveParams),
    // --- Geometry ---
    Rotate(RotateParams),
    Flip(FlipParams),
    Resize(ResizeParams),
}

const NAMES: &[&str] = &[
    "brightness",
    "contrast",
    "saturation",
    "grayscale",
    "invert",
    "sepia",
    "color_matrix",
    "exposure",
    "alpha",
    "solarize",
    "threshold",
    "posterize",
    "vibrance",
    "auto_contrast",
    "black_and_white",
    "colorize",
    "color_depth",
    "gamma",
    "levels",
    "hue",
    "convolution_matrix",
    "emboss",
    "edge_detect",
    "smooth",
    "mean_removal",
    "gaussian_blur",
    "median",
    "unsharp_mask",
    "sharpen",
    "motion_blur",
    "oil_paint",
    "sobel_edge",
    "add_noise",
    "vignette",
    "rgb_split",
    "stained_glass",
    "liquid_glass",
    "pixelate",
    "pinch_bulge",
    "twirl",
    "displacement_map",
    "perspective_warp",
    "rotate",
    "flip",
    "resize",
];

const EMBOSS_KERNEL: [f32; 9] = [-1.0, 0.0, -1.0, 0.0, 4.0, 0.0, -1.0, 0.0, -1.0];
const EDGE_DETECT_KERNEL: [f32; 9] = [-1.0, -1.0, -1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
const SMOOTH_KERNEL: [f32; 9] = [1.0 / 9.0; 9];
const MEAN_REMOVAL_KERNEL: [f32; 9] = [-1.0, -1.0, -1.0, -1.0, 9.0, -1.0, -1.0, -1.0, -1.0];

impl EffectSpec {
    /// Every catalog key, in listing order.
    pub fn names() -> &'static [&'static str] {
        NAMES
    }

    /// The effect with all parameters at their defaults.
    pub fn default_for(name: &str) -> Result<Self> {
        Self::from_name_and_pairs(name, &[])
    }

    /// Parse a JSON object such as `{"effect": "twirl", "angle": 180}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json).map_err(|e| PixmarkError::InvalidParameter {
            effect: "json".to_string(),
            detail: e.to_string(),
        })?;
        Self::from_value(value)
    }

    /// Build from a catalog key and `key=value` pairs.  Values are read as
    /// JSON when they parse (`3`, `true`, `[1,2]`) and as strings otherwise.
    pub fn from_name_and_pairs(name: &str, pairs: &[(String, String)]) -> Result<Self> {
        let mut map = serde_json::Map::new();
        map.insert("effect".to_string(), serde_json::Value::String(name.to_string()));
        for (key, raw) in pairs {
            let value = serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.clone()));
            map.insert(key.clone(), value);
        }
        Self::from_value(serde_json::Value::Object(map))
    }

    fn from_value(value: serde_json::Value) -> Result<Self> {
        let name = value
            .get("effect")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_default();
        if !NAMES.contains(&name.as_str()) {
            return Err(PixmarkError::UnknownEffect(name));
        }
        serde_json::from_value(value).map_err(|e| PixmarkError::InvalidParameter { effect: name, detail: e.to_string() })
    }

    pub fn build(&self) -> Box<dyn Effect> {
        Box::new(self.clone())
    }

    fn color_matrix(&self) -> Option<ColorMatrix> {
        match self {
            EffectSpec::Brightness(p) => Some(adjustments::brightness_matrix(p.amount)),
            EffectSpec::Contrast(p) => Some(adjustments::contrast_matrix(p.amount)),
            EffectSpec::Saturation(p) => Some(adjustments::saturation_matrix(p.amount)),
            EffectSpec::Grayscale(_) => Some(adjustments::GRAYSCALE_MATRIX),
            EffectSpec::Invert(_) => Some(adjustments::INVERT_MATRIX),
            EffectSpec::Sepia(_) => Some(adjustments::SEPIA_MATRIX),
            EffectSpec::ColorMatrix(p) => Some(p.matrix),
            EffectSpec::Exposure(p) => Some(adjustments::exposure_matrix(p.exposure)),
            EffectSpec::Alpha(p) => Some(adjustments::alpha_matrix(p.opacity)),
            _ => None,
        }
    }
}

impl Default for PinchBulgeParams {
    fn default() -> Self {
        Self { strength: 35.0, radius: 50.0, center_x: 50.0, center_y: 50.0 }
    }
}

impl Default for TwirlParams {
    fn default() -> Self {
        Self { angle: 90.0, radius: 50.0, center_x: 50.0, center_y: 50.0 }
    }
}

fn quarter_turn(degrees: i32) -> Option<Rotation> {
    let quarters = ((degrees as f32 / 90.0).round() as i32).rem_euclid(4);
    match quarters {
        1 => Some(Rotation::Cw90),
        2 => Some(Rotation::Cw180),
        3 => Some(Rotation::Cw270),
        _ => None,
    }
}

impl Effect for EffectSpec {
    fn name(&self) -> &'static str {
        match self {
            EffectSpec::Brightness(_) => "brightness",
            EffectSpec::Contrast(_) => "contrast",
            EffectSpec::Saturation(_) => "saturation",
            EffectSpec::Grayscale(_) => "grayscale",
            EffectSpec::Invert(_) => "invert",
            EffectSpec::Sepia(_) => "sepia",
            EffectSpec::ColorMatrix(_) => "color_matrix",
            EffectSpec::Exposure(_) => "exposure",
            EffectSpec::Alpha(_) => "alpha",
            EffectSpec::Solarize(_) => "solarize",
            EffectSpec::Threshold(_) => "threshold",
            EffectSpec::Posterize(_) => "posterize",
            EffectSpec::Vibrance(_) => "vibrance",
            EffectSpec::AutoContrast(_) => "auto_contrast",
            EffectSpec::BlackAndWhite(_) => "black_and_white",
            EffectSpec::Colorize(_) => "colorize",
            EffectSpec::ColorDepth(_) => "color_depth",
            EffectSpec::Gamma(_) => "gamma",
            EffectSpec::Levels(_) => "levels",
            EffectSpec::Hue(_) => "hue",
            EffectSpec::ConvolutionMatrix(_) => "convolution_matrix",
            EffectSpec::Emboss(_) => "emboss",
            EffectSpec::EdgeDetect(_) => "edge_detect",
            EffectSpec::Smooth(_) => "smooth",
            EffectSpec::MeanRemoval(_) => "mean_removal",
            EffectSpec::GaussianBlur(_) => "gaussian_blur",
            EffectSpec::Median(_) => "median",
            EffectSpec::UnsharpMask(_) => "unsharp_mask",
            EffectSpec::Sharpen(_) => "sharpen",
            EffectSpec::MotionBlur(_) => "motion_blur",
            EffectSpec::OilPaint(_) => "oil_paint",
            EffectSpec::SobelEdge(_) => "sobel_edge",
            EffectSpec::AddNoise(_) => "add_noise",
            EffectSpec::Vignette(_) => "vignette",
            EffectSpec::RgbSplit(_) => "rgb_split",
            EffectSpec::StainedGlass(_) => "stained_glass",
            EffectSpec::LiquidGlass(_) => "liquid_glass",
            EffectSpec::Pixelate(_) => "pixelate",
            EffectSpec::PinchBulge(_) => "pinch_bulge",
            EffectSpec::Twirl(_) => "twirl",
            EffectSpec::DisplacementMap(_) => "displacement_map",
            EffectSpec::PerspectiveWarp(_) => "perspective_warp",
            EffectSpec::Rotate(_) => "rotate",
            EffectSpec::Flip(_) => "flip",
            EffectSpec::Resize(_) => "resize",
        }
    }

    fn category(&self) -> EffectCategory {
        match self {
            EffectSpec::Brightness(_)
            | EffectSpec::Contrast(_)
            | EffectSpec::Saturation(_)
            | EffectSpec::Grayscale(_)
            | EffectSpec::Invert(_)
            | EffectSpec::Sepia(_)
            | EffectSpec::ColorMatrix(_)
            | EffectSpec::Exposure(_)
            | EffectSpec::Alpha(_)
            | EffectSpec::Solarize(_)
            | EffectSpec::Threshold(_)
            | EffectSpec::Posterize(_)
            | EffectSpec::Vibrance(_)
            | EffectSpec::AutoContrast(_)
            | EffectSpec::BlackAndWhite(_)
            | EffectSpec::Colorize(_)
            | EffectSpec::ColorDepth(_)
            | EffectSpec::Gamma(_)
            | EffectSpec::Levels(_)
            | EffectSpec::Hue(_) => EffectCategory::Adjustment,
            EffectSpec::PinchBulge(_)
            | EffectSpec::Twirl(_)
            | EffectSpec::DisplacementMap(_)
            | EffectSpec::PerspectiveWarp(_) => EffectCategory::Manipulation,
            EffectSpec::Rotate(_) | EffectSpec::Flip(_) | EffectSpec::Resize(_) => EffectCategory::Geometry,
            _ => EffectCategory::Filter,
        }
    }

    fn apply(&self, src: &RgbaImage) -> RgbaImage {
        if let Some(m) = self.color_matrix() {
            return adjustments::color_matrix_core(src, &m);
        }
        match self {
            EffectSpec::Solarize(p) => adjustments::solarize_core(src, p.threshold),
            EffectSpec::Threshold(p) => adjustments::threshold_core(src, p.threshold),
            EffectSpec::Posterize(p) => adjustments::posterize_core(src, p.levels),
            EffectSpec::Vibrance(p) => adjustments::vibrance_core(src, p.amount.clamp(-100.0, 100.0) / 100.0),
            EffectSpec::AutoContrast(p) => adjustments::auto_contrast_core(src, p.clip_percent),
            EffectSpec::BlackAndWhite(_) => adjustments::black_and_white_core(src),
            EffectSpec::Colorize(p) => {
                let color = parse_hex_color(&p.color).unwrap_or([255, 0, 0, 255]);
                adjustments::colorize_core(src, color, p.strength.clamp(0.0, 100.0) / 100.0)
            }
            EffectSpec::ColorDepth(p) => adjustments::color_depth_core(src, p.bits),
            EffectSpec::Gamma(p) => adjustments::gamma_core(src, p.gamma),
            EffectSpec::Levels(p) => adjustments::levels_core(src, &p.levels()),
            EffectSpec::Hue(p) => adjustments::hue_core(src, p.degrees),
            EffectSpec::ConvolutionMatrix(p) => {
                let kernel = p.kernel.map(|k| k as f32);
                let gain = 1.0 / p.factor.max(0.01);
                filters::convolve_3x3(src, &kernel, gain, p.offset, false)
            }
            EffectSpec::Emboss(_) => filters::convolve_3x3(src, &EMBOSS_KERNEL, 1.0, 127.0, false),
            EffectSpec::EdgeDetect(_) => filters::convolve_3x3(src, &EDGE_DETECT_KERNEL, 1.0, 127.0, false),
            EffectSpec::Smooth(_) => filters::convolve_3x3(src, &SMOOTH_KERNEL, 1.0, 0.0, false),
            EffectSpec::MeanRemoval(_) => filters::convolve_3x3(src, &MEAN_REMOVAL_KERNEL, 1.0, 0.0, false),
            EffectSpec::GaussianBlur(p) => {
                filters::gaussian_blur_padded(src, p.radius.clamp(1, filters::MAX_BLUR_RADIUS))
            }
            EffectSpec::Median(p) => filters::median_core(src, p.radius),
            EffectSpec::UnsharpMask(p) => filters::unsharp_core(
                src,
                p.radius.clamp(1.0, 100.0),
                p.amount.clamp(0.0, 500.0) / 100.0,
                p.threshold,
            ),
            EffectSpec::Sharpen(p) => filters::convolve_3x3(src, &filters::sharpen_kernel(p.strength), 1.0, 0.0, false),
            EffectSpec::MotionBlur(p) => filters::motion_blur_core(src, p.distance, p.angle),
            EffectSpec::OilPaint(p) => effects::oil_paint_core(src, p.radius, p.levels),
            EffectSpec::SobelEdge(p) => filters::sobel_core(src, p.strength, p.threshold),
            EffectSpec::AddNoise(p) => effects::add_noise_core(src, p.amount, p.seed),
            EffectSpec::Vignette(p) => effects::vignette_core(src, p.strength, p.radius),
            EffectSpec::RgbSplit(p) => effects::rgb_split_core(
                src,
                &ChannelOffsets {
                    red: (p.red_x, p.red_y),
                    green: (p.green_x, p.green_y),
                    blue: (p.blue_x, p.blue_y),
                },
            ),
            EffectSpec::StainedGlass(p) => effects::stained_glass_core(src, p),
            EffectSpec::LiquidGlass(p) => effects::liquid_glass_core(src, p),
            EffectSpec::Pixelate(p) => effects::pixelate_core(src, p.block),
            EffectSpec::PinchBulge(p) => transform::pinch_bulge_core(
                src,
                p.strength.clamp(-100.0, 100.0) / 100.0,
                p.radius,
                p.center_x,
                p.center_y,
            ),
            EffectSpec::Twirl(p) => transform::twirl_core(src, p.angle, p.radius, p.center_x, p.center_y),
            EffectSpec::DisplacementMap(p) => transform::displacement_map_core(src, p.amount_x, p.amount_y),
            EffectSpec::PerspectiveWarp(p) => transform::perspective_warp_core(src, &p.offsets()),
            EffectSpec::Rotate(p) => match quarter_turn(p.degrees) {
                Some(rotation) => transform::rotate_core(src, rotation),
                None => src.clone(),
            },
            EffectSpec::Flip(p) => transform::flip_core(src, p.axis),
            EffectSpec::Resize(p) => {
                let w = if p.width == 0 { src.width() } else { p.width };
                let h = if p.height == 0 { src.height() } else { p.height };
                transform::resize_core(src, w, h)
            }
            // Color-matrix variants returned above.
            _ => src.clone(),
        }
    }

    fn gpu_program(&self) -> Option<GpuProgram> {
        self.color_matrix().map(GpuProgram::ColorMatrix)
    }

    fn resizes(&self) -> bool {
        self.category() == EffectCategory::Geometry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_name_builds_with_defaults() {
        for name in EffectSpec::names() {
            let spec = EffectSpec::default_for(name).unwrap();
            assert_eq!(spec.name(), *name);
        }
    }

    #[test]
    fn pairs_override_defaults() {
        let spec = EffectSpec::from_name_and_pairs(
            "gaussian_blur",
            &[("radius".to_string(), "4".to_string())],
        )
        .unwrap();
        assert_eq!(spec, EffectSpec::GaussianBlur(BlurParams { radius: 4 }));
    }

    #[test]
    fn string_values_fall_back_to_strings() {
        let spec = EffectSpec::from_name_and_pairs(
            "colorize",
            &[("color".to_string(), "#00ff00".to_string())],
        )
        .unwrap();
        match spec {
            EffectSpec::Colorize(p) => assert_eq!(p.color, "#00ff00"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_effect_is_reported() {
        assert!(matches!(EffectSpec::default_for("sparkle"), Err(PixmarkError::UnknownEffect(_))));
    }

    #[test]
    fn wrong_type_is_invalid_parameter() {
        let err = EffectSpec::from_json(r#"{"effect":"median","radius":"wide"}"#).unwrap_err();
        assert!(matches!(err, PixmarkError::InvalidParameter { .. }));
    }

    #[test]
    fn only_matrix_effects_have_gpu_programs() {
        for name in EffectSpec::names() {
            let spec = EffectSpec::default_for(name).unwrap();
            let is_matrix = matches!(
                *name,
                "brightness"
                    | "contrast"
                    | "saturation"
                    | "grayscale"
                    | "invert"
                    | "sepia"
                    | "color_matrix"
                    | "exposure"
                    | "alpha"
            );
            assert_eq!(spec.gpu_program().is_some(), is_matrix, "{name}");
        }
    }

    #[test]
    fn rotate_rounds_to_quarter_turns() {
        let src = RgbaImage::new(6, 2);
        let spec = EffectSpec::Rotate(RotateParams { degrees: 85 });
        assert_eq!(spec.apply(&src).dimensions(), (2, 6));
        let spec = EffectSpec::Rotate(RotateParams { degrees: 360 });
        assert_eq!(spec.apply(&src).dimensions(), (6, 2));
        assert!(spec.resizes());
    }
}
