// ============================================================================
// EFFECT — the contract every whole-image operation implements
// ============================================================================
//
// An effect is a pure function from one pixel buffer to a new one.  It never
// mutates its input.  Effects that can run on the GPU describe themselves
// with a `GpuProgram`; the dispatcher decides whether to use it.
// ============================================================================

pub mod catalog;

pub use catalog::EffectSpec;

use image::RgbaImage;

use crate::ops::adjustments::ColorMatrix;

/// Grouping used for listings and logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectCategory {
    Adjustment,
    Filter,
    Manipulation,
    Geometry,
}

impl EffectCategory {
    pub fn label(self) -> &'static str {
        match self {
            EffectCategory::Adjustment => "Adjustments",
            EffectCategory::Filter => "Filters",
            EffectCategory::Manipulation => "Manipulations",
            EffectCategory::Geometry => "Geometry",
        }
    }
}

/// A GPU-executable description of an effect.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GpuProgram {
    /// 4×5 row-major matrix, translation column in normalized 0..1 units.
    ColorMatrix(ColorMatrix),
}

pub trait Effect: Send + Sync {
    /// Stable catalog key, e.g. `gaussian_blur`.
    fn name(&self) -> &'static str;

    fn category(&self) -> EffectCategory;

    /// CPU reference implementation.  Must not depend on anything but
    /// `src` and the effect's own parameters.
    fn apply(&self, src: &RgbaImage) -> RgbaImage;

    /// GPU form of this effect, if it has one.
    fn gpu_program(&self) -> Option<GpuProgram> {
        None
    }

    /// True when the output may differ in size from the input.
    fn resizes(&self) -> bool {
        false
    }
}
