// ============================================================================
// OPS — pure pixel routines
// ============================================================================
//
//   sampling.rs    — clamped/wrapped lookup, bilinear sampling, hashing
//   filters.rs     — convolution, blurs, median, sharpen, Sobel edges
//   adjustments.rs — color matrices and per-pixel tone operations
//   transform.rs   — homography, radial warps, rotate/flip/resize
//   effects.rs     — procedural effects (stained glass, oil paint, ...)
//   text.rs        — font lookup and glyph rasterization
// ============================================================================

pub mod adjustments;
pub mod effects;
pub mod filters;
pub mod sampling;
pub mod text;
pub mod transform;
