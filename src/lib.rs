//! Pixmark — raster annotation and image-effect engine.
//!
//! An [`session::EditorSession`] owns a working image and an ordered list of
//! annotations driven by pointer events, with undo/redo, crop and composite
//! rendering.  Whole-image effects implement [`effect::Effect`] and run through
//! [`gpu::EffectDispatcher`], which picks the CPU path or a leased GPU device.

#![allow(clippy::too_many_arguments)]

#[macro_use]
pub mod logger;

pub mod annotation;
pub mod canvas;
pub mod config;
pub mod effect;
pub mod error;
pub mod gpu;
pub mod ops;
pub mod project;
pub mod session;

pub use annotation::{Annotation, AnnotationId, AnnotationKind, Tool};
pub use config::EditorConfig;
pub use effect::{Effect, EffectSpec};
pub use error::{PixmarkError, Result};
pub use gpu::EffectDispatcher;
pub use session::{EditorSession, ExportFormat, Intent};
