// ============================================================================
// EFFECT DISPATCHER — CPU vs GPU routing for whole-image effects
// ============================================================================
//
// Policy: with a provider registered, an effect that has a GPU program and a
// source of at least `threshold` pixels is tried on the GPU.  Any failure
// (no lease, unusable device, oversize texture, readback error, panic) falls
// back to the CPU path.  The caller always gets a buffer and never an error.
// ============================================================================

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};

use image::RgbaImage;

use super::{GpuError, GpuLeaseProvider};
use crate::config::{DEFAULT_GPU_PIXEL_THRESHOLD, EditorConfig};
use crate::effect::{Effect, GpuProgram};

/// Last reported GPU route.  Diagnostics fire only when this changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum GpuRoute {
    /// No GPU attempt made yet.
    Unreported = 0,
    Active = 1,
    Unavailable = 2,
    FallingBack = 3,
}

impl GpuRoute {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => GpuRoute::Active,
            2 => GpuRoute::Unavailable,
            3 => GpuRoute::FallingBack,
            _ => GpuRoute::Unreported,
        }
    }
}

pub struct EffectDispatcher {
    threshold: u64,
    provider: Option<Arc<dyn GpuLeaseProvider>>,
    route: AtomicU8,
    transitions: AtomicU32,
}

impl Default for EffectDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectDispatcher {
    /// CPU-only dispatcher with the default pixel threshold.
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_GPU_PIXEL_THRESHOLD)
    }

    pub fn with_threshold(threshold: u64) -> Self {
        Self {
            threshold,
            provider: None,
            route: AtomicU8::new(GpuRoute::Unreported as u8),
            transitions: AtomicU32::new(0),
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::with_threshold(config.gpu_pixel_threshold)
    }

    /// Install a provider, or with `None` force CPU-only operation.
    pub fn register_gpu_lease_provider(&mut self, provider: Option<Arc<dyn GpuLeaseProvider>>) {
        match &provider {
            Some(_) => {
                crate::log_info!("GPU lease provider registered");
            }
            None if self.provider.is_some() => {
                crate::log_info!("GPU lease provider removed; CPU only");
            }
            None => {}
        }
        self.provider = provider;
        self.route.store(GpuRoute::Unreported as u8, Ordering::Relaxed);
    }

    pub fn has_gpu(&self) -> bool {
        self.provider.is_some()
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn route(&self) -> GpuRoute {
        GpuRoute::from_u8(self.route.load(Ordering::Relaxed))
    }

    /// Number of route changes reported so far.
    pub fn transitions(&self) -> u32 {
        self.transitions.load(Ordering::Relaxed)
    }

    /// Run `effect` over `src` and return the new buffer.  `src` is never
    /// modified.  Same-size effects always return a same-size buffer.
    pub fn apply(&self, effect: &dyn Effect, src: &RgbaImage) -> RgbaImage {
        let pixels = src.width() as u64 * src.height() as u64;
        let gpu_job = match (&self.provider, effect.gpu_program()) {
            (Some(provider), Some(program)) if !effect.resizes() && pixels >= self.threshold => {
                Some((provider, program))
            }
            _ => None,
        };
        let Some((provider, program)) = gpu_job else {
            return effect.apply(src);
        };

        let attempt = panic::catch_unwind(AssertUnwindSafe(|| run_on_gpu(&**provider, &program, src)));
        match attempt {
            Ok(Ok(out)) => {
                self.report(GpuRoute::Active, || {
                    crate::log_info!("GPU active for {} ({}x{})", effect.name(), src.width(), src.height());
                });
                out
            }
            Ok(Err(err @ (GpuError::LeaseUnavailable | GpuError::Unusable))) => {
                self.report(GpuRoute::Unavailable, || {
                    crate::log_warn!("GPU unavailable ({err}); running {} on CPU", effect.name());
                });
                effect.apply(src)
            }
            Ok(Err(err)) => {
                self.report(GpuRoute::FallingBack, || {
                    crate::log_warn!("GPU run failed ({err}); falling back to CPU for {}", effect.name());
                });
                effect.apply(src)
            }
            Err(_) => {
                self.report(GpuRoute::FallingBack, || {
                    crate::log_err!("GPU run panicked; falling back to CPU for {}", effect.name());
                });
                effect.apply(src)
            }
        }
    }

    fn report(&self, route: GpuRoute, log: impl FnOnce()) {
        let prev = self.route.swap(route as u8, Ordering::Relaxed);
        if prev != route as u8 {
            self.transitions.fetch_add(1, Ordering::Relaxed);
            log();
        }
    }
}

fn run_on_gpu(provider: &dyn GpuLeaseProvider, program: &GpuProgram, src: &RgbaImage) -> Result<RgbaImage, GpuError> {
    let mut lease = provider.lease().ok_or(GpuError::LeaseUnavailable)?;
    if !lease.is_usable() {
        return Err(GpuError::Unusable);
    }
    let (w, h) = src.dimensions();
    let max = lease.max_dimension();
    if w > max || h > max {
        return Err(GpuError::TooLarge { width: w, height: h });
    }
    let out = lease.run(program, src)?;
    if out.dimensions() != src.dimensions() {
        return Err(GpuError::Readback(format!(
            "expected {w}x{h}, got {}x{}",
            out.width(),
            out.height()
        )));
    }
    Ok(out)
}
