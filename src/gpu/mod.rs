// ============================================================================
// GPU MODULE — leased GPU execution of effect programs
// ============================================================================
//
// Architecture:
//   lease.rs      — GpuDevice / GpuLeaseProvider capabilities, GpuLease guard,
//                   SharedGpuContext (mutex-backed provider)
//   dispatcher.rs — EffectDispatcher: CPU vs GPU routing and fallback
//   context.rs    — adapter preference, compute-only wgpu device, loss flag
//   compute.rs    — ColorMatrixPass, texture staging, WgpuDevice
//   shaders.rs    — WGSL shader source (inline strings)
// ============================================================================

pub mod compute;
pub mod context;
pub mod dispatcher;
pub mod lease;
pub mod shaders;

pub use compute::WgpuDevice;
pub use context::{AdapterPreference, GpuContext};
pub use dispatcher::{EffectDispatcher, GpuRoute};
pub use lease::{GpuDevice, GpuLease, GpuLeaseProvider, SharedGpuContext};

use thiserror::Error;

/// Why a GPU attempt did not produce a result.  Never surfaced to callers of
/// the dispatcher; every variant selects the CPU path.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GpuError {
    #[error("no GPU lease available")]
    LeaseUnavailable,

    #[error("no GPU adapter found")]
    NoAdapter,

    #[error("GPU context is unusable")]
    Unusable,

    #[error("{width}x{height} exceeds the device texture limit")]
    TooLarge { width: u32, height: u32 },

    #[error("GPU readback failed: {0}")]
    Readback(String),

    #[error("program not supported by this device")]
    Unsupported,
}
