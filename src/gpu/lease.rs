// ============================================================================
// GPU LEASE — scoped, exclusive access to a shared GPU device
// ============================================================================

use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

use image::RgbaImage;

use super::GpuError;
use crate::effect::GpuProgram;

/// A device able to run effect programs.
pub trait GpuDevice: Send {
    fn name(&self) -> &str;

    /// False once the device has been lost or hit an unrecoverable error.
    fn is_usable(&self) -> bool;

    /// Largest texture side the device accepts.
    fn max_dimension(&self) -> u32;

    /// Run `program` over `src`, returning a buffer of identical size.
    fn run(&mut self, program: &GpuProgram, src: &RgbaImage) -> Result<RgbaImage, GpuError>;
}

/// Hands out leases on a GPU device.  `None` means no device right now.
pub trait GpuLeaseProvider: Send + Sync {
    fn lease(&self) -> Option<GpuLease<'_>>;
}

/// Exclusive handle on a device.  Dropping it releases the device, including
/// during unwinding.
pub struct GpuLease<'a> {
    guard: MutexGuard<'a, Box<dyn GpuDevice>>,
}

impl<'a> GpuLease<'a> {
    pub fn new(guard: MutexGuard<'a, Box<dyn GpuDevice>>) -> Self {
        Self { guard }
    }
}

impl Deref for GpuLease<'_> {
    type Target = dyn GpuDevice;

    fn deref(&self) -> &Self::Target {
        self.guard.as_ref()
    }
}

impl DerefMut for GpuLease<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.guard.as_mut()
    }
}

/// Process-wide device behind a mutex; concurrent GPU work serializes on
/// `lease()`.
pub struct SharedGpuContext {
    device: Mutex<Box<dyn GpuDevice>>,
}

impl SharedGpuContext {
    pub fn new(device: Box<dyn GpuDevice>) -> Self {
        Self { device: Mutex::new(device) }
    }

    /// Open the wgpu backend.  `None` when no adapter could be created.
    pub fn try_create(preferred_gpu: &str) -> Option<Self> {
        let preference = super::AdapterPreference::from_setting(preferred_gpu);
        let ctx = super::GpuContext::open(preference).ok()?;
        Some(Self::new(Box::new(super::WgpuDevice::new(ctx))))
    }

    /// True when no lease is currently held.
    pub fn is_idle(&self) -> bool {
        !matches!(self.device.try_lock(), Err(TryLockError::WouldBlock))
    }
}

impl GpuLeaseProvider for SharedGpuContext {
    fn lease(&self) -> Option<GpuLease<'_>> {
        let guard = self.device.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            // A previous holder panicked mid-run; the device itself is still
            // ours to use.
            crate::log_warn!("GPU lease recovered after a panicked run");
            self.device.clear_poison();
            poisoned.into_inner()
        });
        Some(GpuLease::new(guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy;

    impl GpuDevice for Dummy {
        fn name(&self) -> &str {
            "dummy"
        }
        fn is_usable(&self) -> bool {
            true
        }
        fn max_dimension(&self) -> u32 {
            64
        }
        fn run(&mut self, _program: &GpuProgram, src: &RgbaImage) -> Result<RgbaImage, GpuError> {
            Ok(src.clone())
        }
    }

    #[test]
    fn lease_is_released_on_drop() {
        let ctx = SharedGpuContext::new(Box::new(Dummy));
        {
            let lease = ctx.lease().unwrap();
            assert_eq!(lease.name(), "dummy");
            assert!(!ctx.is_idle());
        }
        assert!(ctx.is_idle());
    }

    #[test]
    fn poisoned_lease_is_recovered() {
        let ctx = SharedGpuContext::new(Box::new(Dummy));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _lease = ctx.lease().unwrap();
            panic!("device blew up");
        }));
        assert!(result.is_err());
        assert!(ctx.is_idle());
        assert!(ctx.lease().is_some());
    }
}
