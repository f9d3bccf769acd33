// ============================================================================
// GPU CONTEXT — headless wgpu device that backs a leased GpuDevice
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::GpuError;

/// Adapter choice, parsed from the `preferred_gpu` setting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AdapterPreference {
    #[default]
    Auto,
    LowPower,
    HighPerformance,
    /// Only the software fallback adapter.
    Software,
}

impl AdapterPreference {
    pub fn from_setting(setting: &str) -> Self {
        match setting.trim().to_ascii_lowercase().as_str() {
            "low power" | "low_power" | "integrated" => Self::LowPower,
            "high performance" | "high_performance" | "discrete" => Self::HighPerformance,
            "software" | "fallback" => Self::Software,
            _ => Self::Auto,
        }
    }

    fn power(self) -> wgpu::PowerPreference {
        match self {
            Self::LowPower => wgpu::PowerPreference::LowPower,
            _ => wgpu::PowerPreference::HighPerformance,
        }
    }

    /// `force_fallback_adapter` values to try, in order.
    fn attempts(self) -> &'static [bool] {
        match self {
            Self::Software => &[true],
            _ => &[false, true],
        }
    }
}

/// A compute-only wgpu device.  Never presents; the only consumer is the
/// effect device that owns it behind a lease.
pub struct GpuContext {
    pub(crate) device: wgpu::Device,
    pub(crate) queue: wgpu::Queue,
    pub(crate) adapter_name: String,
    max_texture_dim: u32,
    /// Set from the device-lost callback.
    lost: Arc<AtomicBool>,
}

impl GpuContext {
    pub fn open(preference: AdapterPreference) -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        for &software in preference.attempts() {
            match pollster::block_on(Self::open_adapter(&instance, preference, software)) {
                Some(ctx) => {
                    let kind = if software { "software" } else { "hardware" };
                    log_info!("GPU adapter ({kind}): {}", ctx.adapter_name);
                    return Ok(ctx);
                }
                None if !software => {
                    log_warn!("No hardware GPU adapter; trying software fallback");
                }
                None => {}
            }
        }
        log_warn!("No GPU adapter available ({preference:?})");
        Err(GpuError::NoAdapter)
    }

    async fn open_adapter(instance: &wgpu::Instance, preference: AdapterPreference, software: bool) -> Option<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: preference.power(),
                compatible_surface: None,
                force_fallback_adapter: software,
            })
            .await?;
        let limits = adapter.limits();

        // The color-matrix pass fits the downlevel limits; only the texture
        // size is raised to what the adapter offers.
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("pixmark-effects"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits {
                        max_texture_dimension_2d: limits.max_texture_dimension_2d,
                        ..wgpu::Limits::downlevel_defaults()
                    },
                },
                None,
            )
            .await
            .ok()?;

        let lost = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&lost);
        device.set_device_lost_callback(move |reason, message| {
            // Dropped / ReplacedCallback are our own teardown, not a loss.
            if matches!(
                reason,
                wgpu::DeviceLostReason::Unknown
                    | wgpu::DeviceLostReason::Destroyed
                    | wgpu::DeviceLostReason::DeviceInvalid
            ) {
                flag.store(true, Ordering::SeqCst);
                log_err!("GPU device lost ({reason:?}): {message}");
            }
        });

        Some(Self {
            device,
            queue,
            adapter_name: adapter.get_info().name,
            max_texture_dim: limits.max_texture_dimension_2d,
            lost,
        })
    }

    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }

    pub fn max_texture_dim(&self) -> u32 {
        self.max_texture_dim
    }

    pub fn fits(&self, width: u32, height: u32) -> bool {
        width <= self.max_texture_dim && height <= self.max_texture_dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preference_parses_settings_strings() {
        assert_eq!(AdapterPreference::from_setting("Auto"), AdapterPreference::Auto);
        assert_eq!(AdapterPreference::from_setting(" Integrated "), AdapterPreference::LowPower);
        assert_eq!(AdapterPreference::from_setting("discrete"), AdapterPreference::HighPerformance);
        assert_eq!(AdapterPreference::from_setting("software"), AdapterPreference::Software);
        assert_eq!(AdapterPreference::from_setting("rtx 9090"), AdapterPreference::Auto);
    }

    #[test]
    fn software_preference_skips_hardware() {
        assert_eq!(AdapterPreference::Software.attempts(), &[true]);
        assert_eq!(AdapterPreference::Auto.attempts(), &[false, true]);
        assert_eq!(AdapterPreference::LowPower.power(), wgpu::PowerPreference::LowPower);
    }
}
