// ============================================================================
// GPU COMPUTE — color-matrix pass and the wgpu-backed GpuDevice
// ============================================================================
//
// One effect run is one submission: upload the source, dispatch the pass,
// copy the output into a staging buffer, map it, and strip the row padding.
// ============================================================================

use bytemuck::{Pod, Zeroable};
use image::RgbaImage;
use wgpu::util::{DeviceExt, TextureDataOrder};

use super::context::GpuContext;
use super::{GpuDevice, GpuError};
use crate::effect::GpuProgram;
use crate::ops::adjustments::ColorMatrix;

const WORKGROUP: u32 = 16;

// ============================================================================
// STAGING
// ============================================================================

fn rgba_texture(label: &str, width: u32, height: u32, usage: wgpu::TextureUsages) -> wgpu::TextureDescriptor<'_> {
    wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage,
        view_formats: &[],
    }
}

/// Row pitch of a texture-to-buffer copy: `width * 4` rounded up to 256.
pub(crate) fn padded_row_bytes(width: u32) -> u32 {
    (width * 4).div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT
}

/// Drop the per-row padding of a mapped staging buffer.  `None` when the
/// buffer is shorter than `height` padded rows.
fn unpad_rows(padded: &[u8], width: u32, height: u32) -> Option<Vec<u8>> {
    let pitch = padded_row_bytes(width) as usize;
    let row = width as usize * 4;
    if padded.len() < pitch * height as usize {
        return None;
    }
    let mut packed = Vec::with_capacity(row * height as usize);
    for chunk in padded.chunks(pitch).take(height as usize) {
        packed.extend_from_slice(&chunk[..row]);
    }
    Some(packed)
}

/// Block until `buffer` is mapped for reading.
fn map_blocking(device: &wgpu::Device, buffer: &wgpu::Buffer) -> Result<(), GpuError> {
    let (tx, rx) = std::sync::mpsc::channel();
    buffer.slice(..).map_async(wgpu::MapMode::Read, move |outcome| {
        let _ = tx.send(outcome);
    });
    device.poll(wgpu::Maintain::Wait);
    match rx.recv() {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(GpuError::Readback(format!("staging map failed: {err}"))),
        Err(_) => Err(GpuError::Readback("staging map callback never ran".to_string())),
    }
}

// ============================================================================
// COLOR MATRIX PASS
// ============================================================================

/// Uniform block matching `MatrixParams` in the shader.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct MatrixParams {
    width: u32,
    height: u32,
    _pad0: u32,
    _pad1: u32,
    rows: [[f32; 4]; 4],
    offset: [f32; 4],
}

impl MatrixParams {
    fn new(width: u32, height: u32, m: &ColorMatrix) -> Self {
        let row = |i: usize| [m[i * 5], m[i * 5 + 1], m[i * 5 + 2], m[i * 5 + 3]];
        Self {
            width,
            height,
            _pad0: 0,
            _pad1: 0,
            rows: [row(0), row(1), row(2), row(3)],
            offset: [m[4], m[9], m[14], m[19]],
        }
    }
}

struct ColorMatrixPass {
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
}

impl ColorMatrixPass {
    fn new(device: &wgpu::Device) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("color_matrix"),
            source: wgpu::ShaderSource::Wgsl(super::shaders::COLOR_MATRIX_SHADER.into()),
        });
        // Layout derived from the shader's bindings.
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("color_matrix"),
            layout: None,
            module: &module,
            entry_point: "cs_color_matrix",
            compilation_options: Default::default(),
        });
        let layout = pipeline.get_bind_group_layout(0);
        Self { pipeline, layout }
    }

    fn run(&self, ctx: &GpuContext, src: &RgbaImage, matrix: &ColorMatrix) -> Result<Vec<u8>, GpuError> {
        let (width, height) = src.dimensions();
        let device = &ctx.device;

        let input = device.create_texture_with_data(
            &ctx.queue,
            &rgba_texture("color_matrix_in", width, height, wgpu::TextureUsages::TEXTURE_BINDING),
            TextureDataOrder::LayerMajor,
            src.as_raw(),
        );
        let output = device.create_texture(&rgba_texture(
            "color_matrix_out",
            width,
            height,
            wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::COPY_SRC,
        ));
        let params = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("color_matrix_params"),
            contents: bytemuck::bytes_of(&MatrixParams::new(width, height, matrix)),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let pitch = padded_row_bytes(width);
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("color_matrix_staging"),
            size: pitch as u64 * height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let input_view = input.create_view(&Default::default());
        let output_view = output.create_view(&Default::default());
        let bindings = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("color_matrix"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&input_view) },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(&output_view) },
                wgpu::BindGroupEntry { binding: 2, resource: params.as_entire_binding() },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("color_matrix") });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("color_matrix"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bindings, &[]);
            pass.dispatch_workgroups(width.div_ceil(WORKGROUP), height.div_ceil(WORKGROUP), 1);
        }
        encoder.copy_texture_to_buffer(
            output.as_image_copy(),
            wgpu::ImageCopyBuffer {
                buffer: &staging,
                layout: wgpu::ImageDataLayout { offset: 0, bytes_per_row: Some(pitch), rows_per_image: Some(height) },
            },
            wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        );
        ctx.queue.submit(Some(encoder.finish()));

        map_blocking(device, &staging)?;
        let packed = {
            let mapped = staging.slice(..).get_mapped_range();
            unpad_rows(&mapped, width, height)
        };
        staging.unmap();
        packed.ok_or_else(|| GpuError::Readback("staging buffer shorter than the image".to_string()))
    }
}

// ============================================================================
// WGPU DEVICE
// ============================================================================

/// `GpuDevice` backed by a compute-only wgpu context.
pub struct WgpuDevice {
    ctx: GpuContext,
    color_matrix: ColorMatrixPass,
    /// Cleared after an out-of-memory error; the device state is unknown.
    healthy: bool,
}

impl WgpuDevice {
    pub fn new(ctx: GpuContext) -> Self {
        let color_matrix = ColorMatrixPass::new(&ctx.device);
        Self { ctx, color_matrix, healthy: true }
    }
}

impl GpuDevice for WgpuDevice {
    fn name(&self) -> &str {
        &self.ctx.adapter_name
    }

    fn is_usable(&self) -> bool {
        self.healthy && !self.ctx.is_lost()
    }

    fn max_dimension(&self) -> u32 {
        self.ctx.max_texture_dim()
    }

    fn run(&mut self, program: &GpuProgram, src: &RgbaImage) -> Result<RgbaImage, GpuError> {
        let (width, height) = src.dimensions();
        if width == 0 || height == 0 {
            return Ok(src.clone());
        }
        if !self.ctx.fits(width, height) {
            return Err(GpuError::TooLarge { width, height });
        }

        let device = &self.ctx.device;
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let packed = match program {
            GpuProgram::ColorMatrix(m) => self.color_matrix.run(&self.ctx, src, m),
        };
        let validation = pollster::block_on(device.pop_error_scope());
        let out_of_memory = pollster::block_on(device.pop_error_scope());

        if let Some(err) = out_of_memory {
            log_err!("GPU out of memory on {}: {err}", self.ctx.adapter_name);
            self.healthy = false;
            return Err(GpuError::Unusable);
        }
        if let Some(err) = validation {
            return Err(GpuError::Readback(err.to_string()));
        }
        RgbaImage::from_raw(width, height, packed?)
            .ok_or_else(|| GpuError::Readback("readback size mismatch".to_string()))
    }
}
