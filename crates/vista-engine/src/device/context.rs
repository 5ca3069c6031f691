use anyhow::{Context, Result};

use super::{GpuError, GpuInit};

/// Where a buffer's memory lives from the CPU's point of view.
///
/// wgpu hides memory heaps, so this is resolved to buffer usages instead of a
/// memory-type index.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MemoryLocation {
    /// GPU-only memory. Filled through copies.
    DeviceLocal,
    /// CPU-writable staging memory, mapped at creation.
    Upload,
    /// CPU-readable memory for copying results back.
    Readback,
}

/// Resolves `usage` + `location` into the final buffer usages.
///
/// Mappable buffers may only be combined with the matching copy usage unless the
/// device exposes `MAPPABLE_PRIMARY_BUFFERS`. Returns the reason on failure.
pub fn resolve_memory(
    usage: wgpu::BufferUsages,
    location: MemoryLocation,
    features: wgpu::Features,
) -> std::result::Result<wgpu::BufferUsages, String> {
    let (map_usage, allowed) = match location {
        MemoryLocation::DeviceLocal => {
            if usage.intersects(wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::MAP_WRITE) {
                return Err("device-local buffers cannot be mapped".to_string());
            }
            return Ok(usage);
        }
        MemoryLocation::Upload => (wgpu::BufferUsages::MAP_WRITE, wgpu::BufferUsages::COPY_SRC),
        MemoryLocation::Readback => (wgpu::BufferUsages::MAP_READ, wgpu::BufferUsages::COPY_DST),
    };

    let extra = usage.difference(allowed | map_usage);
    if !extra.is_empty() && !features.contains(wgpu::Features::MAPPABLE_PRIMARY_BUFFERS) {
        return Err(format!("no mappable memory supports usages {extra:?}"));
    }

    Ok(usage | map_usage)
}

/// Bytes per row for a texture copy, padded to wgpu's copy alignment.
pub fn padded_bytes_per_row(width: u32, bytes_per_pixel: u32) -> u32 {
    let unpadded = width * bytes_per_pixel;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Owns the GPU connection: instance, adapter, logical device and queue.
///
/// Everything else in the renderer borrows this per call and must not outlive it.
pub struct GpuContext {
    /// Kept alive for the lifetime of the device.
    #[allow(dead_code)]
    instance: wgpu::Instance,

    /// Selected adapter.
    adapter: wgpu::Adapter,

    /// Logical device.
    device: wgpu::Device,

    /// Graphics + present queue.
    queue: wgpu::Queue,
}

impl GpuContext {
    /// Picks an adapter able to present to `surface` and creates the device.
    ///
    /// Adapters without `init.required_features` are rejected; this is fatal.
    pub async fn new(
        instance: wgpu::Instance,
        surface: &wgpu::Surface<'_>,
        init: &GpuInit,
    ) -> Result<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let info = adapter.get_info();
        log::info!("using adapter '{}' ({:?})", info.name, info.backend);

        let missing = init.required_features.difference(adapter.features());
        if !missing.is_empty() {
            return Err(GpuError::MissingFeatures(missing))
                .context("adapter cannot run the bindless renderer");
        }

        // The bindless array is sized from the limits, so ask for all of them.
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("vista device"),
                required_features: init.required_features,
                required_limits: adapter.limits(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn limits(&self) -> wgpu::Limits {
        self.device.limits()
    }

    /// Creates a buffer in `location`.
    ///
    /// Fails with [`GpuError::Allocation`] if no location satisfies the usage
    /// filter or the size is out of range. Sizes are rounded up to the copy
    /// alignment so the buffer can always be mapped and copied whole.
    pub fn create_buffer(
        &self,
        label: &str,
        size: u64,
        usage: wgpu::BufferUsages,
        location: MemoryLocation,
    ) -> std::result::Result<wgpu::Buffer, GpuError> {
        let usage = resolve_memory(usage, location, self.device.features())
            .map_err(|reason| GpuError::allocation(label, reason))?;

        if size == 0 {
            return Err(GpuError::allocation(label, "zero-sized buffer"));
        }
        let size = size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        let max = self.device.limits().max_buffer_size;
        if size > max {
            return Err(GpuError::allocation(
                label,
                format!("{size} bytes exceeds the device maximum of {max}"),
            ));
        }

        Ok(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage,
            mapped_at_creation: location == MemoryLocation::Upload,
        }))
    }

    /// Creates an upload buffer holding `contents`, already unmapped.
    pub fn create_staging_buffer(
        &self,
        label: &str,
        contents: &[u8],
    ) -> std::result::Result<wgpu::Buffer, GpuError> {
        let staging = self.create_buffer(
            label,
            contents.len() as u64,
            wgpu::BufferUsages::COPY_SRC,
            MemoryLocation::Upload,
        )?;
        {
            let mut view = staging.slice(..).get_mapped_range_mut();
            view[..contents.len()].copy_from_slice(contents);
        }
        staging.unmap();
        Ok(staging)
    }

    /// Creates a device-local buffer filled with `contents`.
    ///
    /// The data goes through a staging buffer and a synchronous one-shot copy.
    pub fn create_buffer_init(
        &self,
        label: &str,
        contents: &[u8],
        usage: wgpu::BufferUsages,
    ) -> Result<wgpu::Buffer> {
        let staging = self.create_staging_buffer(&format!("{label} staging"), contents)?;
        let buffer = self.create_buffer(
            label,
            contents.len() as u64,
            usage | wgpu::BufferUsages::COPY_DST,
            MemoryLocation::DeviceLocal,
        )?;
        self.copy_buffer(&staging, &buffer, staging.size())?;
        Ok(buffer)
    }

    /// Creates a 2D texture after validating it against the device limits.
    #[allow(clippy::too_many_arguments)]
    pub fn create_texture(
        &self,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        mip_level_count: u32,
        sample_count: u32,
        usage: wgpu::TextureUsages,
    ) -> std::result::Result<wgpu::Texture, GpuError> {
        let max = self.device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 {
            return Err(GpuError::allocation(label, "zero-area texture"));
        }
        if width > max || height > max {
            return Err(GpuError::allocation(
                label,
                format!("{width}x{height} exceeds the device maximum of {max}"),
            ));
        }

        Ok(self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        }))
    }

    /// Starts a one-shot command recording.
    pub fn begin_single_time_commands(&self) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("vista one-shot encoder"),
            })
    }

    /// Submits a one-shot recording and blocks until the GPU has executed it.
    ///
    /// Uploads are serialized against the queue on purpose; there is no
    /// transfer queue.
    pub fn end_single_time_commands(
        &self,
        encoder: wgpu::CommandEncoder,
    ) -> std::result::Result<(), GpuError> {
        let index = self.queue.submit(std::iter::once(encoder.finish()));
        self.wait_for(index)
    }

    /// Blocks until the submission identified by `index` has completed.
    pub fn wait_for(&self, index: wgpu::SubmissionIndex) -> std::result::Result<(), GpuError> {
        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: Some(index),
                timeout: None,
            })
            .map(|_| ())
            .map_err(|e| GpuError::Poll(e.to_string()))
    }

    /// Blocks until every submitted command buffer has completed.
    pub fn wait_idle(&self) -> std::result::Result<(), GpuError> {
        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            })
            .map(|_| ())
            .map_err(|e| GpuError::Poll(e.to_string()))
    }

    /// Copies `size` bytes from `src` to `dst` and waits for completion.
    pub fn copy_buffer(
        &self,
        src: &wgpu::Buffer,
        dst: &wgpu::Buffer,
        size: u64,
    ) -> std::result::Result<(), GpuError> {
        let mut encoder = self.begin_single_time_commands();
        encoder.copy_buffer_to_buffer(src, 0, dst, 0, size);
        self.end_single_time_commands(encoder)
    }

    /// Copies a tightly row-padded staging buffer into one mip level of `texture`.
    pub fn copy_buffer_to_texture(
        &self,
        src: &wgpu::Buffer,
        texture: &wgpu::Texture,
        width: u32,
        height: u32,
        mip_level: u32,
    ) -> std::result::Result<(), GpuError> {
        let mut encoder = self.begin_single_time_commands();
        record_buffer_to_texture(&mut encoder, src, texture, width, height, mip_level);
        self.end_single_time_commands(encoder)
    }
}

/// Records a staging → texture copy. The staging rows must be padded with
/// [`padded_bytes_per_row`] for 4-byte texels.
pub(crate) fn record_buffer_to_texture(
    encoder: &mut wgpu::CommandEncoder,
    src: &wgpu::Buffer,
    texture: &wgpu::Texture,
    width: u32,
    height: u32,
    mip_level: u32,
) {
    encoder.copy_buffer_to_texture(
        wgpu::TexelCopyBufferInfo {
            buffer: src,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_bytes_per_row(width, 4)),
                rows_per_image: Some(height),
            },
        },
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}
