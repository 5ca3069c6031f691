/// Initialization parameters for the GPU layer.
///
/// Keep this structure stable and minimal. Add configuration flags only when a
/// concrete platform or backend requirement exists.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior).
    ///
    /// FIFO is broadly supported and never tears.
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference for the surface.
    ///
    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Features the renderer cannot run without.
    ///
    /// Adapters lacking any of these are rejected at startup.
    pub required_features: wgpu::Features,

    /// Desired maximum frame latency for the surface (roughly the swap image count
    /// minus one). This value is a hint; support depends on platform/backend.
    pub desired_maximum_frame_latency: u32,

    /// Number of frame slots recorded ahead of the GPU.
    pub frames_in_flight: usize,

    /// Requested MSAA sample count. Clamped to what the formats support.
    pub sample_count: u32,

    /// Optional upper bound on the bindless texture array length.
    ///
    /// `None` sizes the array to the device limit.
    pub max_bindless_textures: Option<u32>,
}

impl GpuInit {
    /// Features needed by the bindless table and the per-draw immediate block.
    pub fn renderer_features() -> wgpu::Features {
        wgpu::Features::IMMEDIATES
            | wgpu::Features::TEXTURE_BINDING_ARRAY
            | wgpu::Features::PARTIALLY_BOUND_BINDING_ARRAY
    }
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: Self::renderer_features(),
            desired_maximum_frame_latency: 2,
            frames_in_flight: 2,
            sample_count: 4,
            max_bindless_textures: None,
        }
    }
}
