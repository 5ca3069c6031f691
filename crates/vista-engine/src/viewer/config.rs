use crate::camera::CameraConfig;
use crate::device::GpuInit;
use crate::window::RuntimeConfig;

/// Everything needed to start the viewer.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub runtime: RuntimeConfig,
    pub gpu: GpuInit,
    pub camera: CameraConfig,
    pub clear_color: wgpu::Color,
    pub show_grid: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            runtime: RuntimeConfig::default(),
            gpu: GpuInit::default(),
            camera: CameraConfig::default(),
            clear_color: wgpu::Color {
                r: 0.12,
                g: 0.12,
                b: 0.14,
                a: 1.0,
            },
            show_grid: true,
        }
    }
}
