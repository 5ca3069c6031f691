use winit::dpi::PhysicalPosition;
use winit::window::{Window, WindowId};

use crate::device::Gpu;
use crate::input::{InputFrame, InputState};
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

/// Per-window handles and immutable window metadata.
pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

impl<'a> WindowCtx<'a> {
    /// Framebuffer size as `(width, height)` in physical pixels.
    pub fn physical_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    pub fn set_title(&self, title: &str) {
        self.window.set_title(title);
    }
}

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a mut Gpu<'w>,
    pub input: &'a mut InputState,
    pub input_frame: &'a InputFrame,
    pub time: FrameTime,
    pub runtime: &'a mut RuntimeCtx,
}

impl FrameCtx<'_, '_> {
    /// Moves the OS cursor to `(x, y)` physical pixels and re-bases the
    /// tracked pointer so the jump is not seen as motion.
    ///
    /// Returns `false` if the platform refused (Wayland, for one); the
    /// pointer then stays where it was.
    pub fn warp_cursor(&mut self, x: f32, y: f32) -> bool {
        let target = PhysicalPosition::new(x as f64, y as f64);
        match self.window.window.set_cursor_position(target) {
            Ok(()) => {
                self.input.warp_pointer(x, y);
                true
            }
            Err(e) => {
                log::debug!("cursor warp unsupported: {e}");
                false
            }
        }
    }
}
