//! Core engine-facing contracts.
//!
//! The stable interface between the runtime (platform loop) and the viewer:
//! the `App` trait and the per-frame context handed to it.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
