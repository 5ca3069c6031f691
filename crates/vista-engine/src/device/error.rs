use std::fmt;

/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface must be reconfigured; the current frame is not rendered.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}

impl SurfaceErrorAction {
    /// Classifies a wgpu surface error.
    ///
    /// Outdated/lost surfaces are expected after external resizes and are
    /// recoverable. Only out-of-memory aborts the frame loop.
    pub fn classify(err: &wgpu::SurfaceError) -> Self {
        match err {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => Self::Reconfigured,
            wgpu::SurfaceError::OutOfMemory => Self::Fatal,
            wgpu::SurfaceError::Timeout => Self::SkipFrame,
            wgpu::SurfaceError::Other => Self::SkipFrame,
        }
    }
}

/// Typed failures raised by the device layer.
///
/// All of these are setup-time failures: the viewer cannot continue without the
/// resource in question, so callers wrap them in `anyhow` context and abort.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuError {
    /// No memory location satisfies the requested buffer/texture parameters.
    Allocation { label: String, reason: String },

    /// The adapter lacks features the renderer depends on.
    MissingFeatures(wgpu::Features),

    /// None of the depth formats we know how to use is renderable.
    UnsupportedDepthFormat,

    /// More textures were loaded than the bindless array can address.
    BindlessCapacity { capacity: u32 },

    /// Waiting on a submission failed (device lost or similar).
    Poll(String),
}

impl GpuError {
    pub(crate) fn allocation(label: &str, reason: impl Into<String>) -> Self {
        Self::Allocation {
            label: label.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::Allocation { label, reason } => {
                write!(f, "allocation of '{label}' failed: {reason}")
            }
            GpuError::MissingFeatures(features) => {
                write!(f, "adapter is missing required features: {features:?}")
            }
            GpuError::UnsupportedDepthFormat => {
                write!(f, "no supported depth attachment format")
            }
            GpuError::BindlessCapacity { capacity } => {
                write!(f, "bindless texture table is full ({capacity} slots)")
            }
            GpuError::Poll(msg) => write!(f, "waiting for GPU work failed: {msg}"),
        }
    }
}

impl std::error::Error for GpuError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outdated_and_lost_are_recoverable() {
        assert_eq!(
            SurfaceErrorAction::classify(&wgpu::SurfaceError::Outdated),
            SurfaceErrorAction::Reconfigured
        );
        assert_eq!(
            SurfaceErrorAction::classify(&wgpu::SurfaceError::Lost),
            SurfaceErrorAction::Reconfigured
        );
    }

    #[test]
    fn timeout_skips_and_oom_is_fatal() {
        assert_eq!(
            SurfaceErrorAction::classify(&wgpu::SurfaceError::Timeout),
            SurfaceErrorAction::SkipFrame
        );
        assert_eq!(
            SurfaceErrorAction::classify(&wgpu::SurfaceError::OutOfMemory),
            SurfaceErrorAction::Fatal
        );
    }

    #[test]
    fn display_names_the_label() {
        let err = GpuError::allocation("vertex buffer", "zero size");
        assert_eq!(err.to_string(), "allocation of 'vertex buffer' failed: zero size");
    }
}
