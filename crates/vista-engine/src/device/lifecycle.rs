/// Framebuffer extent in physical pixels.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True for minimized windows; nothing can be rendered at zero area.
    pub fn is_zero_area(self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect(self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }
}

/// Presentation surface lifecycle.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceState {
    Uninitialized,
    /// Swap chain and image-dependent targets are valid.
    Ready,
    /// Targets are stale (resize requested, out-of-date, or zero area).
    Resizing,
    Destroyed,
}

/// Pure state machine behind `PresentationSurface`.
///
/// Resize requests are only recorded here; the frame loop consumes them at a
/// frame boundary via [`begin_refresh`](Self::begin_refresh) /
/// [`finish_refresh`](Self::finish_refresh), so targets are never torn down
/// while a frame is recording.
#[derive(Debug, Clone)]
pub struct SurfaceLifecycle {
    state: SurfaceState,
    extent: Extent,
    pending: Option<Extent>,
    rebuilds: u64,
}

impl SurfaceLifecycle {
    pub fn new() -> Self {
        Self {
            state: SurfaceState::Uninitialized,
            extent: Extent::default(),
            pending: None,
            rebuilds: 0,
        }
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    /// Extent of the currently built targets (or the last known size while resizing).
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Number of times the image-dependent targets have been (re)built.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    pub fn is_ready(&self) -> bool {
        self.state == SurfaceState::Ready
    }

    /// Records a new framebuffer size. Takes effect at the next refresh.
    pub fn request_resize(&mut self, extent: Extent) {
        if self.state == SurfaceState::Destroyed {
            return;
        }
        self.pending = Some(extent);
    }

    /// Marks the targets stale after an out-of-date/suboptimal report.
    pub fn mark_out_of_date(&mut self) {
        if self.state == SurfaceState::Ready {
            self.state = SurfaceState::Resizing;
        }
    }

    /// True when the frame loop must refresh before acquiring.
    pub fn needs_refresh(&self) -> bool {
        match self.state {
            SurfaceState::Destroyed => false,
            SurfaceState::Uninitialized => self.pending.is_some(),
            _ => self.pending.is_some() || self.state == SurfaceState::Resizing,
        }
    }

    /// Starts a refresh. Returns the extent to build for, or `None` if there
    /// is nothing to build (zero area or destroyed).
    ///
    /// On `Some`, the caller must drop every image-dependent target before
    /// building new ones and then call [`finish_refresh`](Self::finish_refresh).
    pub fn begin_refresh(&mut self) -> Option<Extent> {
        if self.state == SurfaceState::Destroyed {
            return None;
        }

        let extent = self.pending.take().unwrap_or(self.extent);
        self.extent = extent;
        self.state = SurfaceState::Resizing;

        if extent.is_zero_area() { None } else { Some(extent) }
    }

    /// Completes a refresh started with `begin_refresh`.
    pub fn finish_refresh(&mut self, extent: Extent) {
        debug_assert_eq!(extent, self.extent);
        self.state = SurfaceState::Ready;
        self.rebuilds += 1;
    }

    pub fn destroy(&mut self) {
        self.state = SurfaceState::Destroyed;
        self.pending = None;
    }
}

impl Default for SurfaceLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Replaces the value in `slot`, dropping the old one before building the new one.
///
/// Image-dependent GPU targets go through this so the old set is released
/// first and never referenced after a recreation.
pub fn rebuild_in_place<T, E>(
    slot: &mut Option<T>,
    build: impl FnOnce() -> Result<T, E>,
) -> Result<(), E> {
    drop(slot.take());
    *slot = Some(build()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn ready(extent: Extent) -> SurfaceLifecycle {
        let mut lc = SurfaceLifecycle::new();
        lc.request_resize(extent);
        let e = lc.begin_refresh().unwrap();
        lc.finish_refresh(e);
        lc
    }

    // ── transitions ───────────────────────────────────────────────────────

    #[test]
    fn starts_uninitialized_and_becomes_ready() {
        let lc = ready(Extent::new(800, 600));
        assert_eq!(lc.state(), SurfaceState::Ready);
        assert_eq!(lc.extent(), Extent::new(800, 600));
        assert_eq!(lc.rebuilds(), 1);
    }

    #[test]
    fn resize_is_deferred_until_refresh() {
        let mut lc = ready(Extent::new(800, 600));
        lc.request_resize(Extent::new(1024, 768));
        // Still Ready with the old extent until the frame loop refreshes.
        assert!(lc.is_ready());
        assert_eq!(lc.extent(), Extent::new(800, 600));
        assert!(lc.needs_refresh());
    }

    #[test]
    fn out_of_date_rebuilds_at_current_extent() {
        let mut lc = ready(Extent::new(640, 480));
        lc.mark_out_of_date();
        assert_eq!(lc.state(), SurfaceState::Resizing);
        assert_eq!(lc.begin_refresh(), Some(Extent::new(640, 480)));
    }

    #[test]
    fn zero_area_stays_resizing() {
        let mut lc = ready(Extent::new(640, 480));
        lc.request_resize(Extent::new(0, 480));
        assert_eq!(lc.begin_refresh(), None);
        assert_eq!(lc.state(), SurfaceState::Resizing);
        assert_eq!(lc.extent(), Extent::new(0, 480));
        assert!(lc.needs_refresh());

        lc.request_resize(Extent::new(640, 480));
        let e = lc.begin_refresh().unwrap();
        lc.finish_refresh(e);
        assert!(lc.is_ready());
    }

    #[test]
    fn destroyed_ignores_everything() {
        let mut lc = ready(Extent::new(10, 10));
        lc.destroy();
        lc.request_resize(Extent::new(20, 20));
        assert!(!lc.needs_refresh());
        assert_eq!(lc.begin_refresh(), None);
        assert_eq!(lc.state(), SurfaceState::Destroyed);
    }

    // ── resize safety ─────────────────────────────────────────────────────

    struct Target {
        live: Rc<Cell<i32>>,
    }

    impl Target {
        fn new(live: &Rc<Cell<i32>>) -> Self {
            live.set(live.get() + 1);
            Self { live: live.clone() }
        }
    }

    impl Drop for Target {
        fn drop(&mut self) {
            self.live.set(self.live.get() - 1);
        }
    }

    #[test]
    fn repeated_resizes_leave_one_target_set_at_last_extent() {
        let live = Rc::new(Cell::new(0));
        let mut targets: Option<Target> = None;
        let mut lc = SurfaceLifecycle::new();

        let sizes = [(800, 600), (801, 600), (1024, 700), (300, 200), (1920, 1080)];
        for (w, h) in sizes {
            lc.request_resize(Extent::new(w, h));

            // One rendered frame: refresh at the boundary, then "render".
            if lc.needs_refresh() {
                if let Some(extent) = lc.begin_refresh() {
                    rebuild_in_place(&mut targets, || {
                        // The previous set is already gone when building.
                        assert_eq!(live.get(), 0);
                        Ok::<_, ()>(Target::new(&live))
                    })
                    .unwrap();
                    lc.finish_refresh(extent);
                }
            }
            assert!(lc.is_ready());
            assert_eq!(live.get(), 1);
        }

        assert_eq!(lc.extent(), Extent::new(1920, 1080));
        assert_eq!(lc.rebuilds(), sizes.len() as u64);
        drop(targets);
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn failed_rebuild_leaves_slot_empty() {
        let mut slot = Some(1u32);
        let res = rebuild_in_place(&mut slot, || Err::<u32, _>("boom"));
        assert_eq!(res, Err("boom"));
        assert!(slot.is_none());
    }

    // ── extent ────────────────────────────────────────────────────────────

    #[test]
    fn aspect_guards_zero_height() {
        assert_eq!(Extent::new(200, 100).aspect(), 2.0);
        assert_eq!(Extent::new(200, 0).aspect(), 200.0);
    }
}
