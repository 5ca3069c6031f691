/// Ring of frame slots, each guarded by a fence.
///
/// A slot's fence is whatever token the backend hands out on submission (a
/// `wgpu::SubmissionIndex` in the renderer). The ring enforces the reuse rule:
/// the current slot is only handed out again after its previous token has been
/// waited on, so at most `len()` frames are ever pending on the GPU.
///
/// The image-available / render-finished semaphores of the swap chain are
/// owned by `wgpu::Surface` and need no bookkeeping here.
#[derive(Debug)]
pub struct FrameRing<T> {
    pending: Vec<Option<T>>,
    current: usize,
}

impl<T> FrameRing<T> {
    /// Creates a ring with `frames_in_flight` slots (at least one).
    pub fn new(frames_in_flight: usize) -> Self {
        let n = frames_in_flight.max(1);
        Self {
            pending: (0..n).map(|_| None).collect(),
            current: 0,
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Index of the slot the next frame records into.
    pub fn current(&self) -> usize {
        self.current
    }

    /// Number of slots whose fence has not been waited on yet.
    pub fn in_flight(&self) -> usize {
        self.pending.iter().filter(|p| p.is_some()).count()
    }

    /// Blocks on the current slot's fence (if any) and clears it.
    ///
    /// After this returns `Ok`, the slot's resources may be rewritten.
    pub fn wait_current<E>(&mut self, wait: impl FnOnce(T) -> Result<(), E>) -> Result<(), E> {
        match self.pending[self.current].take() {
            Some(token) => wait(token),
            None => Ok(()),
        }
    }

    /// Records the fence for work submitted from the current slot.
    pub fn signal(&mut self, token: T) {
        debug_assert!(
            self.pending[self.current].is_none(),
            "slot {} signalled twice without a wait",
            self.current
        );
        self.pending[self.current] = Some(token);
    }

    /// Moves to the next slot. Called after submission + present, never before.
    pub fn advance(&mut self) {
        self.current = (self.current + 1) % self.pending.len();
    }

    /// Forgets every pending fence.
    ///
    /// Only valid after the device has been waited idle.
    pub fn clear_signals(&mut self) {
        for p in &mut self.pending {
            *p = None;
        }
    }
}
