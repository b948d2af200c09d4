//! Frame coalescing: at most one redraw in flight.
//!
//! The host registers a display-refresh callback only when
//! [`FrameScheduler::request_frame`] returns `true`; every other request
//! made before the callback fires is folded into that one frame.

/// Single-slot redraw scheduler.
#[derive(Debug, Clone, Default)]
pub struct FrameScheduler {
    pending: bool,
    requests: u64,
    frames: u64,
}

impl FrameScheduler {
    /// Create an idle scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a redraw.
    ///
    /// Returns `true` if the caller must schedule the frame callback,
    /// `false` if one is already pending.
    pub fn request_frame(&mut self) -> bool {
        self.requests += 1;
        if self.pending {
            return false;
        }
        self.pending = true;
        true
    }

    /// Called when the frame callback fires.
    ///
    /// Returns whether a frame was pending; the slot is free again
    /// afterwards, so work done while drawing may request the next frame.
    pub fn begin_frame(&mut self) -> bool {
        if !self.pending {
            return false;
        }
        self.pending = false;
        self.frames += 1;
        true
    }

    /// Whether a frame is scheduled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Total redraw requests.
    #[must_use]
    pub fn requests(&self) -> u64 {
        self.requests
    }

    /// Frames actually started.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_coalesces_into_one_frame() {
        let mut scheduler = FrameScheduler::new();
        assert!(scheduler.request_frame());
        for _ in 0..50 {
            assert!(!scheduler.request_frame());
        }
        assert!(scheduler.begin_frame());
        assert!(!scheduler.begin_frame());
        assert_eq!(scheduler.requests(), 51);
        assert_eq!(scheduler.frames(), 1);
    }

    #[test]
    fn test_request_during_frame_schedules_next() {
        let mut scheduler = FrameScheduler::new();
        scheduler.request_frame();
        assert!(scheduler.begin_frame());
        assert!(scheduler.request_frame());
        assert!(scheduler.is_pending());
    }
}
