use std::time::Duration;

use crate::backend::FrameTimer;

/// Largest step fed into the clock; longer gaps (a hidden tab, a debugger
/// pause) advance the animation by this much instead of jumping.
pub const MAX_FRAME_DELTA: Duration = Duration::from_millis(100);

/// Timing handed to the per-frame draw callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    /// Clamped time since the previous frame.
    pub dt: Duration,
    /// Accumulated animation time in seconds.
    pub elapsed: f32,
    /// Monotonic frame counter for the running session.
    pub frame_index: u64,
}

/// Drives one repeating frame request through a [`FrameTimer`].
///
/// At most one request is outstanding at a time and callbacks arriving after
/// `stop` are ignored.
pub struct FrameScheduler<T: FrameTimer> {
    timer: T,
    armed: bool,
    last_timestamp: Option<Duration>,
    elapsed: Duration,
    frame_index: u64,
}

impl<T: FrameTimer> FrameScheduler<T> {
    pub fn new(timer: T) -> Self {
        Self {
            timer,
            armed: false,
            last_timestamp: None,
            elapsed: Duration::ZERO,
            frame_index: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.armed
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// Arms the first frame request. Calling it while already running is a no-op.
    pub fn start(&mut self) {
        if self.armed {
            return;
        }
        self.armed = true;
        self.last_timestamp = None;
        self.timer.request_frame();
    }

    /// Cancels the outstanding request, if any.
    pub fn stop(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;
        self.timer.cancel_frame();
    }

    /// Handles a frame callback delivered at `timestamp` (host clock).
    ///
    /// Returns `None` without invoking `draw` when the scheduler is stopped.
    /// Otherwise `draw` runs exactly once and the next request is armed.
    pub fn fire<R>(&mut self, timestamp: Duration, draw: impl FnOnce(FrameTick) -> R) -> Option<R> {
        if !self.armed {
            return None;
        }
        let dt = match self.last_timestamp {
            Some(previous) => timestamp.saturating_sub(previous).min(MAX_FRAME_DELTA),
            None => Duration::ZERO,
        };
        self.last_timestamp = Some(timestamp);
        self.elapsed += dt;
        let tick = FrameTick {
            dt,
            elapsed: self.elapsed.as_secs_f32(),
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.saturating_add(1);
        let result = draw(tick);
        self.timer.request_frame();
        Some(result)
    }
}
