use std::time::{Duration, Instant};

/// Timing information for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameTime {
    /// Time since rendering (re)started.
    pub timestamp: Duration,
    /// Time since the previous frame. Zero for the first frame after a (re)start.
    pub delta: Duration,
    /// Id the frame gets once it has been presented.
    pub frame_id: u64,
}

/// Monotonic frame clock. Lives behind its own lock so reading it never
/// waits on GPU work.
#[derive(Debug)]
pub(crate) struct FrameTiming {
    origin: Instant,
    last_frame: Option<Instant>,
    frame_id: u64,
}

impl FrameTiming {
    pub fn new(now: Instant) -> Self {
        Self { origin: now, last_frame: None, frame_id: 0 }
    }

    /// Restart the clock. The frame id keeps counting.
    pub fn reset(&mut self, now: Instant) {
        self.origin = now;
        self.last_frame = None;
    }

    /// Sample the clock for a frame that is about to be produced.
    pub fn sample(&mut self, now: Instant) -> FrameTime {
        let delta = self
            .last_frame
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or_default();
        self.last_frame = Some(now);

        FrameTime {
            timestamp: now.saturating_duration_since(self.origin),
            delta,
            frame_id: self.frame_id + 1,
        }
    }

    /// Record a successful present. Returns the id of the presented frame.
    pub fn commit(&mut self) -> u64 {
        self.frame_id += 1;
        self.frame_id
    }

    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }
}
