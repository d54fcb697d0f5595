use std::sync::{Condvar, Mutex, PoisonError};
use std::thread::{self, ThreadId};

/// Manual-reset "idle" signal around the in-flight frame.
///
/// Set busy when a frame starts, idle when it finishes. Suspend and dispose
/// wait for idle before they touch GPU resources.
#[derive(Debug)]
pub(crate) struct DrainSignal {
    state: Mutex<DrainState>,
    cv: Condvar,
}

#[derive(Debug)]
struct DrainState {
    idle: bool,
    /// Worker thread currently running the frame, if any.
    frame_thread: Option<ThreadId>,
}

impl Default for DrainSignal {
    fn default() -> Self {
        Self {
            state: Mutex::new(DrainState { idle: true, frame_thread: None }),
            cv: Condvar::new(),
        }
    }
}

impl DrainSignal {
    pub fn set_busy(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.idle = false;
    }

    pub fn set_idle(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.idle = true;
        state.frame_thread = None;
        self.cv.notify_all();
    }

    /// Record the calling thread as the one executing the frame.
    pub fn enter_frame_thread(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.frame_thread = Some(thread::current().id());
    }

    /// Forget the frame thread while the frame waits to be picked up by a
    /// worker. Drains from any thread wait during that hand-off.
    pub fn leave_frame_thread(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.frame_thread = None;
    }

    pub fn is_idle(&self) -> bool {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).idle
    }

    /// Block until no frame is in flight. Returns false without waiting when
    /// called from the thread executing the frame, which would never finish.
    pub fn wait_idle(&self) -> bool {
        let me = thread::current().id();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.frame_thread == Some(me) {
            return false;
        }
        while !state.idle {
            state = self.cv.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
        true
    }
}
