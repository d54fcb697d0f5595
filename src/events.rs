//! Presenter event types.
//!
//! Events are published on a broadcast bus. Subscribe with
//! [`SwapchainPresenter::subscribe_events`](crate::SwapchainPresenter::subscribe_events).
//! Publishing never blocks and never fails when nobody is listening.
//!
//! # Main Types
//!
//! - [`PresenterId`]: Opaque id of a presenter instance.
//! - [`PresenterEvent`]: Lease lifecycle, loop driver, suspension, diagnostics and frame events.
//! - [`FramePresented`]: Payload published after each successful present.

use crate::config::LoopDriverKind;
use crate::presenter::DiagnosticsSnapshot;
use crate::render::{DeviceLease, PixelSize, PresentSurface, RenderParams, RenderTarget};
use std::fmt::{Debug, Display};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// A unique identifier for a presenter.
///
/// Treat it as an opaque handle; it is mainly used to tell log lines and
/// events of several presenters apart.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PresenterId(Uuid);

impl PresenterId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PresenterId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for PresenterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The first block is plenty to tell presenters apart in logs.
        let s = self.0.simple().to_string();
        write!(f, "{}", &s[..8])
    }
}

/// Why the lease was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseReason {
    Unloaded,
    BackendChanged,
    OptionsChanged,
    DeviceLost,
    Disposed,
}

/// Payload published after each successful present.
#[derive(Clone)]
pub struct FramePresented {
    pub lease: Arc<dyn DeviceLease>,
    pub surface: Arc<dyn PresentSurface>,
    pub target: RenderTarget,
    pub size: PixelSize,
    pub params: RenderParams,
    /// Time since the presenter's clock origin.
    pub timestamp: Duration,
    /// Time since the previous frame. Zero for the first frame after a (re)start.
    pub delta: Duration,
    pub frame_id: u64,
}

impl Debug for FramePresented {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramePresented")
            .field("adapter", &self.lease.adapter_name())
            .field("target", &self.target)
            .field("size", &self.size)
            .field("params", &self.params)
            .field("timestamp", &self.timestamp)
            .field("delta", &self.delta)
            .field("frame_id", &self.frame_id)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum PresenterEvent {
    // ****************************************
    // ** Resource lease
    /// A device lease has been acquired
    LeaseAcquired { presenter_id: PresenterId, adapter: String },
    /// The lease and its surface have been released
    LeaseReleased { presenter_id: PresenterId, reason: ReleaseReason },
    /// A frame failed and GPU resources were torn down
    DeviceLost { presenter_id: PresenterId, cause: String },

    // ****************************************
    // ** Scheduling
    /// Loop driver was detached and/or attached
    LoopDriverChanged {
        presenter_id: PresenterId,
        old: Option<LoopDriverKind>,
        new: Option<LoopDriverKind>,
    },
    /// Rendering was suspended or resumed
    SuspensionChanged { presenter_id: PresenterId, suspended: bool },

    // ****************************************
    // ** Frames
    /// Diagnostics snapshot changed
    DiagnosticsChanged { presenter_id: PresenterId, snapshot: DiagnosticsSnapshot },
    /// A frame has been presented
    FramePresented(FramePresented),
}
