//! Contracts the host implements for the presenter.
//!
//! - [`SurfaceSource`]: the window region the presenter draws into.
//! - [`FrameHandler`]: notification callbacks (scene fill, surface rendered,
//!   content changed, diagnostics changed).
//! - [`FrameClock`]: the compositor's per-frame cadence, used by the
//!   compositor driven render loop.

use crate::presenter::{DiagnosticsSnapshot, FrameTime};
use crate::render::{
    DeviceLease, PixelSize, PresentSurface, RenderParams, RenderTarget, Scene, SurfaceTexture,
};
use raw_window_handle::RawWindowHandle;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// The region a presenter renders into.
pub trait SurfaceSource: Send + Sync {
    /// Current size of the target region in physical pixels.
    fn pixel_size(&self) -> PixelSize;

    /// Native window the swapchain binds to. Only called on the thread that
    /// owns the UI/windowing state.
    fn window_handle(&self) -> Option<RawWindowHandle>;

    /// Label used in logs and diagnostics.
    fn label(&self) -> &str;

    /// A swapchain surface has been created for this source.
    fn surface_created(&self, _size: PixelSize) {}

    /// The swapchain surface changed size.
    fn surface_resized(&self, _size: PixelSize) {}

    /// The swapchain surface has been destroyed.
    fn surface_destroyed(&self) {}
}

/// Information about the frame being produced.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameContext {
    pub time: FrameTime,
    pub size: PixelSize,
    pub target: RenderTarget,
}

/// Arguments for [`FrameHandler::surface_rendered`].
pub struct SurfaceRenderedArgs<'a> {
    pub lease: &'a Arc<dyn DeviceLease>,
    pub surface: &'a Arc<dyn PresentSurface>,
    /// Texture the scene has been drawn into. It is presented after the callback returns.
    pub texture: &'a SurfaceTexture,
    pub target: RenderTarget,
    pub params: RenderParams,
    pub time: FrameTime,
}

/// Host notification callbacks.
///
/// `fill_scene` and `surface_rendered` run on the presenter's worker thread
/// while a frame is in flight; returning an error (or panicking) is treated
/// as device loss. `content_changed` is posted to the UI thread.
pub trait FrameHandler: Send + Sync {
    /// Record the drawing commands for the frame.
    fn fill_scene(&self, scene: &mut Scene, frame: &FrameContext) -> anyhow::Result<()>;

    /// The scene has been drawn into the acquired texture and is about to be
    /// presented. Hosts may draw on top of it or replace it.
    fn surface_rendered(&self, _args: &SurfaceRenderedArgs<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// A frame was presented; the host should invalidate whatever shows it.
    fn content_changed(&self, _frame_id: u64) {}

    /// The diagnostics snapshot changed.
    fn diagnostics_changed(&self, _snapshot: &DiagnosticsSnapshot) {}
}

/// Callback invoked by a [`FrameClock`] once per compositor frame.
pub type FrameCallback = Arc<dyn Fn() + Send + Sync>;

/// Handle returned by [`FrameClock::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameSubscription(pub u64);

/// Per-frame cadence source of the host compositor.
pub trait FrameClock: Send + Sync {
    fn subscribe(&self, callback: FrameCallback) -> FrameSubscription;
    fn unsubscribe(&self, subscription: FrameSubscription);
}

/// Frame clock pumped by the host, e.g. from its vsync handler.
#[derive(Default)]
pub struct ManualFrameClock {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(FrameSubscription, FrameCallback)>>,
}

impl ManualFrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoke every subscriber once. Returns the number of callbacks run.
    pub fn fire(&self) -> usize {
        // Callbacks may (un)subscribe, so don't hold the lock while calling them.
        let callbacks: Vec<FrameCallback> = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();

        for cb in &callbacks {
            cb();
        }
        callbacks.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl FrameClock for ManualFrameClock {
    fn subscribe(&self, callback: FrameCallback) -> FrameSubscription {
        let sub = FrameSubscription(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((sub, callback));
        sub
    }

    fn unsubscribe(&self, subscription: FrameSubscription) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(s, _)| *s != subscription);
    }
}
