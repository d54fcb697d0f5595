//! The swapchain presenter.
//!
//! A [`SwapchainPresenter`] renders frames into a native swapchain surface
//! owned by a UI host. Frames run one at a time: preparation happens on the
//! UI thread, the drawing and presenting on a tokio blocking worker. Frames
//! are produced on request ([`SwapchainPresenter::request_render`]) or by a
//! render loop driven by a timer or the compositor's frame clock.
//!
//! GPU resources (device lease, surface, render target) are acquired on the
//! first frame and released on unload, dispose, backend or option changes,
//! and after device loss. Release always waits for the in-flight frame.

mod builder;
mod diagnostics;
mod drain;
mod driver;
mod executor;
mod lease;
mod scheduler;
mod timing;

#[cfg(test)]
mod tests;

pub use builder::PresenterBuilder;
pub use diagnostics::{DeviceState, DiagnosticsSnapshot};
pub use timing::FrameTime;

use crate::config::{BackendKind, DeviceOptions, LoopDriverKind, PresenterConfig, RenderMode};
use crate::errors::PresenterError;
use crate::events::{PresenterEvent, PresenterId};
use scheduler::Scheduler;
use std::sync::atomic::Ordering::SeqCst;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Handle to a presenter. Disposes on drop.
///
/// Every method may be called from any thread. Hooks that release the lease
/// (unload, dispose, option and backend changes) hold the in-flight flag
/// while doing so, so a frame already posted to the UI thread cannot
/// acquire a lease that is being torn down.
pub struct SwapchainPresenter {
    inner: Arc<Scheduler>,
}

impl std::fmt::Debug for SwapchainPresenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwapchainPresenter")
            .field("id", &self.inner.id)
            .field("label", &self.inner.label)
            .field("frame_id", &self.inner.frame_id())
            .field("loop_driver", &self.inner.loop_driver())
            .finish()
    }
}

impl SwapchainPresenter {
    pub fn builder() -> PresenterBuilder {
        PresenterBuilder::new()
    }

    pub(crate) fn from_scheduler(inner: Arc<Scheduler>) -> Self {
        Self { inner }
    }

    pub fn id(&self) -> PresenterId {
        self.inner.id
    }

    /// Request a frame. Callable from any thread; never blocks.
    ///
    /// Requests made while a frame is executing are coalesced into exactly
    /// one more frame. Requests made while the presenter cannot render
    /// (not loaded, hidden, suspended, disposed, or on a software backend)
    /// are ignored.
    pub fn request_render(&self) {
        self.inner.request_render();
    }

    /// Suspend or resume rendering.
    ///
    /// Suspending detaches the render loop and blocks until the in-flight
    /// frame has finished. A pending request is kept and served on resume.
    pub fn set_render_suspended(&self, suspended: bool) {
        self.inner.set_render_suspended(suspended);
    }

    pub fn is_render_suspended(&self) -> bool {
        self.inner.flags.suspended.load(SeqCst)
    }

    /// Stop rendering for good and release all GPU resources.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// The host element was attached to a live window.
    pub fn on_loaded(&self) -> Result<(), PresenterError> {
        self.inner.on_loaded()
    }

    /// The host element was detached. Blocks until the in-flight frame has
    /// finished, then releases the lease.
    pub fn on_unloaded(&self) {
        self.inner.on_unloaded();
    }

    pub fn on_device_options_changed(&self, options: DeviceOptions) {
        self.inner.on_device_options_changed(options);
    }

    /// Switching to a software backend releases the lease before returning.
    pub fn on_backend_changed(&self, backend: BackendKind) {
        self.inner.on_backend_changed(backend);
    }

    pub fn on_render_mode_changed(&self, mode: RenderMode) {
        self.inner.on_render_mode_changed(mode);
    }

    pub fn on_loop_driver_changed(&self, kind: LoopDriverKind) {
        self.inner.on_loop_driver_changed(kind);
    }

    pub fn on_size_changed(&self) {
        self.inner.on_size_changed();
    }

    pub fn on_visibility_changed(&self, visible: bool) {
        self.inner.on_visibility_changed(visible);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PresenterEvent> {
        self.inner.event_tx.subscribe()
    }

    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.inner.diagnostics.snapshot()
    }

    /// Id of the last presented frame. Zero before the first present.
    pub fn frame_id(&self) -> u64 {
        self.inner.frame_id()
    }

    pub fn is_rendering(&self) -> bool {
        self.inner.flags.rendering.load(SeqCst)
    }

    pub fn is_render_pending(&self) -> bool {
        self.inner.flags.pending.load(SeqCst)
    }

    pub fn loop_driver(&self) -> Option<LoopDriverKind> {
        self.inner.loop_driver()
    }

    pub fn has_lease(&self) -> bool {
        self.inner.leases.has_lease()
    }

    pub fn config(&self) -> PresenterConfig {
        self.inner.config()
    }
}

impl Drop for SwapchainPresenter {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}
