//! Frame scheduler.
//!
//! Two atomic flags carry the scheduling state:
//!
//! - `pending`: a frame has been requested but not started yet.
//! - `rendering`: a frame is executing. It only goes from false to true
//!   through a compare-and-swap, so at most one frame is ever in flight.
//!
//! Any number of requests made while a frame runs collapse into one more
//! frame: the finishing frame sees `pending` and requests the next one
//! itself. Suspend, unload, option changes and dispose wait on the drain
//! signal so no frame touches GPU resources after they return.

use crate::config::{BackendKind, DeviceOptions, LoopDriverKind, PresenterConfig, RenderMode};
use crate::dispatch::Dispatcher;
use crate::errors::PresenterError;
use crate::events::{PresenterEvent, PresenterId, ReleaseReason};
use crate::host::{FrameCallback, FrameClock, FrameHandler, SurfaceSource};
use crate::presenter::diagnostics::DiagnosticsPublisher;
use crate::presenter::drain::DrainSignal;
use crate::presenter::driver::LoopDriver;
use crate::presenter::lease::LeaseManager;
use crate::presenter::timing::FrameTiming;
use crate::render::LeaseFactory;
use std::sync::atomic::{AtomicBool, Ordering::SeqCst};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::broadcast;

#[derive(Debug)]
pub(crate) struct SchedulerFlags {
    pub pending: AtomicBool,
    pub rendering: AtomicBool,
    pub loaded: AtomicBool,
    pub suspended: AtomicBool,
    pub visible: AtomicBool,
    pub disposed: AtomicBool,
}

impl Default for SchedulerFlags {
    fn default() -> Self {
        Self {
            pending: AtomicBool::new(false),
            rendering: AtomicBool::new(false),
            loaded: AtomicBool::new(false),
            suspended: AtomicBool::new(false),
            visible: AtomicBool::new(true),
            disposed: AtomicBool::new(false),
        }
    }
}

/// Collaborators a scheduler is built from.
pub(crate) struct SchedulerParts {
    pub source: Arc<dyn SurfaceSource>,
    pub dispatcher: Arc<dyn Dispatcher>,
    pub factory: Arc<dyn LeaseFactory>,
    pub handler: Arc<dyn FrameHandler>,
    pub frame_clock: Option<Arc<dyn FrameClock>>,
    pub runtime: Handle,
    pub config: PresenterConfig,
    pub event_capacity: usize,
}

pub(crate) struct Scheduler {
    pub(super) id: PresenterId,
    pub(super) label: String,
    pub(super) source: Arc<dyn SurfaceSource>,
    pub(super) dispatcher: Arc<dyn Dispatcher>,
    pub(super) handler: Arc<dyn FrameHandler>,
    frame_clock: Option<Arc<dyn FrameClock>>,
    pub(super) runtime: Handle,
    config: RwLock<PresenterConfig>,
    pub(super) flags: SchedulerFlags,
    pub(super) drain: DrainSignal,
    timing: Mutex<FrameTiming>,
    pub(super) leases: LeaseManager,
    pub(super) diagnostics: Arc<DiagnosticsPublisher>,
    driver: Mutex<LoopDriver>,
    pub(super) event_tx: broadcast::Sender<PresenterEvent>,
    weak_self: Weak<Scheduler>,
}

impl Scheduler {
    pub fn new(parts: SchedulerParts) -> Arc<Self> {
        let id = PresenterId::new();
        let (event_tx, _) = broadcast::channel(parts.event_capacity);
        let diagnostics = Arc::new(DiagnosticsPublisher::new(id, parts.handler.clone(), event_tx.clone()));
        let leases = LeaseManager::new(id, parts.factory, diagnostics.clone(), event_tx.clone());

        Arc::new_cyclic(|weak_self| Self {
            id,
            label: parts.source.label().to_string(),
            source: parts.source,
            dispatcher: parts.dispatcher,
            handler: parts.handler,
            frame_clock: parts.frame_clock,
            runtime: parts.runtime,
            config: RwLock::new(parts.config),
            flags: SchedulerFlags::default(),
            drain: DrainSignal::default(),
            timing: Mutex::new(FrameTiming::new(Instant::now())),
            leases,
            diagnostics,
            driver: Mutex::new(LoopDriver::None),
            event_tx,
            weak_self: weak_self.clone(),
        })
    }

    pub fn config(&self) -> PresenterConfig {
        self.config.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn update_config(&self, f: impl FnOnce(&mut PresenterConfig)) {
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut config);
    }

    pub(super) fn timing(&self) -> MutexGuard<'_, FrameTiming> {
        self.timing.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn reset_timing(&self) {
        self.timing().reset(Instant::now());
    }

    pub fn frame_id(&self) -> u64 {
        self.timing().frame_id()
    }

    pub fn loop_driver(&self) -> Option<LoopDriverKind> {
        self.driver.lock().unwrap_or_else(PoisonError::into_inner).kind()
    }

    /// Host loaded, visible, not suspended, not disposed, and on a GPU backend.
    pub(super) fn can_render(&self) -> bool {
        self.flags.loaded.load(SeqCst)
            && self.flags.visible.load(SeqCst)
            && !self.flags.suspended.load(SeqCst)
            && !self.flags.disposed.load(SeqCst)
            && self.config.read().unwrap_or_else(PoisonError::into_inner).backend.is_gpu_accelerated()
    }

    /// Ask for a frame. Never blocks and never fails.
    pub fn request_render(self: &Arc<Self>) {
        if !self.can_render() {
            return;
        }

        self.flags.pending.store(true, SeqCst);
        if self.flags.rendering.load(SeqCst) {
            // The in-flight frame picks the request up when it finishes.
            return;
        }

        if self.dispatcher.has_thread_access() {
            self.render_frame();
        } else {
            let this = self.clone();
            if !self.dispatcher.post(Box::new(move || this.render_frame())) {
                log::warn!("Presenter[{}/{}]: UI dispatcher is gone, render request dropped", self.id, self.label);
            }
        }
    }

    /// Cadence tick from the loop driver.
    fn on_tick(self: &Arc<Self>) {
        let on_demand = self.config().render_mode == RenderMode::OnDemand;
        if self.diagnostics.should_skip_tick(on_demand, self.flags.pending.load(SeqCst)) {
            log::trace!("Presenter[{}/{}]: tick skipped, nothing changed", self.id, self.label);
            return;
        }
        self.request_render();
    }

    fn tick_callback(&self) -> FrameCallback {
        let weak = self.weak_self.clone();
        Arc::new(move || {
            if let Some(scheduler) = weak.upgrade() {
                scheduler.on_tick();
            }
        })
    }

    fn desired_driver(&self) -> Option<LoopDriverKind> {
        if !self.can_render() {
            return None;
        }

        let config = self.config();
        let kind = match (config.render_mode, config.loop_driver) {
            (RenderMode::Continuous, kind) => kind,
            (RenderMode::OnDemand, LoopDriverKind::Compositor) if config.on_demand_polling => {
                LoopDriverKind::Compositor
            }
            (RenderMode::OnDemand, _) => return None,
        };

        if kind == LoopDriverKind::Compositor && self.frame_clock.is_none() {
            log::warn!(
                "Presenter[{}/{}]: compositor loop requested without a frame clock, using timer",
                self.id,
                self.label
            );
            return Some(LoopDriverKind::Timer);
        }
        Some(kind)
    }

    /// Attach, detach or swap the loop driver to match the current state.
    pub(super) fn update_loop(&self) {
        let desired = self.desired_driver();

        let old = {
            let mut driver = self.driver.lock().unwrap_or_else(PoisonError::into_inner);
            let old = driver.kind();
            if old == desired {
                return;
            }

            std::mem::take(&mut *driver).detach();
            *driver = match (desired, &self.frame_clock) {
                (None, _) => LoopDriver::None,
                (Some(LoopDriverKind::Compositor), Some(clock)) => {
                    LoopDriver::attach_compositor(clock.clone(), self.tick_callback())
                }
                (Some(_), _) => {
                    let interval = self.config().timer_interval;
                    LoopDriver::attach_timer(&self.runtime, interval, self.tick_callback())
                }
            };
            old
        };

        log::info!("Presenter[{}/{}]: loop driver {:?} -> {:?}", self.id, self.label, old, desired);
        let _ = self.event_tx.send(PresenterEvent::LoopDriverChanged {
            presenter_id: self.id,
            old,
            new: desired,
        });
    }

    pub(super) fn stop_loop(&self) {
        let old = {
            let mut driver = self.driver.lock().unwrap_or_else(PoisonError::into_inner);
            let old = driver.kind();
            std::mem::take(&mut *driver).detach();
            old
        };

        if old.is_some() {
            log::info!("Presenter[{}/{}]: loop driver {:?} detached", self.id, self.label, old);
            let _ = self.event_tx.send(PresenterEvent::LoopDriverChanged {
                presenter_id: self.id,
                old,
                new: None,
            });
        }
    }

    /// Block until the in-flight frame (if any) has finished.
    /// Returns false when called from the frame's own thread, which would
    /// wait on itself.
    pub(super) fn drain(&self) -> bool {
        if self.drain.is_idle() {
            return true;
        }
        if !self.drain.wait_idle() {
            log::warn!(
                "Presenter[{}/{}]: drain requested from inside the executing frame, not waiting",
                self.id,
                self.label
            );
            return false;
        }
        true
    }

    /// Drain, then release the lease while holding the in-flight flag so no
    /// frame can start preparing against it meanwhile.
    fn drain_and_release(self: &Arc<Self>, reason: ReleaseReason) {
        loop {
            if self.flags.rendering.compare_exchange(false, true, SeqCst, SeqCst).is_ok() {
                break;
            }
            if !self.drain() {
                // Inside the frame: it already holds the flag.
                self.leases.release(self.source.as_ref(), reason);
                return;
            }
            // The finished frame clears the flag right after going idle.
            std::thread::yield_now();
        }

        self.leases.release(self.source.as_ref(), reason);

        self.flags.rendering.store(false, SeqCst);
        if self.flags.pending.load(SeqCst) {
            self.request_render();
        }
    }

    pub fn set_render_suspended(self: &Arc<Self>, suspended: bool) {
        if self.flags.disposed.load(SeqCst) {
            return;
        }

        if suspended {
            if self.flags.suspended.swap(true, SeqCst) {
                return;
            }
            self.stop_loop();
            // `pending` is left alone so the request survives the suspension.
            self.drain();
        } else {
            if !self.flags.suspended.swap(false, SeqCst) {
                return;
            }
            self.reset_timing();
            self.update_loop();
            if self.flags.pending.load(SeqCst) {
                self.request_render();
            }
        }

        log::info!("Presenter[{}/{}]: rendering suspended: {}", self.id, self.label, suspended);
        let _ = self.event_tx.send(PresenterEvent::SuspensionChanged {
            presenter_id: self.id,
            suspended,
        });
    }

    /// Stop the loop, drain, and release the lease. Safe to call repeatedly.
    pub fn dispose(self: &Arc<Self>) {
        if self.flags.disposed.swap(true, SeqCst) {
            return;
        }

        log::debug!("Presenter[{}/{}]: disposing", self.id, self.label);
        self.stop_loop();
        self.drain_and_release(ReleaseReason::Disposed);
    }

    pub fn is_disposed(&self) -> bool {
        self.flags.disposed.load(SeqCst)
    }

    // ****************************************
    // ** Host lifecycle hooks

    pub fn on_loaded(self: &Arc<Self>) -> Result<(), PresenterError> {
        if self.is_disposed() {
            return Err(PresenterError::Disposed);
        }
        if self.flags.loaded.swap(true, SeqCst) {
            return Ok(());
        }

        self.reset_timing();
        self.update_loop();
        self.request_render();
        Ok(())
    }

    pub fn on_unloaded(self: &Arc<Self>) {
        if !self.flags.loaded.swap(false, SeqCst) {
            return;
        }

        self.stop_loop();
        self.drain_and_release(ReleaseReason::Unloaded);
    }

    /// New device options: the current lease is drained and released, and a
    /// new one is acquired with the new options on the next frame.
    pub fn on_device_options_changed(self: &Arc<Self>, options: DeviceOptions) {
        if self.is_disposed() || self.config().device_options == options {
            return;
        }

        self.update_config(|c| c.device_options = options);
        self.stop_loop();
        self.drain_and_release(ReleaseReason::OptionsChanged);

        self.reset_timing();
        self.update_loop();
        self.request_render();
    }

    pub fn on_backend_changed(self: &Arc<Self>, backend: BackendKind) {
        if self.is_disposed() || self.config().backend == backend {
            return;
        }

        self.update_config(|c| c.backend = backend);
        if backend.is_gpu_accelerated() {
            self.reset_timing();
            self.update_loop();
            self.request_render();
        } else {
            self.stop_loop();
            self.drain_and_release(ReleaseReason::BackendChanged);
        }
    }

    pub fn on_render_mode_changed(self: &Arc<Self>, mode: RenderMode) {
        if self.is_disposed() || self.config().render_mode == mode {
            return;
        }

        self.update_config(|c| c.render_mode = mode);
        self.update_loop();
        self.request_render();
    }

    pub fn on_loop_driver_changed(&self, kind: LoopDriverKind) {
        if self.is_disposed() || self.config().loop_driver == kind {
            return;
        }

        self.update_config(|c| c.loop_driver = kind);
        self.update_loop();
    }

    pub fn on_size_changed(self: &Arc<Self>) {
        self.request_render();
    }

    pub fn on_visibility_changed(self: &Arc<Self>, visible: bool) {
        if self.flags.visible.swap(visible, SeqCst) == visible {
            return;
        }

        if visible {
            self.reset_timing();
            self.update_loop();
            self.request_render();
        } else {
            self.stop_loop();
        }
    }
}
