//! Frame execution.
//!
//! A frame runs in three steps:
//!
//! 1. Prepare, on the UI thread: lease, surface, render target, timing.
//! 2. Execute, on a blocking worker: scene fill, configure, draw, present.
//! 3. Finish, wherever the frame ended: clear the in-flight state and
//!    start the next frame if one was requested meanwhile.
//!
//! Any error or panic during execution is treated as device loss.

use crate::errors::DeviceLossCause;
use crate::events::{FramePresented, PresenterEvent, ReleaseReason};
use crate::host::{FrameContext, SurfaceRenderedArgs};
use crate::presenter::scheduler::Scheduler;
use crate::presenter::timing::FrameTime;
use crate::render::{DeviceLease, PresentSurface, RenderParams, RenderTarget, Scene, SurfaceConfig};
use anyhow::Context;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering::SeqCst;
use std::sync::Arc;
use std::time::Instant;

/// Everything the worker needs, resolved on the UI thread.
struct PreparedFrame {
    lease: Arc<dyn DeviceLease>,
    surface: Arc<dyn PresentSurface>,
    target: RenderTarget,
    params: RenderParams,
    time: FrameTime,
}

/// Finishes the frame when dropped, whichever way the frame ends.
struct InFlightFrame {
    scheduler: Arc<Scheduler>,
}

impl Drop for InFlightFrame {
    fn drop(&mut self) {
        self.scheduler.finish_frame();
    }
}

impl Scheduler {
    /// Run one frame if none is in flight. Called on the UI thread.
    pub(super) fn render_frame(self: &Arc<Self>) {
        if self.flags.rendering.compare_exchange(false, true, SeqCst, SeqCst).is_err() {
            return;
        }
        self.drain.set_busy();
        let guard = InFlightFrame { scheduler: self.clone() };

        if !self.can_render() {
            // Keep `pending` so the request runs once rendering is possible again.
            return;
        }
        if !self.flags.pending.swap(false, SeqCst) {
            // A duplicate post; the request was already served.
            return;
        }

        // Host callbacks during preparation run on this thread and must not
        // wait on the frame they are part of.
        self.drain.enter_frame_thread();
        let prepared = self.prepare_frame();
        self.drain.leave_frame_thread();

        let frame = match prepared {
            Ok(Some(frame)) => frame,
            Ok(None) => return,
            Err(cause) => {
                self.device_lost(cause);
                return;
            }
        };

        self.runtime.spawn_blocking(move || {
            guard.scheduler.drain.enter_frame_thread();
            guard.scheduler.execute_frame(frame);
            drop(guard);
        });
    }

    fn prepare_frame(&self) -> Result<Option<PreparedFrame>, DeviceLossCause> {
        let size = self.source.pixel_size();
        if size.is_empty() {
            log::trace!("Presenter[{}/{}]: surface is empty, frame skipped", self.id, self.label);
            return Ok(None);
        }

        let config = self.config();
        let Some(lease) = self.leases.acquire(&config.device_options) else {
            return Ok(None);
        };

        let surface = self
            .leases
            .ensure_surface(&lease, self.source.as_ref(), size)
            .context("creating presentation surface")?;
        let target = self.leases.ensure_target(size);
        let params = RenderParams {
            size,
            present_mode: config.device_options.present_mode,
            clear_color: config.clear_color,
        };
        let time = self.timing().sample(Instant::now());

        Ok(Some(PreparedFrame { lease, surface, target, params, time }))
    }

    fn execute_frame(&self, frame: PreparedFrame) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.present(&frame)));
        match outcome {
            Ok(Ok(())) => self.complete_frame(frame),
            Ok(Err(err)) => {
                drop(frame);
                self.device_lost(err.into());
            }
            Err(payload) => {
                drop(frame);
                self.device_lost(DeviceLossCause::from_panic(payload));
            }
        }
    }

    fn present(&self, frame: &PreparedFrame) -> anyhow::Result<()> {
        let size = frame.params.size;

        let mut scene = Scene::new(size);
        let ctx = FrameContext { time: frame.time, size, target: frame.target };
        self.handler.fill_scene(&mut scene, &ctx).context("filling scene")?;

        let surface_config = SurfaceConfig { size, present_mode: frame.params.present_mode };
        if self.leases.needs_configure(&surface_config) {
            frame.surface.configure(&surface_config).context("configuring surface")?;
            self.leases.mark_configured(surface_config);
            self.diagnostics.record_reconfiguration();
        }

        let texture = frame.surface.acquire_texture().context("acquiring surface texture")?;
        frame.surface.draw(&texture, &scene, &frame.params).context("drawing scene")?;

        self.handler.surface_rendered(&SurfaceRenderedArgs {
            lease: &frame.lease,
            surface: &frame.surface,
            texture: &texture,
            target: frame.target,
            params: frame.params,
            time: frame.time,
        })?;

        frame.surface.present(texture).context("presenting surface")?;
        self.diagnostics.record_presentation();
        Ok(())
    }

    fn complete_frame(&self, frame: PreparedFrame) {
        let frame_id = self.timing().commit();
        debug_assert_eq!(frame_id, frame.time.frame_id);
        self.diagnostics.mark_observed();

        log::trace!("Presenter[{}/{}]: presented frame {}", self.id, self.label, frame_id);
        let _ = self.event_tx.send(PresenterEvent::FramePresented(FramePresented {
            lease: frame.lease,
            surface: frame.surface,
            target: frame.target,
            size: frame.params.size,
            params: frame.params,
            timestamp: frame.time.timestamp,
            delta: frame.time.delta,
            frame_id,
        }));

        let handler = self.handler.clone();
        self.dispatcher.post(Box::new(move || handler.content_changed(frame_id)));
    }

    /// Tear down GPU resources after a failed frame. The next request
    /// acquires a fresh lease.
    pub(super) fn device_lost(&self, cause: DeviceLossCause) {
        log::warn!("Presenter[{}/{}]: device lost: {}", self.id, self.label, cause);

        self.leases.release(self.source.as_ref(), ReleaseReason::DeviceLost);
        self.reset_timing();
        let _ = self.event_tx.send(PresenterEvent::DeviceLost {
            presenter_id: self.id,
            cause: cause.to_string(),
        });
    }

    /// Clear the in-flight state. A request that came in meanwhile starts
    /// the next frame.
    pub(super) fn finish_frame(self: &Arc<Self>) {
        self.drain.set_idle();
        self.flags.rendering.store(false, SeqCst);
        if self.flags.pending.load(SeqCst) {
            self.request_render();
        }
    }
}
