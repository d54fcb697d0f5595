use crate::config::DeviceOptions;
use crate::events::{PresenterEvent, PresenterId, ReleaseReason};
use crate::host::SurfaceSource;
use crate::presenter::diagnostics::DiagnosticsPublisher;
use crate::render::{
    DeviceLease, LeaseFactory, PixelSize, PresentSurface, RenderTarget, SurfaceConfig, SurfaceTarget,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

/// Surface created from the current lease.
struct SurfaceSlot {
    surface: Arc<dyn PresentSurface>,
    /// Pixel size the surface should have.
    size: PixelSize,
    /// What the native swapchain was last configured with.
    configured: Option<SurfaceConfig>,
}

#[derive(Default)]
struct LeaseState {
    lease: Option<Arc<dyn DeviceLease>>,
    surface: Option<SurfaceSlot>,
    target: Option<RenderTarget>,
    target_generation: u64,
}

/// Owns the device lease, its surface and the backing render target.
///
/// Mutation only happens from the frame holding the is-rendering flag, or
/// after the scheduler has drained the in-flight frame.
pub(crate) struct LeaseManager {
    presenter_id: PresenterId,
    factory: Arc<dyn LeaseFactory>,
    state: Mutex<LeaseState>,
    diagnostics: Arc<DiagnosticsPublisher>,
    event_tx: broadcast::Sender<PresenterEvent>,
}

impl LeaseManager {
    pub fn new(
        presenter_id: PresenterId,
        factory: Arc<dyn LeaseFactory>,
        diagnostics: Arc<DiagnosticsPublisher>,
        event_tx: broadcast::Sender<PresenterEvent>,
    ) -> Self {
        Self {
            presenter_id,
            factory,
            state: Mutex::new(LeaseState::default()),
            diagnostics,
            event_tx,
        }
    }

    fn state(&self) -> MutexGuard<'_, LeaseState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn has_lease(&self) -> bool {
        self.state().lease.is_some()
    }

    pub fn lease(&self) -> Option<Arc<dyn DeviceLease>> {
        self.state().lease.clone()
    }

    /// Return the current lease, acquiring one from the factory if needed.
    pub fn acquire(&self, options: &DeviceOptions) -> Option<Arc<dyn DeviceLease>> {
        if let Some(lease) = self.lease() {
            return Some(lease);
        }

        let Some(lease) = self.factory.acquire(options) else {
            log::warn!("Presenter[{}]: lease factory returned no device", self.presenter_id);
            return None;
        };

        let adapter = lease.adapter_name();
        log::info!("Presenter[{}]: acquired device lease on {}", self.presenter_id, adapter);

        self.state().lease = Some(lease.clone());
        self.diagnostics.activate(adapter.clone());
        let _ = self.event_tx.send(PresenterEvent::LeaseAcquired {
            presenter_id: self.presenter_id,
            adapter,
        });

        Some(lease)
    }

    /// Make sure a surface exists for the lease and tracks the given size.
    pub fn ensure_surface(
        &self,
        lease: &Arc<dyn DeviceLease>,
        source: &dyn SurfaceSource,
        size: PixelSize,
    ) -> anyhow::Result<Arc<dyn PresentSurface>> {
        let resized = {
            let mut state = self.state();
            match state.surface.as_mut() {
                Some(slot) if slot.size == size => return Ok(slot.surface.clone()),
                Some(slot) => {
                    slot.size = size;
                    Some(slot.surface.clone())
                }
                None => None,
            }
        };

        if let Some(surface) = resized {
            log::debug!("Presenter[{}]: surface resized to {}", self.presenter_id, size);
            source.surface_resized(size);
            return Ok(surface);
        }

        let surface = lease.create_surface(&SurfaceTarget {
            window: source.window_handle(),
            size,
            label: source.label(),
        })?;

        self.state().surface = Some(SurfaceSlot {
            surface: surface.clone(),
            size,
            configured: None,
        });
        log::debug!("Presenter[{}]: surface created at {}", self.presenter_id, size);
        source.surface_created(size);

        Ok(surface)
    }

    /// Return the backing render target, recreating it when the size changed.
    pub fn ensure_target(&self, size: PixelSize) -> RenderTarget {
        let mut state = self.state();
        match state.target {
            Some(target) if target.size == size => target,
            _ => {
                state.target_generation += 1;
                let target = RenderTarget { size, generation: state.target_generation };
                state.target = Some(target);
                target
            }
        }
    }

    /// Does the surface need a native configure call for this config?
    pub fn needs_configure(&self, config: &SurfaceConfig) -> bool {
        self.state()
            .surface
            .as_ref()
            .map_or(true, |slot| slot.configured.as_ref() != Some(config))
    }

    pub fn mark_configured(&self, config: SurfaceConfig) {
        if let Some(slot) = self.state().surface.as_mut() {
            slot.configured = Some(config);
        }
    }

    /// Destroy the surface and drop the lease. Publishes the invalidated
    /// diagnostics sentinel. Returns false when nothing was held.
    pub fn release(&self, source: &dyn SurfaceSource, reason: ReleaseReason) -> bool {
        let (lease, surface) = {
            let mut state = self.state();
            state.target = None;
            (state.lease.take(), state.surface.take())
        };

        if lease.is_none() && surface.is_none() {
            return false;
        }

        // Surface goes before the device it was created from.
        if let Some(slot) = surface {
            drop(slot);
            source.surface_destroyed();
        }
        drop(lease);

        log::info!("Presenter[{}]: released device lease ({:?})", self.presenter_id, reason);
        self.diagnostics.invalidate();
        let _ = self.event_tx.send(PresenterEvent::LeaseReleased {
            presenter_id: self.presenter_id,
            reason,
        });
        true
    }
}
