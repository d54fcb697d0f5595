use crate::events::{PresenterEvent, PresenterId};
use crate::host::FrameHandler;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;

/// Health of the GPU resources as seen by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// No lease, or the lease was lost. Counters are zeroed.
    Invalidated,
    /// A lease is held and frames can be presented.
    Active,
}

/// Immutable diagnostics counters, sampled per frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticsSnapshot {
    pub state: DeviceState,
    pub adapter: Option<String>,
    pub presentations: u64,
    pub reconfigurations: u64,
}

impl DiagnosticsSnapshot {
    /// Sentinel published while no lease is held and after device loss.
    pub fn invalidated() -> Self {
        Self {
            state: DeviceState::Invalidated,
            adapter: None,
            presentations: 0,
            reconfigurations: 0,
        }
    }

    pub fn is_invalidated(&self) -> bool {
        self.state == DeviceState::Invalidated
    }

    fn counters(&self) -> (u64, u64) {
        (self.presentations, self.reconfigurations)
    }
}

impl Default for DiagnosticsSnapshot {
    fn default() -> Self {
        Self::invalidated()
    }
}

/// Owns the current snapshot and tells the host when it changes.
pub(crate) struct DiagnosticsPublisher {
    presenter_id: PresenterId,
    snapshot: Mutex<DiagnosticsSnapshot>,
    /// Counters seen at the end of the last frame. `None` after invalidation.
    observed: Mutex<Option<(u64, u64)>>,
    handler: Arc<dyn FrameHandler>,
    event_tx: broadcast::Sender<PresenterEvent>,
}

impl DiagnosticsPublisher {
    pub fn new(
        presenter_id: PresenterId,
        handler: Arc<dyn FrameHandler>,
        event_tx: broadcast::Sender<PresenterEvent>,
    ) -> Self {
        Self {
            presenter_id,
            snapshot: Mutex::new(DiagnosticsSnapshot::invalidated()),
            observed: Mutex::new(None),
            handler,
            event_tx,
        }
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// A new lease was acquired: counters start from zero.
    pub fn activate(&self, adapter: String) {
        self.update(|s| {
            *s = DiagnosticsSnapshot {
                state: DeviceState::Active,
                adapter: Some(adapter),
                presentations: 0,
                reconfigurations: 0,
            }
        });
    }

    /// Publish the sentinel. The next throttled tick is never skipped.
    pub fn invalidate(&self) {
        *self.observed.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.update(|s| *s = DiagnosticsSnapshot::invalidated());
    }

    pub fn record_reconfiguration(&self) {
        self.update(|s| s.reconfigurations += 1);
    }

    pub fn record_presentation(&self) {
        self.update(|s| s.presentations += 1);
    }

    /// Remember the current counters as seen by the loop throttle.
    pub fn mark_observed(&self) {
        let counters = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner).counters();
        *self.observed.lock().unwrap_or_else(PoisonError::into_inner) = Some(counters);
    }

    /// Should a loop tick be skipped? Only in on-demand mode with nothing
    /// pending and counters unchanged since the last observation.
    pub fn should_skip_tick(&self, on_demand: bool, render_pending: bool) -> bool {
        if !on_demand || render_pending {
            return false;
        }

        let current = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner).counters();
        let mut observed = self.observed.lock().unwrap_or_else(PoisonError::into_inner);
        if *observed == Some(current) {
            return true;
        }
        *observed = Some(current);
        false
    }

    fn update(&self, f: impl FnOnce(&mut DiagnosticsSnapshot)) {
        let changed = {
            let mut snapshot = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner);
            let before = snapshot.clone();
            f(&mut snapshot);
            (*snapshot != before).then(|| snapshot.clone())
        };

        // Notify outside the lock; handlers may read diagnostics again.
        if let Some(snapshot) = changed {
            self.handler.diagnostics_changed(&snapshot);
            let _ = self.event_tx.send(PresenterEvent::DiagnosticsChanged {
                presenter_id: self.presenter_id,
                snapshot,
            });
        }
    }
}
