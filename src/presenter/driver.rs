use crate::config::LoopDriverKind;
use crate::host::{FrameCallback, FrameClock, FrameSubscription};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Cadence source currently attached to the scheduler. At most one exists
/// at a time; the old one is detached before a new one is attached.
#[derive(Default)]
pub(crate) enum LoopDriver {
    #[default]
    None,
    Timer(TimerLoop),
    Compositor(CompositorLoop),
}

pub(crate) struct TimerLoop {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

pub(crate) struct CompositorLoop {
    clock: Arc<dyn FrameClock>,
    subscription: FrameSubscription,
}

impl LoopDriver {
    pub fn kind(&self) -> Option<LoopDriverKind> {
        match self {
            LoopDriver::None => None,
            LoopDriver::Timer(_) => Some(LoopDriverKind::Timer),
            LoopDriver::Compositor(_) => Some(LoopDriverKind::Compositor),
        }
    }

    /// Start a timer task on the runtime that calls `on_tick` every `interval`.
    pub fn attach_timer(runtime: &Handle, interval: Duration, on_tick: FrameCallback) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => on_tick(),
                }
            }
        });

        LoopDriver::Timer(TimerLoop { cancel, task })
    }

    /// Subscribe `on_tick` to the host compositor's frame callback.
    pub fn attach_compositor(clock: Arc<dyn FrameClock>, on_tick: FrameCallback) -> Self {
        let subscription = clock.subscribe(on_tick);
        LoopDriver::Compositor(CompositorLoop { clock, subscription })
    }

    /// Stop the cadence source and drop its callback.
    pub fn detach(self) {
        match self {
            LoopDriver::None => {}
            LoopDriver::Timer(timer) => {
                timer.cancel.cancel();
                timer.task.abort();
            }
            LoopDriver::Compositor(compositor) => {
                compositor.clock.unsubscribe(compositor.subscription);
            }
        }
    }
}
