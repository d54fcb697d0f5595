//! Marshaling work onto the thread that owns UI/windowing state.
//!
//! The presenter never assumes a particular UI toolkit. All it needs is a
//! [`Dispatcher`]: something that can tell whether the caller already runs
//! on the owning thread, and that can queue a job for that thread otherwise.
//!
//! [`EventLoopDispatcher`] is a ready-made implementation: a single-consumer
//! queue bound to one thread. Either let it spawn a dedicated thread, or bind
//! it to the current thread and pump it from your own event loop:
//!
//! ```
//! use swapchain_presenter::dispatch::{Dispatcher, EventLoopDispatcher};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let (dispatcher, mut pump) = EventLoopDispatcher::for_current_thread();
//! assert!(dispatcher.has_thread_access());
//!
//! let hits = Arc::new(AtomicUsize::new(0));
//! let h = hits.clone();
//! dispatcher.post(Box::new(move || { h.fetch_add(1, Ordering::SeqCst); }));
//!
//! assert_eq!(pump.run_pending(), 1);
//! assert_eq!(hits.load(Ordering::SeqCst), 1);
//! ```

use std::marker::PhantomData;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tokio::sync::mpsc;

/// Unit of work queued for the owning thread.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Access to the thread that owns UI/windowing state.
pub trait Dispatcher: Send + Sync {
    /// Returns true when called on the owning thread.
    fn has_thread_access(&self) -> bool;

    /// Queue a job for the owning thread. Returns false (and drops the job)
    /// when the owning loop has shut down.
    fn post(&self, job: Job) -> bool;
}

/// Single-consumer job queue bound to one thread.
pub struct EventLoopDispatcher {
    owner: ThreadId,
    tx: mpsc::UnboundedSender<Job>,
}

impl std::fmt::Debug for EventLoopDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoopDispatcher")
            .field("owner", &self.owner)
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl EventLoopDispatcher {
    /// Spawn a dedicated thread that runs queued jobs until every dispatcher
    /// reference has been dropped.
    pub fn spawn(name: impl Into<String>) -> std::io::Result<(Arc<Self>, thread::JoinHandle<()>)> {
        let (tx, rx) = mpsc::unbounded_channel::<Job>();

        let handle = thread::Builder::new().name(name.into()).spawn(move || {
            let pump = EventLoopPump {
                rx,
                owner: thread::current().id(),
                _not_send: PhantomData,
            };
            pump.run();
        })?;

        let dispatcher = Arc::new(Self { owner: handle.thread().id(), tx });
        Ok((dispatcher, handle))
    }

    /// Bind a dispatcher to the calling thread. The returned pump must be
    /// driven from this thread.
    pub fn for_current_thread() -> (Arc<Self>, EventLoopPump) {
        let (tx, rx) = mpsc::unbounded_channel::<Job>();
        let owner = thread::current().id();

        let pump = EventLoopPump { rx, owner, _not_send: PhantomData };
        (Arc::new(Self { owner, tx }), pump)
    }

    pub fn owner(&self) -> ThreadId {
        self.owner
    }
}

impl Dispatcher for EventLoopDispatcher {
    fn has_thread_access(&self) -> bool {
        thread::current().id() == self.owner
    }

    fn post(&self, job: Job) -> bool {
        self.tx.send(job).is_ok()
    }
}

/// Consumer side of an [`EventLoopDispatcher`]. Not `Send`: it stays on the
/// thread it was bound to.
pub struct EventLoopPump {
    rx: mpsc::UnboundedReceiver<Job>,
    owner: ThreadId,
    _not_send: PhantomData<*const ()>,
}

impl EventLoopPump {
    /// Run every job that is queued right now. Returns the number of jobs run.
    pub fn run_pending(&mut self) -> usize {
        debug_assert_eq!(thread::current().id(), self.owner, "pump driven from a foreign thread");

        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Run jobs until all dispatchers are dropped. Must not be called from
    /// within an async context.
    pub fn run(mut self) {
        debug_assert_eq!(thread::current().id(), self.owner, "pump driven from a foreign thread");

        while let Some(job) = self.rx.blocking_recv() {
            job();
        }
        log::debug!("EventLoopPump: all dispatchers dropped, loop exiting");
    }
}
