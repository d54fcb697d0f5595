use super::*;
use crate::config::PresenterConfig;
use crate::dispatch::EventLoopDispatcher;
use crate::errors::NativeError;
use crate::events::ReleaseReason;
use crate::host::{FrameContext, FrameHandler, ManualFrameClock, SurfaceRenderedArgs, SurfaceSource};
use crate::render::backends::null::NullLeaseFactory;
use crate::render::{DisplayItem, PixelSize, PresentMode, Scene};
use raw_window_handle::RawWindowHandle;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};
use tokio::sync::broadcast::error::TryRecvError;

// ****************************************
// ** Instrumented host

struct TestSource {
    size: Mutex<PixelSize>,
    created: AtomicUsize,
    destroyed: AtomicUsize,
    /// Frames currently inside `fill_scene`, shared with the handler.
    frames_active: Arc<AtomicUsize>,
    destroyed_mid_frame: AtomicUsize,
}

impl TestSource {
    fn new(size: PixelSize, frames_active: Arc<AtomicUsize>) -> Self {
        Self {
            size: Mutex::new(size),
            created: AtomicUsize::new(0),
            destroyed: AtomicUsize::new(0),
            frames_active,
            destroyed_mid_frame: AtomicUsize::new(0),
        }
    }
}

impl SurfaceSource for TestSource {
    fn pixel_size(&self) -> PixelSize {
        *self.size.lock().unwrap()
    }
    fn window_handle(&self) -> Option<RawWindowHandle> {
        None
    }
    fn label(&self) -> &str {
        "test-surface"
    }
    fn surface_created(&self, _size: PixelSize) {
        self.created.fetch_add(1, Ordering::SeqCst);
    }
    fn surface_destroyed(&self) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        if self.frames_active.load(Ordering::SeqCst) > 0 {
            self.destroyed_mid_frame.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Holds frames inside `fill_scene` while closed.
#[derive(Default)]
struct Gate {
    closed: Mutex<bool>,
    cv: Condvar,
    waiting: AtomicUsize,
}

impl Gate {
    fn close(&self) {
        *self.closed.lock().unwrap() = true;
    }

    fn open(&self) {
        *self.closed.lock().unwrap() = false;
        self.cv.notify_all();
    }

    fn pass(&self) {
        let mut closed = self.closed.lock().unwrap();
        self.waiting.fetch_add(1, Ordering::SeqCst);
        while *closed {
            closed = self.cv.wait(closed).unwrap();
        }
        self.waiting.fetch_sub(1, Ordering::SeqCst);
    }

    fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct TestHandler {
    gate: Gate,
    scenes: AtomicUsize,
    active: Arc<AtomicUsize>,
    max_active: AtomicUsize,
    slow: AtomicBool,
    fail_next: AtomicBool,
    panic_next: AtomicBool,
    last_content: AtomicU64,
    content_thread: Mutex<Option<ThreadId>>,
}

impl TestHandler {
    fn scenes(&self) -> usize {
        self.scenes.load(Ordering::SeqCst)
    }
}

impl FrameHandler for TestHandler {
    fn fill_scene(&self, scene: &mut Scene, frame: &FrameContext) -> anyhow::Result<()> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        self.scenes.fetch_add(1, Ordering::SeqCst);

        self.gate.pass();
        if self.slow.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(1));
        }
        scene.push(DisplayItem::Clear { color: crate::render::Color::BLACK });
        assert_eq!(scene.size(), frame.size);

        self.active.fetch_sub(1, Ordering::SeqCst);
        if self.panic_next.swap(false, Ordering::SeqCst) {
            panic!("scene fill blew up");
        }
        Ok(())
    }

    fn surface_rendered(&self, _args: &SurfaceRenderedArgs<'_>) -> anyhow::Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(NativeError::DeviceLost("adapter removed".into()).into());
        }
        Ok(())
    }

    fn content_changed(&self, frame_id: u64) {
        self.last_content.store(frame_id, Ordering::SeqCst);
        *self.content_thread.lock().unwrap() = Some(thread::current().id());
    }
}

struct Fixture {
    runtime: tokio::runtime::Runtime,
    dispatcher: Arc<EventLoopDispatcher>,
    factory: Arc<NullLeaseFactory>,
    source: Arc<TestSource>,
    handler: Arc<TestHandler>,
    clock: Arc<ManualFrameClock>,
}

impl Fixture {
    fn new() -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let (dispatcher, _ui) = EventLoopDispatcher::spawn("presenter-test-ui").unwrap();

        Self::with(runtime, dispatcher)
    }

    fn with(runtime: tokio::runtime::Runtime, dispatcher: Arc<EventLoopDispatcher>) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let handler = Arc::new(TestHandler::default());
        Self {
            runtime,
            dispatcher,
            factory: Arc::new(NullLeaseFactory::new()),
            source: Arc::new(TestSource::new(PixelSize::new(64, 48), handler.active.clone())),
            handler,
            clock: Arc::new(ManualFrameClock::new()),
        }
    }

    fn builder(&self, config: PresenterConfig) -> PresenterBuilder {
        SwapchainPresenter::builder()
            .surface_source(self.source.clone())
            .dispatcher(self.dispatcher.clone())
            .lease_factory(self.factory.clone())
            .handler(self.handler.clone())
            .runtime(self.runtime.handle().clone())
            .config(config)
    }

    fn presenter(&self, config: PresenterConfig) -> SwapchainPresenter {
        self.builder(config).build().unwrap()
    }

    fn presenter_with_clock(&self, config: PresenterConfig) -> SwapchainPresenter {
        self.builder(config).frame_clock(self.clock.clone()).build().unwrap()
    }
}

fn on_demand() -> PresenterConfig {
    PresenterConfig::default()
}

fn continuous(kind: LoopDriverKind) -> PresenterConfig {
    PresenterConfig::builder()
        .render_mode(RenderMode::Continuous)
        .loop_driver(kind)
        .timer_interval(Duration::from_millis(2))
        .build()
        .unwrap()
}

fn wait_for(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(1));
    }
}

/// Wait until no frame is running or pending, then a little longer.
fn settle(p: &SwapchainPresenter) {
    wait_for("presenter to go idle", || !p.is_rendering() && !p.is_render_pending());
    thread::sleep(Duration::from_millis(30));
}

fn drain_events(rx: &mut broadcast::Receiver<PresenterEvent>) -> Vec<PresenterEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => return events,
        }
    }
}

fn loaded(fx: &Fixture, config: PresenterConfig) -> SwapchainPresenter {
    let p = fx.presenter(config);
    p.on_loaded().unwrap();
    wait_for("first frame", || p.frame_id() >= 1);
    p
}

// ****************************************
// ** Scheduling

#[test]
fn requests_before_load_do_nothing() {
    let fx = Fixture::new();
    let p = fx.presenter(on_demand());

    for _ in 0..3 {
        p.request_render();
    }
    thread::sleep(Duration::from_millis(30));

    assert!(!p.is_render_pending());
    assert_eq!(p.frame_id(), 0);
    assert_eq!(fx.factory.acquired(), 0);
    assert_eq!(fx.handler.scenes(), 0);
}

#[test]
fn first_frame_acquires_lease_and_presents() {
    let fx = Fixture::new();
    let p = fx.presenter(on_demand());
    let mut rx = p.subscribe_events();

    p.on_loaded().unwrap();
    wait_for("first frame", || p.frame_id() == 1);
    settle(&p);

    assert!(p.has_lease());
    assert_eq!(fx.factory.acquired(), 1);
    assert_eq!(fx.source.created.load(Ordering::SeqCst), 1);

    let diag = p.diagnostics();
    assert_eq!(diag.state, DeviceState::Active);
    assert_eq!(diag.adapter.as_deref(), Some("Null Adapter"));
    assert_eq!((diag.presentations, diag.reconfigurations), (1, 1));

    let events = drain_events(&mut rx);
    assert!(events.iter().any(|e| matches!(e, PresenterEvent::LeaseAcquired { .. })));
    let presented = events.iter().find_map(|e| match e {
        PresenterEvent::FramePresented(f) => Some(f.clone()),
        _ => None,
    });
    let presented = presented.expect("no FramePresented event");
    assert_eq!(presented.frame_id, 1);
    assert_eq!(presented.size, PixelSize::new(64, 48));
    assert_eq!(presented.delta, Duration::ZERO);
}

#[test]
fn content_changed_runs_on_the_ui_thread() {
    let fx = Fixture::new();
    let p = loaded(&fx, on_demand());

    wait_for("content changed", || fx.handler.last_content.load(Ordering::SeqCst) == 1);
    assert_eq!(*fx.handler.content_thread.lock().unwrap(), Some(fx.dispatcher.owner()));
    drop(p);
}

#[test]
fn frame_execution_is_single_flight() {
    let fx = Fixture::new();
    let p = Arc::new(loaded(&fx, on_demand()));
    fx.handler.slow.store(true, Ordering::SeqCst);

    let threads: Vec<_> = (0..4)
        .map(|_| {
            let p = p.clone();
            thread::spawn(move || {
                for _ in 0..25 {
                    p.request_render();
                    thread::sleep(Duration::from_micros(200));
                }
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }
    settle(&p);

    assert_eq!(fx.handler.max_active.load(Ordering::SeqCst), 1);
    assert!(p.frame_id() >= 2);
    assert_eq!(p.frame_id(), fx.handler.scenes() as u64);
}

#[test]
fn requests_during_a_frame_yield_exactly_one_more() {
    let fx = Fixture::new();
    let p = loaded(&fx, on_demand());
    settle(&p);

    fx.handler.gate.close();
    p.request_render();
    wait_for("frame to block", || fx.handler.gate.waiting() == 1);

    for _ in 0..5 {
        p.request_render();
    }
    assert!(p.is_rendering());
    assert!(p.is_render_pending());

    fx.handler.gate.open();
    wait_for("follow-up frame", || p.frame_id() == 3);
    settle(&p);

    assert_eq!(fx.handler.scenes(), 3);
    assert_eq!(p.frame_id(), 3);
}

#[test]
fn empty_surface_skips_the_frame() {
    let fx = Fixture::new();
    *fx.source.size.lock().unwrap() = PixelSize::new(0, 48);
    let p = fx.presenter(on_demand());

    p.on_loaded().unwrap();
    settle(&p);
    assert_eq!(fx.factory.acquired(), 0);
    assert_eq!(p.frame_id(), 0);

    *fx.source.size.lock().unwrap() = PixelSize::new(32, 32);
    p.on_size_changed();
    wait_for("frame after resize", || p.frame_id() == 1);
}

#[test]
fn unavailable_device_renders_nothing_until_it_returns() {
    let fx = Fixture::new();
    fx.factory.set_unavailable(true);
    let p = fx.presenter(on_demand());

    p.on_loaded().unwrap();
    settle(&p);
    assert!(!p.has_lease());
    assert!(p.diagnostics().is_invalidated());

    fx.factory.set_unavailable(false);
    p.request_render();
    wait_for("frame once a device is available", || p.frame_id() == 1);
    assert!(p.has_lease());
}

#[test]
fn hidden_presenter_does_not_render() {
    let fx = Fixture::new();
    let p = loaded(&fx, on_demand());
    settle(&p);

    p.on_visibility_changed(false);
    p.request_render();
    settle(&p);
    assert_eq!(p.frame_id(), 1);

    p.on_visibility_changed(true);
    wait_for("frame once visible", || p.frame_id() == 2);
}

// ****************************************
// ** Suspension and disposal

#[test]
fn suspending_twice_detaches_once() {
    let fx = Fixture::new();
    let p = loaded(&fx, continuous(LoopDriverKind::Timer));
    assert_eq!(p.loop_driver(), Some(LoopDriverKind::Timer));
    let mut rx = p.subscribe_events();

    p.set_render_suspended(true);
    p.set_render_suspended(true);
    assert!(p.is_render_suspended());
    assert_eq!(p.loop_driver(), None);
    wait_for("in-flight flag to clear", || !p.is_rendering());

    let events = drain_events(&mut rx);
    let detaches = events
        .iter()
        .filter(|e| matches!(e, PresenterEvent::LoopDriverChanged { new: None, .. }))
        .count();
    let suspensions = events
        .iter()
        .filter(|e| matches!(e, PresenterEvent::SuspensionChanged { suspended: true, .. }))
        .count();
    assert_eq!(detaches, 1);
    assert_eq!(suspensions, 1);

    let frames = p.frame_id();
    thread::sleep(Duration::from_millis(30));
    assert_eq!(p.frame_id(), frames);

    p.set_render_suspended(false);
    assert_eq!(p.loop_driver(), Some(LoopDriverKind::Timer));
    wait_for("frames after resume", || p.frame_id() > frames);
}

#[test]
fn pending_request_survives_suspension() {
    let fx = Fixture::new();
    let p = Arc::new(loaded(&fx, on_demand()));
    settle(&p);

    fx.handler.gate.close();
    p.request_render();
    wait_for("frame to block", || fx.handler.gate.waiting() == 1);
    p.request_render();

    let suspender = {
        let p = p.clone();
        thread::spawn(move || p.set_render_suspended(true))
    };
    wait_for("suspend flag", || p.is_render_suspended());
    fx.handler.gate.open();
    suspender.join().unwrap();

    // The blocked frame finished, the follow-up waits for resume.
    assert_eq!(p.frame_id(), 2);
    assert!(p.is_render_pending());
    thread::sleep(Duration::from_millis(30));
    assert_eq!(p.frame_id(), 2);

    p.set_render_suspended(false);
    wait_for("pending frame after resume", || p.frame_id() == 3);
}

#[test]
fn dispose_is_idempotent() {
    let fx = Fixture::new();
    let p = loaded(&fx, continuous(LoopDriverKind::Timer));
    let mut rx = p.subscribe_events();

    p.dispose();
    p.dispose();

    assert!(p.is_disposed());
    assert!(!p.has_lease());
    assert_eq!(p.loop_driver(), None);
    assert_eq!(fx.source.destroyed.load(Ordering::SeqCst), 1);

    let releases = drain_events(&mut rx)
        .into_iter()
        .filter(|e| {
            matches!(e, PresenterEvent::LeaseReleased { reason: ReleaseReason::Disposed, .. })
        })
        .count();
    assert_eq!(releases, 1);

    assert!(matches!(p.on_loaded(), Err(PresenterError::Disposed)));
    let frames = p.frame_id();
    p.request_render();
    thread::sleep(Duration::from_millis(20));
    assert_eq!(p.frame_id(), frames);
}

#[test]
fn unload_releases_and_reload_renders_again() {
    let fx = Fixture::new();
    let p = loaded(&fx, on_demand());

    p.on_unloaded();
    assert!(!p.has_lease());
    assert!(p.diagnostics().is_invalidated());

    p.on_loaded().unwrap();
    wait_for("frame after reload", || p.frame_id() == 2);
    assert_eq!(fx.factory.acquired(), 2);
}

#[test]
fn suspend_and_dispose_on_the_ui_thread_wait_for_a_queued_frame() {
    // One blocking thread, kept busy so the frame worker sits in the queue.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .max_blocking_threads(1)
        .enable_all()
        .build()
        .unwrap();
    let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
    let (busy_tx, busy_rx) = std::sync::mpsc::channel::<()>();
    runtime.spawn_blocking(move || {
        busy_tx.send(()).unwrap();
        let _ = release_rx.recv();
    });
    busy_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    // This thread is the UI thread.
    let (dispatcher, _pump) = EventLoopDispatcher::for_current_thread();
    let fx = Fixture::with(runtime, dispatcher);
    let p = fx.presenter(on_demand());

    // Prepared inline, execution queued behind the busy blocking thread
    p.on_loaded().unwrap();
    assert!(p.is_rendering());
    assert_eq!(fx.handler.scenes(), 0);

    let releaser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        release_tx.send(()).unwrap();
    });

    p.set_render_suspended(true);
    assert_eq!(fx.handler.scenes(), 1);
    assert_eq!(p.frame_id(), 1);

    p.dispose();
    assert!(!p.has_lease());
    thread::sleep(Duration::from_millis(30));
    assert_eq!(fx.handler.scenes(), 1);
    assert_eq!(p.frame_id(), 1);
    releaser.join().unwrap();
}

#[test]
fn off_thread_options_changes_never_release_under_a_frame() {
    let fx = Fixture::new();
    fx.handler.slow.store(true, Ordering::SeqCst);
    let config = PresenterConfig {
        timer_interval: Duration::from_millis(1),
        ..continuous(LoopDriverKind::Timer)
    };
    let p = Arc::new(loaded(&fx, config));

    // Requests keep frames posted to the UI thread while this thread swaps options.
    let stop = Arc::new(AtomicBool::new(false));
    let requester = {
        let (p, stop) = (p.clone(), stop.clone());
        thread::spawn(move || {
            while !stop.load(Ordering::SeqCst) {
                p.request_render();
                thread::sleep(Duration::from_micros(300));
            }
        })
    };

    for i in 0..40 {
        let mode = if i % 2 == 0 { PresentMode::Mailbox } else { PresentMode::Fifo };
        p.on_device_options_changed(DeviceOptions { present_mode: mode, ..DeviceOptions::default() });
        thread::sleep(Duration::from_millis(4));
    }
    stop.store(true, Ordering::SeqCst);
    requester.join().unwrap();

    assert!(fx.source.destroyed.load(Ordering::SeqCst) > 0);
    assert_eq!(fx.source.destroyed_mid_frame.load(Ordering::SeqCst), 0);
    assert_eq!(fx.handler.max_active.load(Ordering::SeqCst), 1);

    // The loop is still attached and keeps presenting.
    let frames = p.frame_id();
    wait_for("frames after the last options change", || p.frame_id() > frames);
    assert_eq!(p.loop_driver(), Some(LoopDriverKind::Timer));
}

// ****************************************
// ** Device loss

#[test]
fn failed_frame_keeps_frame_id_and_reacquires() {
    let fx = Fixture::new();
    let p = loaded(&fx, on_demand());
    settle(&p);
    let mut rx = p.subscribe_events();

    fx.handler.fail_next.store(true, Ordering::SeqCst);
    p.request_render();
    wait_for("device loss", || !p.has_lease());
    settle(&p);

    assert_eq!(p.frame_id(), 1);
    assert!(p.diagnostics().is_invalidated());
    let cause = drain_events(&mut rx).into_iter().find_map(|e| match e {
        PresenterEvent::DeviceLost { cause, .. } => Some(cause),
        _ => None,
    });
    assert!(cause.expect("no DeviceLost event").contains("adapter removed"));

    p.request_render();
    wait_for("frame on a fresh lease", || p.frame_id() == 2);
    assert_eq!(fx.factory.acquired(), 2);
    let diag = p.diagnostics();
    assert_eq!(diag.state, DeviceState::Active);
    assert_eq!(diag.presentations, 1);
}

#[test]
fn panicking_frame_is_device_loss() {
    let fx = Fixture::new();
    let p = loaded(&fx, on_demand());
    settle(&p);

    fx.handler.panic_next.store(true, Ordering::SeqCst);
    p.request_render();
    wait_for("device loss", || !p.has_lease());
    settle(&p);
    assert_eq!(p.frame_id(), 1);

    p.request_render();
    wait_for("recovery", || p.frame_id() == 2);
}

#[test]
fn software_backend_releases_before_returning() {
    let fx = Fixture::new();
    let p = loaded(&fx, continuous(LoopDriverKind::Timer));
    assert_eq!(p.loop_driver(), Some(LoopDriverKind::Timer));

    p.on_backend_changed(BackendKind::Software);
    assert_eq!(p.loop_driver(), None);
    assert!(!p.has_lease());
    assert!(p.diagnostics().is_invalidated());

    settle(&p);
    let frames = p.frame_id();
    p.request_render();
    thread::sleep(Duration::from_millis(30));
    assert_eq!(p.frame_id(), frames);
    assert!(!p.has_lease());

    p.on_backend_changed(BackendKind::Gpu);
    assert_eq!(p.loop_driver(), Some(LoopDriverKind::Timer));
    wait_for("frames back on the GPU", || p.frame_id() > frames);
    assert_eq!(fx.factory.acquired(), 2);
}

#[test]
fn options_change_drains_and_reacquires() {
    let fx = Fixture::new();
    let p = loaded(&fx, on_demand());
    let mut rx = p.subscribe_events();

    let options = DeviceOptions {
        present_mode: PresentMode::Mailbox,
        label: Some("second".into()),
        ..DeviceOptions::default()
    };
    p.on_device_options_changed(options.clone());
    wait_for("frame with new options", || p.frame_id() == 2);

    assert_eq!(fx.factory.acquired(), 2);
    assert_eq!(p.diagnostics().adapter.as_deref(), Some("Null Adapter (second)"));
    assert_eq!(p.config().device_options, options);
    assert!(drain_events(&mut rx).iter().any(|e| matches!(
        e,
        PresenterEvent::LeaseReleased { reason: ReleaseReason::OptionsChanged, .. }
    )));

    // Same options again is a no-op
    p.on_device_options_changed(options);
    settle(&p);
    assert_eq!(fx.factory.acquired(), 2);
}

// ****************************************
// ** Loop drivers

#[test]
fn timer_loop_renders_continuously() {
    let fx = Fixture::new();
    fx.handler.slow.store(true, Ordering::SeqCst);
    let config = PresenterConfig {
        timer_interval: Duration::from_millis(1),
        ..continuous(LoopDriverKind::Timer)
    };
    let p = loaded(&fx, config);

    wait_for("several timer frames", || p.frame_id() >= 10);
    // Ticks outpace the 1ms frames, yet frames never overlap
    assert_eq!(fx.handler.max_active.load(Ordering::SeqCst), 1);

    p.on_render_mode_changed(RenderMode::OnDemand);
    assert_eq!(p.loop_driver(), None);
    settle(&p);
    let frames = p.frame_id();
    thread::sleep(Duration::from_millis(30));
    assert_eq!(p.frame_id(), frames);
}

#[test]
fn compositor_loop_follows_the_frame_clock() {
    let fx = Fixture::new();
    let p = fx.presenter_with_clock(continuous(LoopDriverKind::Compositor));
    p.on_loaded().unwrap();
    wait_for("first frame", || p.frame_id() == 1);
    settle(&p);

    assert_eq!(p.loop_driver(), Some(LoopDriverKind::Compositor));
    assert_eq!(fx.clock.subscriber_count(), 1);

    fx.clock.fire();
    wait_for("clock frame", || p.frame_id() == 2);

    p.on_loop_driver_changed(LoopDriverKind::Timer);
    assert_eq!(fx.clock.subscriber_count(), 0);
    assert_eq!(p.loop_driver(), Some(LoopDriverKind::Timer));
}

#[test]
fn compositor_without_clock_falls_back_to_timer() {
    let fx = Fixture::new();
    let p = loaded(&fx, continuous(LoopDriverKind::Compositor));

    assert_eq!(p.loop_driver(), Some(LoopDriverKind::Timer));
    wait_for("timer frames", || p.frame_id() >= 3);
}

#[test]
fn on_demand_polling_skips_unchanged_ticks() {
    let fx = Fixture::new();
    let config = PresenterConfig::builder()
        .loop_driver(LoopDriverKind::Compositor)
        .on_demand_polling(true)
        .build()
        .unwrap();
    let p = fx.presenter_with_clock(config);
    p.on_loaded().unwrap();
    wait_for("first frame", || p.frame_id() == 1);
    settle(&p);
    assert_eq!(p.loop_driver(), Some(LoopDriverKind::Compositor));

    for _ in 0..5 {
        fx.clock.fire();
    }
    settle(&p);
    assert_eq!(p.frame_id(), 1);

    // Explicit requests still go through
    p.request_render();
    wait_for("requested frame", || p.frame_id() == 2);
}

// ****************************************
// ** Builder

#[test]
fn builder_reports_missing_parts() {
    let fx = Fixture::new();

    let err = SwapchainPresenter::builder().build().unwrap_err();
    assert!(matches!(err, PresenterError::MissingSurfaceSource));

    let err = SwapchainPresenter::builder()
        .surface_source(fx.source.clone())
        .dispatcher(fx.dispatcher.clone())
        .lease_factory(fx.factory.clone())
        .build()
        .unwrap_err();
    assert!(matches!(err, PresenterError::MissingFrameHandler));
}

#[test]
fn builder_needs_a_runtime() {
    let fx = Fixture::new();
    let err = SwapchainPresenter::builder()
        .surface_source(fx.source.clone())
        .dispatcher(fx.dispatcher.clone())
        .lease_factory(fx.factory.clone())
        .handler(fx.handler.clone())
        .build()
        .unwrap_err();
    assert!(matches!(err, PresenterError::NoRuntime(_)));
}

#[test]
fn builder_rejects_invalid_config() {
    let fx = Fixture::new();
    let mut config = PresenterConfig::default();
    config.timer_interval = Duration::ZERO;

    let err = fx.builder(config).build().unwrap_err();
    assert!(matches!(err, PresenterError::InvalidConfig(_)));
}
