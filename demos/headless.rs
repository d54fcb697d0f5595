use swapchain_presenter::config::{LoopDriverKind, PresenterConfig, RenderMode};
use swapchain_presenter::dispatch::EventLoopDispatcher;
use swapchain_presenter::events::PresenterEvent;
use swapchain_presenter::host::{FrameContext, FrameHandler, SurfaceSource};
use swapchain_presenter::render::backends::null::NullLeaseFactory;
use swapchain_presenter::render::{Color, DisplayItem, PixelSize, Scene};
use swapchain_presenter::{DiagnosticsSnapshot, PresenterError, SwapchainPresenter};
use raw_window_handle::RawWindowHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// A fake 640x480 window. There is no real native window in headless mode.
struct HeadlessWindow;

impl SurfaceSource for HeadlessWindow {
    fn pixel_size(&self) -> PixelSize {
        PixelSize::new(640, 480)
    }

    fn window_handle(&self) -> Option<RawWindowHandle> {
        None
    }

    fn label(&self) -> &str {
        "headless"
    }
}

/// Draws a rectangle that slides across the surface.
struct SlidingRect;

impl FrameHandler for SlidingRect {
    fn fill_scene(&self, scene: &mut Scene, frame: &FrameContext) -> anyhow::Result<()> {
        let t = frame.time.timestamp.as_secs_f32();
        let x = (t * 200.0) % frame.size.width as f32;

        scene.push(DisplayItem::Clear { color: Color::from_u8(20, 20, 30, 255) });
        scene.push(DisplayItem::Rect {
            x,
            y: 100.0,
            w: 80.0,
            h: 80.0,
            color: Color::from_u8(220, 80, 40, 255),
        });
        Ok(())
    }

    fn diagnostics_changed(&self, snapshot: &DiagnosticsSnapshot) {
        log::debug!("diagnostics: {:?}", snapshot);
    }
}

#[tokio::main]
async fn main() -> Result<(), PresenterError> {
    env_logger::init();

    // The presenter marshals frame preparation onto the thread owning the
    // window. Here that is a dedicated thread with a simple job queue.
    let (dispatcher, _ui_thread) = EventLoopDispatcher::spawn("ui").expect("cannot spawn UI thread");

    // Render continuously at ~60fps from a timer.
    let config = PresenterConfig::builder()
        .render_mode(RenderMode::Continuous)
        .loop_driver(LoopDriverKind::Timer)
        .timer_interval(Duration::from_micros(16_667))
        .build()?;

    // The null lease factory hands out a device that accepts every call
    // without touching a GPU.
    let presenter = SwapchainPresenter::builder()
        .surface_source(Arc::new(HeadlessWindow))
        .dispatcher(dispatcher)
        .lease_factory(Arc::new(NullLeaseFactory::new()))
        .handler(Arc::new(SlidingRect))
        .config(config)
        .build()?;

    // Listen to presenter events in the background
    let mut event_rx = presenter.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = event_rx.recv().await {
            match event {
                PresenterEvent::FramePresented(frame) if frame.frame_id % 30 == 0 => {
                    println!("frame {} at {:?} (delta {:?})", frame.frame_id, frame.timestamp, frame.delta);
                }
                PresenterEvent::FramePresented(_) | PresenterEvent::DiagnosticsChanged { .. } => {}
                other => println!("event: {:?}", other),
            }
        }
    });

    // Attaching the element starts the loop
    presenter.on_loaded()?;
    sleep(Duration::from_secs(1)).await;

    // Suspending blocks until the in-flight frame is done, so keep it off
    // the async worker.
    let presenter = tokio::task::spawn_blocking(move || {
        presenter.set_render_suspended(true);
        presenter
    })
    .await
    .expect("suspend task failed");

    println!("presented {} frames", presenter.frame_id());
    println!("diagnostics: {:?}", presenter.diagnostics());

    tokio::task::spawn_blocking(move || presenter.dispose())
        .await
        .expect("dispose task failed");

    Ok(())
}
