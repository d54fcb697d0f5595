use crate::config::DeviceOptions;
use crate::render::scene::{Color, Scene};
use raw_window_handle::RawWindowHandle;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Size of a surface in pixels. It's a simple struct to hold width and height.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[derive(PartialEq, Eq, Hash)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A surface with a zero dimension cannot be configured or presented.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for PixelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Present modes for the swapchain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PresentMode {
    /// Wait for vertical blank, never tear.
    #[default]
    Fifo,
    /// Present as soon as possible, may tear.
    Immediate,
    /// Replace the queued image, never tear.
    Mailbox,
}

/// Configuration applied to a [`PresentSurface`] before textures are acquired from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceConfig {
    pub size: PixelSize,
    pub present_mode: PresentMode,
}

/// Resolved parameters for drawing one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderParams {
    pub size: PixelSize,
    pub present_mode: PresentMode,
    pub clear_color: Color,
}

/// Backing render target kept by the presenter for the current pixel size.
/// A new generation is created whenever the size changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderTarget {
    pub size: PixelSize,
    pub generation: u64,
}

/// Texture acquired from a [`PresentSurface`]. It is consumed by
/// [`PresentSurface::present`], so it can be presented at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct SurfaceTexture {
    pub id: u64,
    pub size: PixelSize,
}

/// Everything a lease needs to create a presentable surface for a window.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceTarget<'a> {
    /// Native window the surface binds to. `None` for headless targets.
    pub window: Option<RawWindowHandle>,
    /// Current pixel size of the target region.
    pub size: PixelSize,
    /// Diagnostics label of the surface source.
    pub label: &'a str,
}

/// Exclusively owned bundle of GPU device, adapter and queue.
///
/// Dropping the last reference releases the native objects.
pub trait DeviceLease: Send + Sync {
    /// Human readable adapter name, reported in diagnostics.
    fn adapter_name(&self) -> String;

    /// Create a presentable surface bound to the given target. Called on the
    /// thread that owns the UI/windowing state.
    fn create_surface(&self, target: &SurfaceTarget<'_>) -> anyhow::Result<Arc<dyn PresentSurface>>;
}

/// A presentable swapchain surface. All calls happen on the presenter's
/// worker thread while a frame is in flight, never concurrently.
pub trait PresentSurface: Send + Sync {
    /// (Re)configure the swapchain for the given size and present mode.
    fn configure(&self, config: &SurfaceConfig) -> anyhow::Result<()>;

    /// Acquire the next texture to draw into.
    fn acquire_texture(&self) -> anyhow::Result<SurfaceTexture>;

    /// Draw the scene into the acquired texture.
    fn draw(&self, texture: &SurfaceTexture, scene: &Scene, params: &RenderParams) -> anyhow::Result<()>;

    /// Present the texture.
    fn present(&self, texture: SurfaceTexture) -> anyhow::Result<()>;
}

/// Acquires device leases. Returns `None` when no suitable device is
/// available; the presenter then renders nothing until the next request.
pub trait LeaseFactory: Send + Sync {
    fn acquire(&self, options: &DeviceOptions) -> Option<Arc<dyn DeviceLease>>;
}

impl<F> LeaseFactory for F
where
    F: Fn(&DeviceOptions) -> Option<Arc<dyn DeviceLease>> + Send + Sync,
{
    fn acquire(&self, options: &DeviceOptions) -> Option<Arc<dyn DeviceLease>> {
        self(options)
    }
}
