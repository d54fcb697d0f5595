//! Headless backend that accepts every call without touching a GPU.
//!
//! Useful for hosts running without a display and for exercising the
//! presenter's scheduling. The surface counts what it was asked to do.

use crate::config::DeviceOptions;
use crate::render::backend::{
    DeviceLease, LeaseFactory, PixelSize, PresentSurface, RenderParams, SurfaceConfig, SurfaceTarget,
    SurfaceTexture,
};
use crate::render::scene::Scene;
use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Factory handing out [`NullLease`]s.
#[derive(Default)]
pub struct NullLeaseFactory {
    /// Number of leases handed out so far.
    acquired: AtomicU64,
    /// When set, `acquire` reports that no device is available.
    unavailable: AtomicBool,
}

impl NullLeaseFactory {
    /// Creates a new instance of the null lease factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend no device is available (or available again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn acquired(&self) -> u64 {
        self.acquired.load(Ordering::SeqCst)
    }
}

impl LeaseFactory for NullLeaseFactory {
    fn acquire(&self, options: &DeviceOptions) -> Option<Arc<dyn DeviceLease>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return None;
        }

        self.acquired.fetch_add(1, Ordering::SeqCst);
        let name = match &options.label {
            Some(label) => format!("Null Adapter ({label})"),
            None => "Null Adapter".to_string(),
        };
        Some(Arc::new(NullLease { name }))
    }
}

/// Device lease without a device.
pub struct NullLease {
    name: String,
}

impl DeviceLease for NullLease {
    fn adapter_name(&self) -> String {
        self.name.clone()
    }

    fn create_surface(&self, target: &SurfaceTarget<'_>) -> Result<Arc<dyn PresentSurface>> {
        if target.size.is_empty() {
            return Err(anyhow!("NullLease cannot create a surface of size {}", target.size));
        }
        Ok(Arc::new(NullSurface::new()))
    }
}

/// Surface that records configuration and present calls.
#[derive(Default)]
pub struct NullSurface {
    config: Mutex<Option<SurfaceConfig>>,
    next_texture: AtomicU64,
    presented: AtomicU64,
    drawn_items: AtomicU64,
}

impl NullSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size the surface was last configured with.
    pub fn configured_size(&self) -> Option<PixelSize> {
        self.config
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .map(|c| c.size)
    }

    pub fn presented(&self) -> u64 {
        self.presented.load(Ordering::SeqCst)
    }

    pub fn drawn_items(&self) -> u64 {
        self.drawn_items.load(Ordering::SeqCst)
    }
}

impl PresentSurface for NullSurface {
    fn configure(&self, config: &SurfaceConfig) -> Result<()> {
        if config.size.is_empty() {
            return Err(anyhow!("NullSurface cannot be configured to {}", config.size));
        }
        *self.config.lock().unwrap_or_else(PoisonError::into_inner) = Some(*config);
        Ok(())
    }

    fn acquire_texture(&self) -> Result<SurfaceTexture> {
        let size = self
            .configured_size()
            .ok_or_else(|| anyhow!("NullSurface used before configure"))?;

        let id = self.next_texture.fetch_add(1, Ordering::SeqCst);
        Ok(SurfaceTexture { id, size })
    }

    fn draw(&self, _texture: &SurfaceTexture, scene: &Scene, _params: &RenderParams) -> Result<()> {
        self.drawn_items.fetch_add(scene.len() as u64, Ordering::SeqCst);
        Ok(())
    }

    fn present(&self, _texture: SurfaceTexture) -> Result<()> {
        self.presented.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
