pub mod backend;

/// Rendering backends shipped with the presenter.
pub mod backends {
    /// Headless backend
    pub mod null;
}

mod scene;
pub use scene::*;

pub use backend::{
    DeviceLease, LeaseFactory, PixelSize, PresentMode, PresentSurface, RenderParams, RenderTarget,
    SurfaceConfig, SurfaceTarget, SurfaceTexture,
};
