use crate::render::Color;
use std::time::Duration;

/// Errors raised while constructing or driving a presenter. Frame level
/// failures never surface here; they are handled as device loss.
#[derive(Debug, thiserror::Error)]
pub enum PresenterError {
    #[error("No surface source supplied")]
    MissingSurfaceSource,

    #[error("No dispatcher supplied")]
    MissingDispatcher,

    #[error("No lease factory supplied")]
    MissingLeaseFactory,

    #[error("No frame handler supplied")]
    MissingFrameHandler,

    #[error("No tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Presenter has been disposed")]
    Disposed,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("timer_interval {0:?} is out of range (expected 1ms..=1s)")]
    TimerInterval(Duration),

    #[error("clear_color {0:?} has channels outside 0.0..=1.0")]
    ClearColor(Color),
}

/// Errors a native backend can return to tell the presenter what went wrong.
/// Any other error type is treated as a generic native failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NativeError {
    #[error("Native rendering library is not available: {0}")]
    LibraryMissing(String),

    #[error("Device lost: {0}")]
    DeviceLost(String),

    #[error("Surface lost")]
    SurfaceLost,

    #[error("Out of GPU memory")]
    OutOfMemory,
}

/// Why the presenter tore down its GPU resources mid-frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceLossCause {
    #[error("native rendering library missing: {0}")]
    LibraryMissing(String),

    #[error("native failure: {0}")]
    Native(String),

    #[error("panic during frame: {0}")]
    Panicked(String),
}

impl From<anyhow::Error> for DeviceLossCause {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<NativeError>() {
            Some(NativeError::LibraryMissing(lib)) => DeviceLossCause::LibraryMissing(lib.clone()),
            _ => DeviceLossCause::Native(format!("{err:#}")),
        }
    }
}

impl DeviceLossCause {
    /// Build a cause from a panic payload caught with `catch_unwind`.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        DeviceLossCause::Panicked(msg)
    }
}
