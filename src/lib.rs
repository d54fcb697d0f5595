pub mod config;
pub mod dispatch;
pub mod errors;
pub mod events;
pub mod host;
pub mod presenter;
pub mod render;

pub use config::{BackendKind, DeviceOptions, LoopDriverKind, PresenterConfig, RenderMode};
pub use errors::{DeviceLossCause, NativeError, PresenterError};
pub use events::{PresenterEvent, PresenterId};
pub use presenter::{DiagnosticsSnapshot, PresenterBuilder, SwapchainPresenter};
