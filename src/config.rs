//! Presenter configuration.
//!
//! [`PresenterConfig`] controls which backend is used, how frames are
//! paced and which options are handed to the [`LeaseFactory`] when a device
//! is acquired. It provides defaults via [`Default`] and a fluent
//! [`PresenterConfig::builder()`] with validation.
//!
//! # Examples
//!
//! ## Use defaults
//! ```rust
//! use swapchain_presenter::config::{PresenterConfig, RenderMode};
//! let cfg = PresenterConfig::default();
//! assert_eq!(cfg.render_mode, RenderMode::OnDemand);
//! ```
//!
//! ## Customize with the builder
//! ```rust
//! use std::time::Duration;
//! use swapchain_presenter::config::{LoopDriverKind, PresenterConfig, RenderMode};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = PresenterConfig::builder()
//!     .render_mode(RenderMode::Continuous)
//!     .loop_driver(LoopDriverKind::Timer)
//!     .timer_interval(Duration::from_millis(8))
//!     .build()?;
//! assert_eq!(cfg.timer_interval, Duration::from_millis(8));
//! # Ok(()) }
//! ```
//!
//! Live changes after construction go through the presenter's lifecycle
//! hooks (`on_device_options_changed`, `on_backend_changed`, ...). The
//! settings they swap have no invalid values; validation happens in
//! `build()` and when the presenter is built.
//!
//! [`LeaseFactory`]: crate::render::LeaseFactory

use crate::errors::ConfigError;
use crate::render::{Color, PresentMode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MIN_TIMER_INTERVAL: Duration = Duration::from_millis(1);
const MAX_TIMER_INTERVAL: Duration = Duration::from_secs(1);

/// Which backend draws the content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// GPU accelerated swapchain presentation.
    #[default]
    Gpu,
    /// Software rasterization. The presenter stays idle and holds no GPU resources.
    Software,
}

impl BackendKind {
    pub fn is_gpu_accelerated(&self) -> bool {
        matches!(self, BackendKind::Gpu)
    }
}

/// When frames are produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenderMode {
    /// Render only when explicitly invalidated.
    #[default]
    OnDemand,
    /// Render at the cadence of the loop driver.
    Continuous,
}

/// Cadence source for continuous rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoopDriverKind {
    /// Fixed interval timer (see [`PresenterConfig::timer_interval`]).
    #[default]
    Timer,
    /// Per-frame callback of the host compositor.
    Compositor,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerPreference {
    #[default]
    None,
    LowPower,
    HighPerformance,
}

/// Options handed to the lease factory when a device is acquired.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceOptions {
    pub power_preference: PowerPreference,
    pub present_mode: PresentMode,
    /// Prefer a software/fallback adapter over real hardware.
    pub force_fallback_adapter: bool,
    /// Optional label attached to the native device for debugging.
    pub label: Option<String>,
}

/// Complete presenter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenterConfig {
    pub device_options: DeviceOptions,
    pub backend: BackendKind,
    pub render_mode: RenderMode,
    pub loop_driver: LoopDriverKind,
    /// Tick interval of the timer driven loop.
    pub timer_interval: Duration,
    /// Keep the compositor driver attached in on-demand mode and let the
    /// tick throttle decide whether a frame is needed.
    pub on_demand_polling: bool,
    /// Color the target is cleared to before the scene is drawn.
    pub clear_color: Color,
}

impl Default for PresenterConfig {
    fn default() -> Self {
        Self {
            device_options: DeviceOptions::default(),
            backend: BackendKind::Gpu,
            render_mode: RenderMode::OnDemand,
            loop_driver: LoopDriverKind::Timer,
            timer_interval: Duration::from_micros(16_667),
            on_demand_polling: false,
            clear_color: Color::TRANSPARENT,
        }
    }
}

impl PresenterConfig {
    pub fn builder() -> PresenterConfigBuilder {
        PresenterConfigBuilder::default()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_TIMER_INTERVAL..=MAX_TIMER_INTERVAL).contains(&self.timer_interval) {
            return Err(ConfigError::TimerInterval(self.timer_interval));
        }
        let Color { r, g, b, a } = self.clear_color;
        if [r, g, b, a].iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(ConfigError::ClearColor(self.clear_color));
        }
        Ok(())
    }
}

/// Builder for [`PresenterConfig`].
#[derive(Debug, Clone, Default)]
pub struct PresenterConfigBuilder {
    inner: PresenterConfig,
}

impl PresenterConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut PresenterConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn device_options(self, options: DeviceOptions) -> Self { self.map(|c| c.device_options = options) }
    pub fn present_mode(self, mode: PresentMode) -> Self { self.map(|c| c.device_options.present_mode = mode) }
    pub fn power_preference(self, pref: PowerPreference) -> Self { self.map(|c| c.device_options.power_preference = pref) }
    pub fn backend(self, backend: BackendKind) -> Self { self.map(|c| c.backend = backend) }
    pub fn render_mode(self, mode: RenderMode) -> Self { self.map(|c| c.render_mode = mode) }
    pub fn loop_driver(self, kind: LoopDriverKind) -> Self { self.map(|c| c.loop_driver = kind) }
    pub fn timer_interval(self, interval: Duration) -> Self { self.map(|c| c.timer_interval = interval) }
    pub fn on_demand_polling(self, on: bool) -> Self { self.map(|c| c.on_demand_polling = on) }
    pub fn clear_color(self, color: Color) -> Self { self.map(|c| c.clear_color = color) }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut PresenterConfig)) -> Self { self.map(f) }

    /// Validate and build the final config.
    pub fn build(self) -> Result<PresenterConfig, ConfigError> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}
