//! Scene description recorded by the host for a single frame.
//!
//! A [`Scene`] is the list of [`DisplayItem`] commands the scene-fill
//! callback records for one frame. It is handed to the
//! [`PresentSurface`](crate::render::backend::PresentSurface) which turns it
//! into native draw calls. The presenter itself never interprets the items.
//!
//! # Example
//!
//! ```rust
//! use swapchain_presenter::render::{Color, DisplayItem, PixelSize, Scene};
//!
//! let mut scene = Scene::new(PixelSize::new(320, 200));
//!
//! // Clear background
//! scene.push(DisplayItem::Clear { color: Color::from_u8(0, 0, 0, 255) });
//!
//! // Draw a white rectangle
//! scene.push(DisplayItem::Rect {
//!     x: 10.0,
//!     y: 20.0,
//!     w: 100.0,
//!     h: 50.0,
//!     color: Color::from_u8(255, 255, 255, 255),
//! });
//! assert_eq!(scene.len(), 2);
//! ```

use crate::render::backend::PixelSize;
use serde::{Deserialize, Serialize};

/// RGBA color used for drawing commands.
///
/// Channels are represented as `f32` in the range `0.0 ..= 1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red channel
    pub r: f32,
    /// Green channel
    pub g: f32,
    /// Blue channel
    pub b: f32,
    /// Alpha channel (opacity)
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };

    /// Creates a new color from `f32` channel values in the range `0.0 ..= 1.0`.
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Color {
        Color { r, g, b, a }
    }

    /// Creates a new color from `u8` channel values in the range `0 ..= 255`.
    pub fn from_u8(r: u8, g: u8, b: u8, a: u8) -> Color {
        Color {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: a as f32 / 255.0,
        }
    }

    /// Returns the color packed as premultiplied `[r, g, b, a]` bytes.
    pub fn to_premul_u8(&self) -> [u8; 4] {
        let a = self.a.clamp(0.0, 1.0);
        let ch = |c: f32| (c.clamp(0.0, 1.0) * a * 255.0).round() as u8;
        [ch(self.r), ch(self.g), ch(self.b), (a * 255.0).round() as u8]
    }
}

/// A single drawing command.
#[derive(Clone, Debug, PartialEq)]
pub enum DisplayItem {
    /// Clear the entire surface with the given color.
    Clear {
        /// The color to clear the surface with.
        color: Color,
    },

    /// Draw a filled rectangle at `(x, y)` with width `w` and height `h`.
    Rect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: Color,
    },

    /// Draw a text run at `(x, y)` with font size `size`.
    TextRun {
        x: f32,
        y: f32,
        text: String,
        size: f32,
        color: Color,
    },
}

/// Drawing commands recorded for one frame, together with the pixel size
/// they were recorded for.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    size: PixelSize,
    items: Vec<DisplayItem>,
}

impl Scene {
    /// Creates a new, empty scene for a target of the given size.
    pub fn new(size: PixelSize) -> Self {
        Self { size, items: Vec::new() }
    }

    /// Size of the target the scene is recorded for.
    pub fn size(&self) -> PixelSize {
        self.size
    }

    /// Appends a drawing command.
    pub fn push(&mut self, item: DisplayItem) {
        self.items.push(item);
    }

    pub fn items(&self) -> &[DisplayItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Removes all recorded commands, keeping the target size.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}
