//! Screen capture domain: public API.
//!
//! This module owns display enumeration, per-display capture, compositing
//! the virtual desktop and cropping the user's selection out of it.
//! External code should only use the items exported here.

mod region;
mod screenshot;
mod selection;

pub use region::{crop_frames, desktop_bounds, scaled_region, CropError, PixelRect, VirtualDesktop};
pub use screenshot::{capture_frames, XcapDisplaySource};
pub use selection::{SelectionCoordinator, SelectionSurface};

use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Position and size of a display in the virtual desktop, in logical units.
/// `x`/`y` may be negative for displays left of or above the primary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayBounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl DisplayBounds {
    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x as f64 && x < self.right() as f64 && y >= self.y as f64 && y < self.bottom() as f64
    }
}

/// Descriptor for one attached display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplayInfo {
    pub id: u32,
    pub bounds: DisplayBounds,
    pub scale_factor: f32,
    pub is_primary: bool,
}

/// The rectangle the user dragged, in logical coordinates of the virtual desktop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CaptureRegion {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// One display's bitmap at its native resolution.
#[derive(Clone, Debug)]
pub struct DisplayFrame {
    pub display: DisplayInfo,
    pub image: RgbaImage,
}

/// What the capturer produced for a single snip.
#[derive(Clone, Debug)]
pub enum CapturedFrames {
    /// Every display captured; will be composited before cropping.
    Displays(Vec<DisplayFrame>),
    /// Only the primary display; cropped directly without offset translation.
    Single(DisplayFrame),
}

impl CapturedFrames {
    /// Scale factor used for cropping: the primary display's, always.
    pub fn primary_scale_factor(&self) -> f32 {
        match self {
            CapturedFrames::Single(frame) => frame.display.scale_factor,
            CapturedFrames::Displays(frames) => frames
                .iter()
                .find(|f| f.display.is_primary)
                .or_else(|| frames.first())
                .map(|f| f.display.scale_factor)
                .unwrap_or(1.0),
        }
    }
}

/// Display enumeration and per-display capture, supplied by the platform.
pub trait DisplaySource: Send + Sync {
    fn displays(&self) -> Result<Vec<DisplayInfo>, CaptureError>;

    fn capture_display(&self, id: u32) -> Result<RgbaImage, CaptureError>;

    /// Captures the primary display, or the first one if none reports as primary.
    fn capture_primary(&self) -> Result<DisplayFrame, CaptureError> {
        let displays = self.displays()?;
        let display = displays
            .iter()
            .find(|d| d.is_primary)
            .or_else(|| displays.first())
            .cloned()
            .ok_or(CaptureError::NoPrimaryMonitor)?;
        let image = self.capture_display(display.id)?;
        Ok(DisplayFrame { display, image })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Failed to enumerate monitors: {0}")]
    MonitorEnumeration(String),

    #[error("No primary monitor found")]
    NoPrimaryMonitor,

    #[error("Display {0} is no longer attached")]
    UnknownDisplay(u32),

    #[error("Screen capture failed: {0}")]
    CaptureFailed(String),
}
