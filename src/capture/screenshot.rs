//! Per-display capture using the `xcap` crate.
//!
//! This is the infrastructure layer: it talks to the OS. Everything
//! downstream only sees `DisplaySource`, so tests swap in synthetic frames.

use super::{CaptureError, CapturedFrames, DisplayBounds, DisplayFrame, DisplayInfo, DisplaySource};
use image::RgbaImage;
use xcap::Monitor;

/// `DisplaySource` backed by the platform screen capture APIs.
#[derive(Clone, Copy, Debug, Default)]
pub struct XcapDisplaySource;

impl DisplaySource for XcapDisplaySource {
    fn displays(&self) -> Result<Vec<DisplayInfo>, CaptureError> {
        let monitors = Monitor::all().map_err(enumeration_error)?;
        monitors.iter().map(describe_monitor).collect()
    }

    fn capture_display(&self, id: u32) -> Result<RgbaImage, CaptureError> {
        let monitors = Monitor::all().map_err(enumeration_error)?;
        let monitor = monitors
            .into_iter()
            .find(|m| m.id().map(|mid| mid == id).unwrap_or(false))
            .ok_or(CaptureError::UnknownDisplay(id))?;

        monitor
            .capture_image()
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))
    }
}

fn enumeration_error(e: impl std::fmt::Display) -> CaptureError {
    CaptureError::MonitorEnumeration(e.to_string())
}

fn describe_monitor(monitor: &Monitor) -> Result<DisplayInfo, CaptureError> {
    Ok(DisplayInfo {
        id: monitor.id().map_err(enumeration_error)?,
        bounds: DisplayBounds {
            x: monitor.x().map_err(enumeration_error)?,
            y: monitor.y().map_err(enumeration_error)?,
            width: monitor.width().map_err(enumeration_error)?,
            height: monitor.height().map_err(enumeration_error)?,
        },
        scale_factor: monitor.scale_factor().unwrap_or(1.0),
        is_primary: monitor.is_primary().unwrap_or(false),
    })
}

/// Captures every attached display, falling back to the primary display alone
/// when multi-display capture fails.
///
/// With a single display attached the result is always `CapturedFrames::Single`.
/// The fallback is logged but otherwise invisible to the caller; an error is
/// only returned when the primary-display capture fails too.
pub fn capture_frames(source: &dyn DisplaySource) -> Result<CapturedFrames, CaptureError> {
    let start = std::time::Instant::now();

    let frames = match capture_every_display(source) {
        Ok(frames) if frames.len() > 1 => CapturedFrames::Displays(frames),
        Ok(mut frames) if frames.len() == 1 => match frames.pop() {
            Some(frame) => CapturedFrames::Single(frame),
            None => CapturedFrames::Single(source.capture_primary()?),
        },
        Ok(_) => {
            log::warn!("[CAPTURE] No displays enumerated, trying primary display");
            CapturedFrames::Single(source.capture_primary()?)
        }
        Err(e) => {
            log::warn!(
                "[CAPTURE] Multi-display capture failed ({}), falling back to primary display",
                e
            );
            CapturedFrames::Single(source.capture_primary()?)
        }
    };

    let count = match &frames {
        CapturedFrames::Displays(f) => f.len(),
        CapturedFrames::Single(_) => 1,
    };
    log::info!(
        "[CAPTURE] Captured {} display(s) in {}ms",
        count,
        start.elapsed().as_millis()
    );

    Ok(frames)
}

fn capture_every_display(source: &dyn DisplaySource) -> Result<Vec<DisplayFrame>, CaptureError> {
    let displays = source.displays()?;
    let mut frames = Vec::with_capacity(displays.len());
    for display in displays {
        let image = source.capture_display(display.id)?;
        log::debug!(
            "[CAPTURE] Display {} at ({},{}) {}x{} scale {} -> {}x{} px",
            display.id,
            display.bounds.x,
            display.bounds.y,
            display.bounds.width,
            display.bounds.height,
            display.scale_factor,
            image.width(),
            image.height()
        );
        frames.push(DisplayFrame { display, image });
    }
    Ok(frames)
}
