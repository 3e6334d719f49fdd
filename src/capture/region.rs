//! Pure compositing and cropping logic, the functional core.
//!
//! This module has zero infrastructure dependencies.
//! It takes pixel data in, returns pixel data out.

use super::{CaptureRegion, CapturedFrames, DisplayFrame, DisplayInfo};
use image::{imageops, RgbaImage};

/// Largest crop edge we will allocate, in physical pixels.
const MAX_CROP_EDGE: u32 = 16_384;

/// Union of all display bounds in logical coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VirtualDesktop {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl VirtualDesktop {
    pub fn width(&self) -> u32 {
        (self.max_x - self.min_x).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.max_y - self.min_y).max(0) as u32
    }
}

/// A crop rectangle in physical pixels of the source bitmap.
/// `x`/`y` may fall outside the bitmap; only the overlap is copied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

/// Computes the union of all display bounds. `None` when no displays are given.
pub fn desktop_bounds(displays: &[DisplayInfo]) -> Option<VirtualDesktop> {
    let first = displays.first()?;
    let mut desktop = VirtualDesktop {
        min_x: first.bounds.x,
        min_y: first.bounds.y,
        max_x: first.bounds.right(),
        max_y: first.bounds.bottom(),
    };
    for display in &displays[1..] {
        desktop.min_x = desktop.min_x.min(display.bounds.x);
        desktop.min_y = desktop.min_y.min(display.bounds.y);
        desktop.max_x = desktop.max_x.max(display.bounds.right());
        desktop.max_y = desktop.max_y.max(display.bounds.bottom());
    }
    Some(desktop)
}

/// Translates a logical selection into physical pixels of a canvas whose
/// origin sits at `origin`, scaling every component by `dpr`.
pub fn scaled_region(region: &CaptureRegion, origin: (i32, i32), dpr: f64) -> PixelRect {
    PixelRect {
        x: ((region.x - origin.0 as f64) * dpr).round() as i64,
        y: ((region.y - origin.1 as f64) * dpr).round() as i64,
        width: (region.width * dpr).round().max(0.0) as u32,
        height: (region.height * dpr).round().max(0.0) as u32,
    }
}

/// Stitches per-display bitmaps into one canvas covering the virtual desktop.
///
/// The canvas lives in physical pixels at `dpr`, the same space the crop
/// rectangle is scaled into: its size is the desktop size times `dpr` and each
/// bitmap is placed at `(display.x - min_x, display.y - min_y) * dpr`.
/// Anything hanging past the canvas edge is clipped.
fn compose(frames: &[DisplayFrame], desktop: &VirtualDesktop, dpr: f64) -> RgbaImage {
    let scale = |logical: f64| (logical * dpr).round();
    let mut canvas = RgbaImage::new(
        scale(desktop.width() as f64) as u32,
        scale(desktop.height() as f64) as u32,
    );
    for frame in frames {
        let offset_x = scale((frame.display.bounds.x - desktop.min_x) as f64) as i64;
        let offset_y = scale((frame.display.bounds.y - desktop.min_y) as f64) as i64;
        imageops::replace(&mut canvas, &frame.image, offset_x, offset_y);
    }
    canvas
}

/// Copies `rect` out of `image` into a buffer of exactly `rect`'s size.
/// Parts of `rect` outside the image stay transparent.
fn crop_rgba(image: &RgbaImage, rect: PixelRect) -> Result<RgbaImage, CropError> {
    if rect.width == 0 || rect.height == 0 {
        return Err(CropError::ZeroDimension);
    }
    if rect.width > MAX_CROP_EDGE || rect.height > MAX_CROP_EDGE {
        return Err(CropError::TooLarge {
            width: rect.width,
            height: rect.height,
        });
    }

    let (img_width, img_height) = (image.width() as i64, image.height() as i64);
    let overlaps = rect.x < img_width
        && rect.y < img_height
        && rect.x + rect.width as i64 > 0
        && rect.y + rect.height as i64 > 0;
    if !overlaps {
        return Err(CropError::OutOfBounds {
            requested: (rect.x, rect.y, rect.width, rect.height),
            image_size: (image.width(), image.height()),
        });
    }

    let mut cropped = RgbaImage::new(rect.width, rect.height);
    imageops::replace(&mut cropped, image, -rect.x, -rect.y);
    Ok(cropped)
}

/// Crops the user's selection out of whatever the capturer produced.
///
/// Multi-display captures are composited first and the region is translated
/// by the desktop origin. The single-display fallback is cropped directly.
/// Both paths scale by the primary display's DPR, even when the selection
/// lies on a display with a different scale factor.
pub fn crop_frames(frames: &CapturedFrames, region: &CaptureRegion) -> Result<RgbaImage, CropError> {
    let start = std::time::Instant::now();
    let dpr = frames.primary_scale_factor() as f64;

    let cropped = match frames {
        CapturedFrames::Displays(list) => {
            let displays: Vec<DisplayInfo> = list.iter().map(|f| f.display.clone()).collect();
            let desktop = desktop_bounds(&displays).ok_or(CropError::NoFrames)?;
            warn_on_mixed_dpi(&displays, region, dpr);

            let canvas = compose(list, &desktop, dpr);
            let rect = scaled_region(region, (desktop.min_x, desktop.min_y), dpr);
            log::debug!(
                "[CAPTURE] Desktop {:?}, canvas {}x{}, crop {:?}",
                desktop,
                canvas.width(),
                canvas.height(),
                rect
            );
            crop_rgba(&canvas, rect)?
        }
        CapturedFrames::Single(frame) => {
            let rect = scaled_region(region, (0, 0), dpr);
            log::debug!(
                "[CAPTURE] Single frame {}x{}, crop {:?}",
                frame.image.width(),
                frame.image.height(),
                rect
            );
            crop_rgba(&frame.image, rect)?
        }
    };

    log::info!(
        "[CAPTURE] Cropped region ({}x{} at {},{}) to {}x{} px in {}ms",
        region.width,
        region.height,
        region.x,
        region.y,
        cropped.width(),
        cropped.height(),
        start.elapsed().as_millis()
    );
    Ok(cropped)
}

fn warn_on_mixed_dpi(displays: &[DisplayInfo], region: &CaptureRegion, dpr: f64) {
    let (cx, cy) = region.center();
    if let Some(target) = displays.iter().find(|d| d.bounds.contains(cx, cy)) {
        if (target.scale_factor as f64 - dpr).abs() > f64::EPSILON {
            log::debug!(
                "[CAPTURE] Selection sits on display {} (scale {}) but is scaled by primary DPR {}",
                target.id,
                target.scale_factor,
                dpr
            );
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CropError {
    #[error("Crop rectangle has zero width or height")]
    ZeroDimension,

    #[error("Crop rectangle {width}x{height} exceeds the maximum edge length")]
    TooLarge { width: u32, height: u32 },

    #[error(
        "Crop rectangle ({},{},{},{}) lies outside image bounds ({}x{})",
        requested.0, requested.1, requested.2, requested.3,
        image_size.0, image_size.1
    )]
    OutOfBounds {
        requested: (i64, i64, u32, u32),
        image_size: (u32, u32),
    },

    #[error("No captured frames to crop from")]
    NoFrames,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::DisplayBounds;
    use image::Rgba;

    fn frame(id: u32, x: i32, y: i32, w: u32, h: u32, color: [u8; 4], primary: bool) -> DisplayFrame {
        DisplayFrame {
            display: DisplayInfo {
                id,
                bounds: DisplayBounds { x, y, width: w, height: h },
                scale_factor: 1.0,
                is_primary: primary,
            },
            image: RgbaImage::from_pixel(w, h, Rgba(color)),
        }
    }

    #[test]
    fn desktop_bounds_covers_negative_offsets() {
        let frames = [
            frame(1, 0, 0, 100, 50, [0; 4], true),
            frame(2, -80, -20, 80, 60, [0; 4], false),
        ];
        let displays: Vec<_> = frames.iter().map(|f| f.display.clone()).collect();
        let desktop = desktop_bounds(&displays).unwrap();
        assert_eq!(desktop, VirtualDesktop { min_x: -80, min_y: -20, max_x: 100, max_y: 50 });
        assert_eq!((desktop.width(), desktop.height()), (180, 70));
    }

    #[test]
    fn desktop_bounds_empty_is_none() {
        assert!(desktop_bounds(&[]).is_none());
    }

    #[test]
    fn scaled_region_rounds_after_scaling() {
        let region = CaptureRegion::new(10.3, 20.0, 5.5, 7.25);
        let rect = scaled_region(&region, (-10, 0), 2.0);
        assert_eq!(rect, PixelRect { x: 41, y: 40, width: 11, height: 15 });
    }

    #[test]
    fn crop_picks_pixels_from_the_right_display() {
        let red = [255, 0, 0, 255];
        let blue = [0, 0, 255, 255];
        let frames = CapturedFrames::Displays(vec![
            frame(1, 0, 0, 100, 50, red, true),
            frame(2, -80, 0, 80, 50, blue, false),
        ]);

        // Logical -70..-60 lies on the left (blue) display.
        let left = crop_frames(&frames, &CaptureRegion::new(-70.0, 5.0, 10.0, 10.0)).unwrap();
        assert_eq!(left.dimensions(), (10, 10));
        assert_eq!(left.get_pixel(0, 0).0, blue);

        let right = crop_frames(&frames, &CaptureRegion::new(10.0, 5.0, 10.0, 10.0)).unwrap();
        assert_eq!(right.get_pixel(9, 9).0, red);
    }

    #[test]
    fn high_dpi_displays_composite_at_native_resolution() {
        let red = [255, 0, 0, 255];
        let blue = [0, 0, 255, 255];
        let retina = |id, x, color, primary| {
            let mut f = frame(id, x, 0, 100, 100, color, primary);
            f.display.scale_factor = 2.0;
            f.image = RgbaImage::from_pixel(200, 200, Rgba(color));
            f
        };
        let frames = CapturedFrames::Displays(vec![
            retina(1, 0, red, true),
            retina(2, 100, blue, false),
        ]);

        // Right-hand display, well past the first logical quarter.
        let secondary = crop_frames(&frames, &CaptureRegion::new(150.0, 50.0, 20.0, 20.0)).unwrap();
        assert_eq!(secondary.dimensions(), (40, 40));
        assert_eq!(secondary.get_pixel(0, 0).0, blue);
        assert_eq!(secondary.get_pixel(39, 39).0, blue);

        // Lower-right part of the primary.
        let primary = crop_frames(&frames, &CaptureRegion::new(60.0, 60.0, 20.0, 20.0)).unwrap();
        assert_eq!(primary.dimensions(), (40, 40));
        assert_eq!(primary.get_pixel(39, 39).0, red);

        // A selection straddling the seam picks up both displays.
        let seam = crop_frames(&frames, &CaptureRegion::new(90.0, 10.0, 20.0, 20.0)).unwrap();
        assert_eq!(seam.get_pixel(0, 0).0, red);
        assert_eq!(seam.get_pixel(39, 0).0, blue);
    }

    #[test]
    fn single_frame_crop_ignores_desktop_origin() {
        let mut f = frame(1, -500, -500, 40, 40, [9, 9, 9, 255], true);
        f.display.scale_factor = 2.0;
        f.image = RgbaImage::from_pixel(80, 80, Rgba([9, 9, 9, 255]));
        let frames = CapturedFrames::Single(f);
        let cropped = crop_frames(&frames, &CaptureRegion::new(5.0, 5.0, 10.0, 10.0)).unwrap();
        assert_eq!(cropped.dimensions(), (20, 20));
    }

    #[test]
    fn crop_keeps_requested_size_when_partially_outside() {
        let frames = CapturedFrames::Single(frame(1, 0, 0, 20, 20, [1, 2, 3, 255], true));
        let cropped = crop_frames(&frames, &CaptureRegion::new(15.0, 15.0, 10.0, 10.0)).unwrap();
        assert_eq!(cropped.dimensions(), (10, 10));
        assert_eq!(cropped.get_pixel(0, 0).0, [1, 2, 3, 255]);
        assert_eq!(cropped.get_pixel(9, 9).0, [0, 0, 0, 0]);
    }

    #[test]
    fn crop_zero_dimension_fails() {
        let frames = CapturedFrames::Single(frame(1, 0, 0, 20, 20, [0; 4], true));
        let result = crop_frames(&frames, &CaptureRegion::new(0.0, 0.0, 0.0, 10.0));
        assert!(matches!(result, Err(CropError::ZeroDimension)));
    }

    #[test]
    fn crop_out_of_bounds_fails() {
        let frames = CapturedFrames::Single(frame(1, 0, 0, 20, 20, [0; 4], true));
        let result = crop_frames(&frames, &CaptureRegion::new(30.0, 30.0, 5.0, 5.0));
        assert!(matches!(result, Err(CropError::OutOfBounds { .. })));
    }
}
