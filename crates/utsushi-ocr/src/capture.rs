use utsushi_types::{CaptureRegion, RawImage};

use crate::selection::{CaptureError, ScreenGrabber};

/// Deterministic desktop of a fixed size, for headless runs and tests.
///
/// Pixels are a gradient of their desktop coordinates.
pub struct SyntheticGrabber {
    bounds: CaptureRegion,
}

impl SyntheticGrabber {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            bounds: CaptureRegion {
                x: 0,
                y: 0,
                width,
                height,
            },
        }
    }
}

impl Default for SyntheticGrabber {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

impl ScreenGrabber for SyntheticGrabber {
    fn desktop_bounds(&self) -> Result<CaptureRegion, CaptureError> {
        Ok(self.bounds)
    }

    fn grab(&self, region: CaptureRegion) -> Result<RawImage, CaptureError> {
        let visible = self
            .bounds
            .intersection(&region)
            .ok_or(CaptureError::OutOfBounds(region))?;

        let mut image = RawImage::blank(visible.width, visible.height);
        for (i, pixel) in image.data.chunks_exact_mut(RawImage::CHANNELS).enumerate() {
            let x = visible.x + (i as u32 % visible.width) as i32;
            let y = visible.y + (i as u32 / visible.width) as i32;
            pixel.copy_from_slice(&[x as u8, y as u8, (x ^ y) as u8, u8::MAX]);
        }
        Ok(image)
    }
}

/// All connected monitors, composited into one desktop.
#[cfg(feature = "xcap")]
pub struct XcapGrabber;

#[cfg(feature = "xcap")]
impl ScreenGrabber for XcapGrabber {
    fn desktop_bounds(&self) -> Result<CaptureRegion, CaptureError> {
        let monitors = xcap::Monitor::all().map_err(|e| CaptureError::Grab(e.to_string()))?;
        monitors
            .iter()
            .map(monitor_region)
            .reduce(|a, b| a.union(&b))
            .ok_or(CaptureError::NoDisplay)
    }

    fn grab(&self, region: CaptureRegion) -> Result<RawImage, CaptureError> {
        use xcap::image::{RgbaImage, imageops};

        let monitors = xcap::Monitor::all().map_err(|e| CaptureError::Grab(e.to_string()))?;
        let mut canvas = RgbaImage::new(region.width, region.height);
        let mut covered = false;

        for monitor in &monitors {
            let screen = monitor_region(monitor);
            let Some(overlap) = screen.intersection(&region) else {
                continue;
            };
            let image = monitor
                .capture_image()
                .map_err(|e| CaptureError::Grab(e.to_string()))?;
            let cropped = imageops::crop_imm(
                &image,
                (overlap.x - screen.x) as u32,
                (overlap.y - screen.y) as u32,
                overlap.width,
                overlap.height,
            )
            .to_image();
            imageops::replace(
                &mut canvas,
                &cropped,
                i64::from(overlap.x - region.x),
                i64::from(overlap.y - region.y),
            );
            covered = true;
        }

        if !covered {
            return Err(CaptureError::OutOfBounds(region));
        }
        Ok(RawImage {
            width: canvas.width(),
            height: canvas.height(),
            data: canvas.into_raw(),
        })
    }
}

#[cfg(feature = "xcap")]
fn monitor_region(monitor: &xcap::Monitor) -> CaptureRegion {
    CaptureRegion {
        x: monitor.x(),
        y: monitor.y(),
        width: monitor.width(),
        height: monitor.height(),
    }
}
