use tracing::debug;

use crate::backend::{GpuDevice, SurfaceHost};
use crate::error::GridScanError;

/// Device pixel ratios above this are clamped to bound fill-rate cost.
pub const MAX_PIXEL_RATIO: f64 = 2.0;

/// Physical drawable size plus the container size and pixel ratio it was
/// derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceMetrics {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
    /// Container size in logical pixels.
    pub logical_width: f32,
    pub logical_height: f32,
}

impl SurfaceMetrics {
    /// Derives physical metrics from logical bounds, or `None` when the bounds
    /// cannot back a drawable surface.
    pub fn from_logical(width: f64, height: f64, pixel_ratio: f64) -> Option<Self> {
        if !width.is_finite() || !height.is_finite() || width <= 0.0 || height <= 0.0 {
            return None;
        }
        let ratio = clamp_pixel_ratio(pixel_ratio);
        let physical_w = (width * ratio).round().max(1.0);
        let physical_h = (height * ratio).round().max(1.0);
        Some(Self {
            width: physical_w.min(f64::from(u32::MAX)) as u32,
            height: physical_h.min(f64::from(u32::MAX)) as u32,
            pixel_ratio: ratio as f32,
            logical_width: width as f32,
            logical_height: height as f32,
        })
    }

    /// Same physical drawable and ratio; the logical size may still differ.
    pub fn same_drawable(&self, other: &SurfaceMetrics) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.pixel_ratio == other.pixel_ratio
    }
}

pub(crate) fn clamp_pixel_ratio(ratio: f64) -> f64 {
    if ratio.is_finite() && ratio > 0.0 {
        ratio.min(MAX_PIXEL_RATIO)
    } else {
        1.0
    }
}

/// Drawable region backed by a GPU context.
pub struct RenderSurface<D: GpuDevice> {
    device: Option<D>,
    metrics: SurfaceMetrics,
}

impl<D: GpuDevice> RenderSurface<D> {
    /// Sizes a surface to the host's current bounds and creates its GPU context.
    ///
    /// A collapsed container still gets a 1x1 surface; the first real resize
    /// corrects it before anything meaningful is drawn.
    pub fn create<H>(host: &H) -> Result<Self, GridScanError>
    where
        H: SurfaceHost<Device = D>,
    {
        let (width, height) = host.bounds();
        let ratio = host.device_pixel_ratio();
        let metrics = SurfaceMetrics::from_logical(width, height, ratio).unwrap_or_else(|| {
            debug!(width, height, "container has no drawable area yet; starting at 1x1");
            let ratio = clamp_pixel_ratio(ratio) as f32;
            SurfaceMetrics {
                width: 1,
                height: 1,
                pixel_ratio: ratio,
                logical_width: 1.0 / ratio,
                logical_height: 1.0 / ratio,
            }
        });
        let device = host.create_device(metrics.width, metrics.height)?;
        debug!(
            width = metrics.width,
            height = metrics.height,
            pixel_ratio = metrics.pixel_ratio,
            "created render surface"
        );
        Ok(Self {
            device: Some(device),
            metrics,
        })
    }

    pub fn metrics(&self) -> SurfaceMetrics {
        self.metrics
    }

    /// Applies new logical bounds.
    ///
    /// Returns `Ok(true)` when the container size or drawable changed, `Ok(false)` when it was
    /// already that size, and `DegenerateResize` for collapsed or invalid
    /// bounds, in which case the previous size is kept.
    pub fn resize(&mut self, width: f64, height: f64, pixel_ratio: f64) -> Result<bool, GridScanError> {
        let Some(next) = SurfaceMetrics::from_logical(width, height, pixel_ratio) else {
            return Err(GridScanError::DegenerateResize { width, height });
        };
        if next == self.metrics {
            return Ok(false);
        }
        let reconfigure = !next.same_drawable(&self.metrics);
        self.metrics = next;
        if reconfigure {
            if let Some(device) = self.device.as_mut() {
                device.configure(next.width, next.height);
            }
        }
        Ok(true)
    }

    /// Reconfigures the device at the current size, e.g. after the
    /// presentable surface was lost.
    pub fn reconfigure(&mut self) {
        let SurfaceMetrics { width, height, .. } = self.metrics;
        if let Some(device) = self.device.as_mut() {
            device.configure(width, height);
        }
    }

    pub fn device(&self) -> Option<&D> {
        self.device.as_ref()
    }

    pub fn device_mut(&mut self) -> Option<&mut D> {
        self.device.as_mut()
    }

    pub fn is_disposed(&self) -> bool {
        self.device.is_none()
    }

    /// Releases the GPU context. Safe to call more than once.
    pub fn dispose(&mut self) {
        if let Some(device) = self.device.take() {
            drop(device);
            debug!("disposed render surface");
        }
    }
}

impl<D: GpuDevice> Drop for RenderSurface<D> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_ratio_is_capped() {
        let metrics = SurfaceMetrics::from_logical(100.0, 50.0, 3.0).unwrap();
        assert_eq!(metrics.width, 200);
        assert_eq!(metrics.height, 100);
        assert_eq!(metrics.pixel_ratio, 2.0);
    }

    #[test]
    fn invalid_ratio_falls_back_to_one() {
        let metrics = SurfaceMetrics::from_logical(640.0, 480.0, f64::NAN).unwrap();
        assert_eq!((metrics.width, metrics.height), (640, 480));
        assert_eq!(metrics.pixel_ratio, 1.0);
    }

    #[test]
    fn degenerate_bounds_have_no_metrics() {
        assert!(SurfaceMetrics::from_logical(0.0, 10.0, 1.0).is_none());
        assert!(SurfaceMetrics::from_logical(10.0, -1.0, 1.0).is_none());
        assert!(SurfaceMetrics::from_logical(f64::INFINITY, 10.0, 1.0).is_none());
    }

    #[test]
    fn fractional_bounds_round_to_whole_pixels() {
        let metrics = SurfaceMetrics::from_logical(100.4, 0.2, 1.5).unwrap();
        assert_eq!(metrics.width, 151);
        assert_eq!(metrics.height, 1);
        assert_eq!(metrics.logical_width, 100.4);
    }

    #[test]
    fn container_size_is_kept_alongside_the_drawable() {
        let metrics = SurfaceMetrics::from_logical(640.0, 480.0, 2.0).unwrap();
        assert_eq!((metrics.width, metrics.height), (1280, 960));
        assert_eq!((metrics.logical_width, metrics.logical_height), (640.0, 480.0));
    }
}
