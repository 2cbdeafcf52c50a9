//! Device-to-document coordinate transforms.

use crate::draw::Point;

/// On-screen box of the raster surface, in CSS/device units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceRect {
    pub left: f64,
    pub top: f64,
    /// Displayed width (may differ from the pixel buffer width)
    pub width: f64,
    /// Displayed height
    pub height: f64,
}

/// Everything needed to map pointer coordinates onto a page.
///
/// The surface may be stretched on screen independently of its pixel buffer,
/// and the pixel buffer is itself the page scaled by the viewport, so a device
/// point passes three corrections on its way to document space:
/// 1. subtract the surface's top-left offset
/// 2. multiply by pixel size / displayed size
/// 3. divide by the viewport scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceGeometry {
    pub rect: SurfaceRect,
    pub pixel_width: f64,
    pub pixel_height: f64,
    pub scale: f64,
}

impl SurfaceGeometry {
    fn ratio(pixels: f64, displayed: f64) -> f64 {
        if displayed > 0.0 && pixels > 0.0 {
            pixels / displayed
        } else {
            1.0
        }
    }

    fn effective_scale(&self) -> f64 {
        if self.scale > 0.0 { self.scale } else { 1.0 }
    }

    /// Maps a device point to document space, carrying pressure through.
    pub fn to_document(&self, client_x: f64, client_y: f64, pressure: Option<f64>) -> Point {
        let local_x = client_x - self.rect.left;
        let local_y = client_y - self.rect.top;

        let pixel_x = local_x * Self::ratio(self.pixel_width, self.rect.width);
        let pixel_y = local_y * Self::ratio(self.pixel_height, self.rect.height);

        let scale = self.effective_scale();
        Point {
            x: pixel_x / scale,
            y: pixel_y / scale,
            pressure,
        }
    }

    /// Inverse of [`to_document`](Self::to_document).
    pub fn to_device(&self, point: &Point) -> (f64, f64) {
        let scale = self.effective_scale();
        let pixel_x = point.x * scale;
        let pixel_y = point.y * scale;

        (
            pixel_x / Self::ratio(self.pixel_width, self.rect.width) + self.rect.left,
            pixel_y / Self::ratio(self.pixel_height, self.rect.height) + self.rect.top,
        )
    }
}
