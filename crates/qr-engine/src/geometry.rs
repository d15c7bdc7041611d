//! Clear-area and logo placement geometry.
//!
//! Both the vector and raster paths consume the same [`LogoPlacement`], so a
//! logo lands on the same relative position whatever the output format.

use serde::Serialize;

/// Derived placement of the white clear area and the logo box, in pixels of
/// a `size × size` symbol. Origins may be half-pixels when the free space is odd.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoPlacement {
    pub logo_size: u32,
    pub clear_width: u32,
    pub clear_height: u32,
    pub clear_x: f64,
    pub clear_y: f64,
    pub logo_x: f64,
    pub logo_y: f64,
}

impl LogoPlacement {
    pub fn compute(size: u32, logo_fraction: f64, padding_width: u32, padding_height: u32) -> Self {
        let logo_size = (f64::from(size) * logo_fraction).round().max(0.0) as u32;
        let clear_width = logo_size + 2 * padding_width;
        let clear_height = logo_size + 2 * padding_height;
        let size_f = f64::from(size);

        Self {
            logo_size,
            clear_width,
            clear_height,
            clear_x: (size_f - f64::from(clear_width)) / 2.0,
            clear_y: (size_f - f64::from(clear_height)) / 2.0,
            logo_x: (size_f - f64::from(logo_size)) / 2.0,
            logo_y: (size_f - f64::from(logo_size)) / 2.0,
        }
    }

    /// Share of the symbol area covered by the clear area.
    pub fn clear_area_ratio(&self, size: u32) -> f64 {
        let symbol = f64::from(size) * f64::from(size);
        if symbol == 0.0 {
            return 0.0;
        }
        f64::from(self.clear_width) * f64::from(self.clear_height) / symbol
    }

    /// Integer top-left corner of the clear area for pixel composition.
    pub fn clear_origin_px(&self) -> (i64, i64) {
        (self.clear_x.floor() as i64, self.clear_y.floor() as i64)
    }

    /// Integer top-left corner for an image of `width × height` centered in
    /// the logo box.
    pub fn centered_origin_px(&self, width: u32, height: u32) -> (i64, i64) {
        let cx = self.logo_x + f64::from(self.logo_size) / 2.0;
        let cy = self.logo_y + f64::from(self.logo_size) / 2.0;
        (
            (cx - f64::from(width) / 2.0).floor() as i64,
            (cy - f64::from(height) / 2.0).floor() as i64,
        )
    }
}
