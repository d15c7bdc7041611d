//! Generation request parameters and their bounds.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::geometry::LogoPlacement;
use crate::{OutputFormat, PipelineError};

pub const TEXT_CHARS: RangeInclusive<usize> = 1..=2000;
pub const SIZE_PX: RangeInclusive<u32> = 100..=1000;
pub const QUALITY: RangeInclusive<u8> = 1..=100;
pub const LOGO_SIZE_FRACTION: RangeInclusive<f64> = 0.1..=0.3;
pub const LOGO_PADDING_PX: RangeInclusive<u32> = 0..=50;

pub const DEFAULT_SIZE: u32 = 300;
pub const DEFAULT_QUALITY: u8 = 90;
pub const DEFAULT_LOGO_SIZE: f64 = 0.2;
pub const DEFAULT_LOGO_PADDING: u32 = 15;

/// Largest share of the symbol area the clear area may cover.
pub const MAX_CLEAR_AREA_RATIO: f64 = 0.4;

/// Parameters of a single QR generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub text: String,
    pub size: u32,
    pub format: OutputFormat,
    pub quality: u8,
    /// Logo edge length as a fraction of `size`.
    pub logo_size: f64,
    pub logo_padding_width: u32,
    pub logo_padding_height: u32,
}

impl GenerationRequest {
    /// Request for `text` with every other option at its default.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            size: DEFAULT_SIZE,
            format: OutputFormat::Png,
            quality: DEFAULT_QUALITY,
            logo_size: DEFAULT_LOGO_SIZE,
            logo_padding_width: DEFAULT_LOGO_PADDING,
            logo_padding_height: DEFAULT_LOGO_PADDING,
        }
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_logo_geometry(mut self, logo_size: f64, padding_width: u32, padding_height: u32) -> Self {
        self.logo_size = logo_size;
        self.logo_padding_width = padding_width;
        self.logo_padding_height = padding_height;
        self
    }

    /// Placement of the clear area and logo for this request.
    pub fn placement(&self) -> LogoPlacement {
        LogoPlacement::compute(
            self.size,
            self.logo_size,
            self.logo_padding_width,
            self.logo_padding_height,
        )
    }

    /// Check every field against its bound. Logo geometry is only checked
    /// against the symbol when a logo will actually be drawn.
    pub fn validate(&self, has_logo: bool) -> Result<(), PipelineError> {
        let chars = self.text.chars().count();
        if !TEXT_CHARS.contains(&chars) {
            return Err(invalid(format!(
                "text must be {}-{} characters (got {chars})",
                TEXT_CHARS.start(),
                TEXT_CHARS.end()
            )));
        }
        if !SIZE_PX.contains(&self.size) {
            return Err(invalid(format!(
                "size must be between {} and {} px",
                SIZE_PX.start(),
                SIZE_PX.end()
            )));
        }
        if !QUALITY.contains(&self.quality) {
            return Err(invalid(format!(
                "quality must be between {} and {}",
                QUALITY.start(),
                QUALITY.end()
            )));
        }
        if !self.logo_size.is_finite() || !LOGO_SIZE_FRACTION.contains(&self.logo_size) {
            return Err(invalid(format!(
                "logoSize must be between {} and {}",
                LOGO_SIZE_FRACTION.start(),
                LOGO_SIZE_FRACTION.end()
            )));
        }
        for (name, value) in [
            ("logoPaddingWidth", self.logo_padding_width),
            ("logoPaddingHeight", self.logo_padding_height),
        ] {
            if !LOGO_PADDING_PX.contains(&value) {
                return Err(invalid(format!(
                    "{name} must be between {} and {} px",
                    LOGO_PADDING_PX.start(),
                    LOGO_PADDING_PX.end()
                )));
            }
        }

        if has_logo {
            let placement = self.placement();
            if placement.clear_width > self.size || placement.clear_height > self.size {
                return Err(invalid(format!(
                    "logo clear area {}x{} px does not fit in a {} px symbol",
                    placement.clear_width, placement.clear_height, self.size
                )));
            }
            let ratio = placement.clear_area_ratio(self.size);
            if ratio > MAX_CLEAR_AREA_RATIO {
                return Err(invalid(format!(
                    "logo clear area covers {:.0}% of the symbol (max {:.0}%)",
                    ratio * 100.0,
                    MAX_CLEAR_AREA_RATIO * 100.0
                )));
            }
        }

        Ok(())
    }
}

fn invalid(message: String) -> PipelineError {
    PipelineError::Validation(message)
}
