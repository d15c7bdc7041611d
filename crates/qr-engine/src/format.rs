//! Output formats and their file/MIME mapping.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::PipelineError;

/// Requested output format. `jpg` and `jpeg` are kept apart so the stored
/// file keeps the extension the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Jpg,
    Jpeg,
    Webp,
    Svg,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 5] = [
        OutputFormat::Png,
        OutputFormat::Jpg,
        OutputFormat::Jpeg,
        OutputFormat::Webp,
        OutputFormat::Svg,
    ];

    /// Parse a format name, case-insensitively. Returns `None` for anything
    /// outside the supported set.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" => Some(Self::Jpg),
            "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::Webp),
            "svg" => Some(Self::Svg),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
            Self::Webp => "webp",
            Self::Svg => "svg",
        }
    }

    pub fn extension(self) -> &'static str {
        self.as_str()
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpg | Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
            Self::Svg => "image/svg+xml",
        }
    }

    pub fn is_vector(self) -> bool {
        matches!(self, Self::Svg)
    }

    /// Whether the `quality` option affects the final encoding.
    pub fn is_lossy(self) -> bool {
        matches!(self, Self::Jpg | Self::Jpeg | Self::Webp)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            PipelineError::Validation(format!(
                "format must be one of: png, jpg, jpeg, webp, svg (got '{s}')"
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(OutputFormat::parse("PNG"), Some(OutputFormat::Png));
        assert_eq!(OutputFormat::parse(" Jpeg "), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::parse("gif"), None);
    }

    #[test]
    fn content_types() {
        assert_eq!(OutputFormat::Png.content_type(), "image/png");
        assert_eq!(OutputFormat::Jpg.content_type(), "image/jpeg");
        assert_eq!(OutputFormat::Jpeg.content_type(), "image/jpeg");
        assert_eq!(OutputFormat::Webp.content_type(), "image/webp");
        assert_eq!(OutputFormat::Svg.content_type(), "image/svg+xml");
    }

    #[test]
    fn from_str_rejects_unknown_as_validation_error() {
        let err = "bmp".parse::<OutputFormat>().unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
    }

    #[test]
    fn only_svg_is_vector() {
        let vectors: Vec<_> = OutputFormat::ALL
            .iter()
            .filter(|f| f.is_vector())
            .collect();
        assert_eq!(vectors, vec![&OutputFormat::Svg]);
    }
}
