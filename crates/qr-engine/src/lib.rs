//! QR composition engine.
//!
//! Encodes text into a QR symbol at an exact pixel size, overlays an optional
//! logo on a white clear area, and re-encodes raster output into the requested
//! final format. Vector (SVG) and raster (PNG/JPEG/WEBP) paths share the same
//! placement geometry.

pub mod compose;
pub mod convert;
pub mod encoder;
pub mod error;
pub mod format;
pub mod geometry;
pub mod logo;
pub mod pipeline;
pub mod request;

// Re-exports for convenience
pub use error::PipelineError;
pub use format::OutputFormat;
pub use geometry::LogoPlacement;
pub use logo::Logo;
pub use pipeline::{Artifact, ArtifactMetadata, Composition, Stage, compose};
pub use request::GenerationRequest;

/// Quiet zone around the symbol, in modules.
pub const QUIET_ZONE_MODULES: u32 = 2;

/// Error-correction level used for every symbol. A centered logo erases part
/// of the symbol and only level H reliably survives that.
pub const ERROR_CORRECTION: qrcode::EcLevel = qrcode::EcLevel::H;

/// Module color (black).
pub const DARK_LUMA: u8 = 0;

/// Background and clear-area color (white).
pub const LIGHT_LUMA: u8 = 255;

/// Encoding of the lossless buffer passed between encoder, compositor and converter.
pub const INTERMEDIATE_FORMAT: OutputFormat = OutputFormat::Png;
