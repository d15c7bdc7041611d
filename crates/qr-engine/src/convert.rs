//! Final raster re-encoding.

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};
use tracing::debug;

use crate::{OutputFormat, PipelineError};

/// Re-encode an intermediate PNG buffer into `target`.
///
/// `png` and unknown targets pass the buffer through unchanged. `quality`
/// (1-100) only affects the lossy `jpg`/`jpeg`/`webp` encoders. On error the
/// input buffer is dropped.
pub fn convert(buffer: Vec<u8>, target: &str, quality: u8) -> Result<Vec<u8>, PipelineError> {
    match OutputFormat::parse(target) {
        Some(OutputFormat::Jpg | OutputFormat::Jpeg) => to_jpeg(&buffer, quality),
        Some(OutputFormat::Webp) => to_webp(&buffer, quality),
        Some(OutputFormat::Png) => Ok(buffer),
        _ => {
            debug!(target, "No conversion for target format, passing buffer through");
            Ok(buffer)
        }
    }
}

fn decode(buffer: &[u8]) -> Result<image::DynamicImage, PipelineError> {
    image::load_from_memory(buffer)
        .map_err(|e| PipelineError::Conversion(format!("cannot decode raster: {e}")))
}

fn to_jpeg(buffer: &[u8], quality: u8) -> Result<Vec<u8>, PipelineError> {
    let rgb = decode(buffer)?.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| PipelineError::Conversion(format!("JPEG encode error: {e}")))?;
    debug!(quality, bytes = out.len(), "Converted to JPEG");
    Ok(out)
}

fn to_webp(buffer: &[u8], quality: u8) -> Result<Vec<u8>, PipelineError> {
    let rgba = decode(buffer)?.to_rgba8();
    let encoder = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height());
    let memory = encoder
        .encode_simple(false, f32::from(quality.clamp(1, 100)))
        .map_err(|e| PipelineError::Conversion(format!("WebP encode error: {e:?}")))?;
    debug!(quality, bytes = memory.len(), "Converted to WebP");
    Ok(memory.to_vec())
}
