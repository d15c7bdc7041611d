//! Logo loading, rasterization and aspect-preserving resize.

use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use resvg::{tiny_skia, usvg};
use tracing::debug;

use crate::PipelineError;

const SVG_MIME: &str = "image/svg+xml";

/// A logo image as uploaded: raw bytes plus the MIME type it was accepted as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logo {
    bytes: Vec<u8>,
    mime: String,
}

impl Logo {
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
        }
    }

    /// Read a logo from disk. The MIME type follows the file extension and
    /// falls back to `image/png`.
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        let bytes = std::fs::read(path).map_err(|e| {
            PipelineError::LogoProcessing(format!("cannot read {}: {e}", path.display()))
        })?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Ok(Self::new(bytes, mime_for_extension(ext)))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn is_svg(&self) -> bool {
        self.mime == SVG_MIME
    }

    /// `data:` URI embedding the original logo bytes.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }

    /// Decode the logo and check it is a usable image, without resizing.
    /// Returns its intrinsic dimensions.
    pub fn probe(&self) -> Result<(u32, u32), PipelineError> {
        if self.is_svg() {
            let tree = parse_svg(&self.bytes)?;
            let size = tree.size();
            Ok((size.width().ceil() as u32, size.height().ceil() as u32))
        } else {
            let img = self.decode_raster()?;
            Ok((img.width(), img.height()))
        }
    }

    /// Decode and scale the logo to fit inside a `bound × bound` box.
    pub fn fitted(&self, bound: u32) -> Result<DynamicImage, PipelineError> {
        if bound == 0 {
            return Err(PipelineError::LogoProcessing("logo box is empty".into()));
        }
        if self.is_svg() {
            rasterize_svg(&self.bytes, bound)
        } else {
            Ok(fit_inside(&self.decode_raster()?, bound))
        }
    }

    fn decode_raster(&self) -> Result<DynamicImage, PipelineError> {
        let img = image::load_from_memory(&self.bytes)
            .map_err(|e| PipelineError::LogoProcessing(format!("cannot decode logo: {e}")))?;
        if img.width() == 0 || img.height() == 0 {
            return Err(PipelineError::LogoProcessing("logo has no pixels".into()));
        }
        Ok(img)
    }
}

/// MIME type for a logo file extension.
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "svg" => SVG_MIME,
        _ => "image/png",
    }
}

/// Scale an image so its longer side equals `bound`, keeping aspect ratio.
/// Lanczos3; the shorter side never drops below one pixel.
pub fn fit_inside(img: &DynamicImage, bound: u32) -> DynamicImage {
    let (w, h) = (img.width(), img.height());
    let longest = w.max(h);
    if longest == bound {
        return img.clone();
    }

    let scale = f64::from(bound) / f64::from(longest);
    let edge = |v: u32| ((f64::from(v) * scale).round() as u32).max(1);
    let (fit_w, fit_h) = (edge(w), edge(h));
    debug!(w, h, fit_w, fit_h, "Fitting logo into box");
    img.resize_exact(fit_w, fit_h, FilterType::Lanczos3)
}

fn parse_svg(data: &[u8]) -> Result<usvg::Tree, PipelineError> {
    usvg::Tree::from_data(data, &usvg::Options::default())
        .map_err(|e| PipelineError::LogoProcessing(format!("cannot parse SVG logo: {e}")))
}

/// Render an SVG logo straight into the target box so it stays sharp.
fn rasterize_svg(data: &[u8], bound: u32) -> Result<DynamicImage, PipelineError> {
    let tree = parse_svg(data)?;
    let size = tree.size();
    let longest = size.width().max(size.height());
    if longest <= 0.0 {
        return Err(PipelineError::LogoProcessing("SVG logo has no extent".into()));
    }

    let zoom = bound as f32 / longest;
    let width = ((size.width() * zoom).round() as u32).clamp(1, bound);
    let height = ((size.height() * zoom).round() as u32).clamp(1, bound);
    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| PipelineError::LogoProcessing("cannot allocate SVG canvas".into()))?;
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(zoom, zoom),
        &mut pixmap.as_mut(),
    );

    let mut rgba = RgbaImage::new(width, height);
    for (dst, src) in rgba.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = image::Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    debug!(width, height, "SVG logo rasterized");
    Ok(DynamicImage::ImageRgba8(rgba))
}
