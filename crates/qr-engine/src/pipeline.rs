//! Composition orchestrator: encoder → compositor → converter.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::compose::composite;
use crate::convert::convert;
use crate::encoder::{RenderedQr, encode};
use crate::{GenerationRequest, Logo, OutputFormat, PipelineError};

/// Pipeline states. `Failed` is reachable from every other state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Start,
    Encoded,
    LogoComposited,
    Converted,
    Done,
    Failed,
}

/// Final output of a generation, tagged with its format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    format: OutputFormat,
    bytes: Vec<u8>,
}

impl Artifact {
    fn from_rendered(rendered: RenderedQr, format: OutputFormat) -> Self {
        let bytes = match rendered {
            RenderedQr::Vector { markup } => markup.into_bytes(),
            RenderedQr::Raster { bytes } => bytes,
        };
        Self { format, bytes }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// SVG markup, when the artifact is a vector one.
    pub fn markup(&self) -> Option<&str> {
        if self.format.is_vector() {
            std::str::from_utf8(&self.bytes).ok()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Metadata emitted alongside every artifact for the store to index.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMetadata {
    pub text: String,
    pub format: OutputFormat,
    pub has_logo: bool,
    pub size: u32,
    pub logo_size: f64,
    pub created_at: DateTime<Utc>,
}

/// Result of a successful pipeline run.
#[derive(Debug, Clone)]
pub struct Composition {
    pub artifact: Artifact,
    pub metadata: ArtifactMetadata,
    /// States visited, in order, ending with `Done`.
    pub stages: Vec<Stage>,
}

/// Run the full pipeline for a request. The request is validated first;
/// nothing is written anywhere, the caller owns the returned artifact.
pub fn compose(request: &GenerationRequest, logo: Option<&Logo>) -> Result<Composition, PipelineError> {
    let mut stages = vec![Stage::Start];
    match run(request, logo, &mut stages) {
        Ok(artifact) => {
            stages.push(Stage::Done);
            debug!(format = %request.format, bytes = artifact.len(), stages = ?stages, "Pipeline finished");
            Ok(Composition {
                artifact,
                metadata: ArtifactMetadata {
                    text: request.text.clone(),
                    format: request.format,
                    has_logo: logo.is_some(),
                    size: request.size,
                    logo_size: request.logo_size,
                    created_at: Utc::now(),
                },
                stages,
            })
        }
        Err(e) => {
            let last = stages.last().copied().unwrap_or(Stage::Start);
            stages.push(Stage::Failed);
            warn!(after = ?last, kind = e.kind(), stages = ?stages, "Pipeline failed: {e}");
            Err(e)
        }
    }
}

fn run(
    request: &GenerationRequest,
    logo: Option<&Logo>,
    stages: &mut Vec<Stage>,
) -> Result<Artifact, PipelineError> {
    request.validate(logo.is_some())?;

    let mut rendered = encode(&request.text, request.size, request.format)?;
    stages.push(Stage::Encoded);

    if let Some(logo) = logo {
        rendered = composite(&rendered, logo, &request.placement())?;
        stages.push(Stage::LogoComposited);
    }

    match rendered {
        RenderedQr::Vector { .. } => Ok(Artifact::from_rendered(rendered, request.format)),
        RenderedQr::Raster { bytes } if request.format != OutputFormat::Png => {
            let converted = convert(bytes, request.format.as_str(), request.quality)?;
            stages.push(Stage::Converted);
            Ok(Artifact {
                format: request.format,
                bytes: converted,
            })
        }
        RenderedQr::Raster { .. } => Ok(Artifact::from_rendered(rendered, request.format)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn logo() -> Logo {
        logo_sized(32)
    }

    fn logo_sized(edge: u32) -> Logo {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(edge, edge, Rgba([30, 60, 200, 255])));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        Logo::new(bytes, "image/png")
    }

    fn decode_text(bytes: &[u8]) -> String {
        let gray = image::load_from_memory(bytes).unwrap().to_luma8();
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            gray.width() as usize,
            gray.height() as usize,
            |x, y| gray.get_pixel(x as u32, y as u32)[0],
        );
        let grids = prepared.detect_grids();
        assert_eq!(grids.len(), 1);
        grids[0].decode().unwrap().1
    }

    #[test]
    fn png_without_logo_round_trips() {
        let req = GenerationRequest::new("https://example.com").with_size(400);
        let out = compose(&req, None).unwrap();
        assert_eq!(out.stages, vec![Stage::Start, Stage::Encoded, Stage::Done]);
        assert_eq!(out.artifact.content_type(), "image/png");

        let img = image::load_from_memory(out.artifact.bytes()).unwrap();
        assert_eq!((img.width(), img.height()), (400, 400));
        assert_eq!(decode_text(out.artifact.bytes()), "https://example.com");
        assert!(!out.metadata.has_logo);
        assert_eq!(out.metadata.size, 400);
    }

    #[test]
    fn png_with_logo_still_scans() {
        let req = GenerationRequest::new("https://example.com/with-logo")
            .with_size(400)
            .with_logo_geometry(0.15, 5, 5);
        let out = compose(&req, Some(&logo())).unwrap();
        assert_eq!(
            out.stages,
            vec![Stage::Start, Stage::Encoded, Stage::LogoComposited, Stage::Done]
        );
        assert_eq!(decode_text(out.artifact.bytes()), "https://example.com/with-logo");
    }

    #[test]
    fn svg_with_logo_scenario() {
        let req = GenerationRequest::new("Hello")
            .with_format(OutputFormat::Svg)
            .with_logo_geometry(0.2, 15, 15);
        let out = compose(&req, Some(&logo())).unwrap();
        assert_eq!(
            out.stages,
            vec![Stage::Start, Stage::Encoded, Stage::LogoComposited, Stage::Done]
        );
        let svg = out.artifact.markup().unwrap();
        assert!(svg.contains("width=\"300\" height=\"300\""));
        assert_eq!(svg.matches("<rect").count(), 1);
        assert_eq!(svg.matches("<image").count(), 1);
        assert!(svg.contains("<image x=\"120\" y=\"120\" width=\"60\" height=\"60\""));
        assert_eq!(out.artifact.content_type(), "image/svg+xml");
    }

    #[test]
    fn svg_never_converts() {
        let req = GenerationRequest::new("vector")
            .with_format(OutputFormat::Svg)
            .with_quality(10);
        let out = compose(&req, None).unwrap();
        assert!(!out.stages.contains(&Stage::Converted));
        assert!(out.artifact.markup().is_some());
    }

    #[test]
    fn jpg_with_logo_runs_every_stage() {
        let req = GenerationRequest::new("jpeg please")
            .with_format(OutputFormat::Jpg)
            .with_quality(50);
        let out = compose(&req, Some(&logo())).unwrap();
        assert_eq!(
            out.stages,
            vec![
                Stage::Start,
                Stage::Encoded,
                Stage::LogoComposited,
                Stage::Converted,
                Stage::Done
            ]
        );
        assert_eq!(out.artifact.content_type(), "image/jpeg");
        assert_eq!(image::guess_format(out.artifact.bytes()).unwrap(), ImageFormat::Jpeg);
        let img = image::load_from_memory(out.artifact.bytes()).unwrap();
        assert_eq!((img.width(), img.height()), (300, 300));
    }

    #[test]
    fn lossy_formats_convert_even_at_default_quality() {
        for format in [OutputFormat::Jpeg, OutputFormat::Webp] {
            let out = compose(&GenerationRequest::new("x").with_format(format), None).unwrap();
            assert!(out.stages.contains(&Stage::Converted), "{format} skipped conversion");
            assert_eq!(out.artifact.format(), format);
        }
    }

    #[test]
    fn encoder_and_compositor_are_deterministic() {
        for format in [OutputFormat::Png, OutputFormat::Svg] {
            let req = GenerationRequest::new("idempotent").with_format(format);
            let a = compose(&req, Some(&logo())).unwrap();
            let b = compose(&req, Some(&logo())).unwrap();
            assert_eq!(a.artifact, b.artifact);
        }
    }

    #[test]
    fn svg_and_png_share_logo_placement() {
        let req = GenerationRequest::new("parity").with_logo_geometry(0.25, 10, 20);
        // 75 px logo box, so the raster logo is placed without resampling.
        let logo = logo_sized(75);
        let png = compose(&req, Some(&logo)).unwrap();
        let svg = compose(&req.clone().with_format(OutputFormat::Svg), Some(&logo)).unwrap();

        let p = req.placement();
        let markup = svg.artifact.markup().unwrap();
        assert!(markup.contains(&format!(
            "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\"",
            p.clear_x, p.clear_y, p.clear_width, p.clear_height
        )));

        let img = image::load_from_memory(png.artifact.bytes()).unwrap().to_rgb8();
        let (cx, cy) = p.clear_origin_px();
        // Clear-area corners are white, logo center carries the logo color.
        assert_eq!(img.get_pixel(cx as u32, cy as u32).0, [255, 255, 255]);
        assert_eq!(
            img.get_pixel(cx as u32 + p.clear_width - 1, cy as u32 + p.clear_height - 1).0,
            [255, 255, 255]
        );
        assert_eq!(img.get_pixel(150, 150).0, [30, 60, 200]);
    }

    #[test]
    fn default_logo_geometry_still_decodes() {
        let req = GenerationRequest::new("https://example.com/menu");
        assert_eq!(req.size, crate::request::DEFAULT_SIZE);
        assert_eq!(req.logo_size, crate::request::DEFAULT_LOGO_SIZE);
        let out = compose(&req, Some(&logo_sized(200))).unwrap();
        assert!(out.stages.contains(&Stage::LogoComposited));
        assert_eq!(decode_text(out.artifact.bytes()), "https://example.com/menu");
    }

    #[test]
    fn over_capacity_text_fails_as_encoding_error() {
        let req = GenerationRequest::new("a".repeat(2000)).with_size(100);
        assert_eq!(compose(&req, None).unwrap_err().kind(), "EncodingError");
    }

    #[test]
    fn invalid_request_fails_before_encoding() {
        let req = GenerationRequest::new("x").with_size(50);
        assert_eq!(compose(&req, None).unwrap_err().kind(), "ValidationError");
    }

    #[test]
    fn corrupt_logo_fails_as_logo_processing_error() {
        let bad = Logo::new(b"nope".to_vec(), "image/png");
        for format in [OutputFormat::Png, OutputFormat::Svg, OutputFormat::Webp] {
            let req = GenerationRequest::new("x").with_format(format);
            assert_eq!(compose(&req, Some(&bad)).unwrap_err().kind(), "LogoProcessingError");
        }
    }
}
