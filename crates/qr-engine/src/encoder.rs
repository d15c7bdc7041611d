//! QR symbol encoding into SVG markup or a PNG buffer of an exact pixel size.

use std::fmt::Write as _;
use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use qrcode::types::QrError;
use qrcode::{Color, QrCode};
use tracing::debug;

use crate::{DARK_LUMA, ERROR_CORRECTION, LIGHT_LUMA, OutputFormat, PipelineError, QUIET_ZONE_MODULES};

/// Output of the encoder, consumed once by the compositor or converter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedQr {
    Vector { markup: String },
    /// PNG-encoded grayscale or RGB bitmap.
    Raster { bytes: Vec<u8> },
}

impl RenderedQr {
    pub fn is_vector(&self) -> bool {
        matches!(self, Self::Vector { .. })
    }
}

/// Module layout of an encoded symbol including its quiet zone.
struct SymbolGrid {
    dark: Vec<bool>,
    /// Modules per side, quiet zone included.
    span: u32,
}

impl SymbolGrid {
    fn encode(text: &str, size: u32) -> Result<Self, PipelineError> {
        let code = QrCode::with_error_correction_level(text.as_bytes(), ERROR_CORRECTION)
            .map_err(|e| match e {
                QrError::DataTooLong => PipelineError::Encoding(format!(
                    "text of {} bytes exceeds QR capacity at error-correction level H",
                    text.len()
                )),
                other => PipelineError::Encoding(other.to_string()),
            })?;

        let width = code.width() as u32;
        let span = width + 2 * QUIET_ZONE_MODULES;
        if span > size {
            return Err(PipelineError::Encoding(format!(
                "symbol needs {span} modules per side but only {size} px are available"
            )));
        }

        let colors = code.to_colors();
        let mut dark = vec![false; (span * span) as usize];
        for (i, color) in colors.iter().enumerate() {
            if *color == Color::Dark {
                let x = (i as u32) % width + QUIET_ZONE_MODULES;
                let y = (i as u32) / width + QUIET_ZONE_MODULES;
                dark[(y * span + x) as usize] = true;
            }
        }

        debug!(modules = width, span, size, "QR symbol encoded");
        Ok(Self { dark, span })
    }

    fn is_dark(&self, mx: u32, my: u32) -> bool {
        self.dark[(my * self.span + mx) as usize]
    }

    /// Module index covering pixel `px` of a `size`-pixel edge.
    fn module_at(&self, px: u32, size: u32) -> u32 {
        (u64::from(px) * u64::from(self.span) / u64::from(size)) as u32
    }

    /// First pixel covered by module `m`; `edge(span) == size`.
    fn edge(&self, m: u32, size: u32) -> u32 {
        let span = u64::from(self.span);
        ((u64::from(m) * u64::from(size)).div_ceil(span)) as u32
    }
}

/// Encode `text` for the given output format: SVG markup for `svg`, a PNG
/// buffer for every raster format.
pub fn encode(text: &str, size: u32, format: OutputFormat) -> Result<RenderedQr, PipelineError> {
    if format.is_vector() {
        Ok(RenderedQr::Vector {
            markup: encode_svg(text, size)?,
        })
    } else {
        Ok(RenderedQr::Raster {
            bytes: encode_png(text, size)?,
        })
    }
}

/// Render a `size × size` grayscale bitmap of the symbol.
pub fn render_bitmap(text: &str, size: u32) -> Result<GrayImage, PipelineError> {
    let grid = SymbolGrid::encode(text, size)?;
    let axis: Vec<u32> = (0..size).map(|px| grid.module_at(px, size)).collect();

    Ok(GrayImage::from_fn(size, size, |x, y| {
        if grid.is_dark(axis[x as usize], axis[y as usize]) {
            Luma([DARK_LUMA])
        } else {
            Luma([LIGHT_LUMA])
        }
    }))
}

pub fn encode_png(text: &str, size: u32) -> Result<Vec<u8>, PipelineError> {
    let bitmap = render_bitmap(text, size)?;
    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(bitmap)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| PipelineError::Encoding(format!("PNG encode error: {e}")))?;
    Ok(bytes)
}

/// Render the symbol as standalone SVG markup whose width, height and
/// viewBox all equal `size`. Dark modules are merged into horizontal runs.
pub fn encode_svg(text: &str, size: u32) -> Result<String, PipelineError> {
    let grid = SymbolGrid::encode(text, size)?;

    let mut path = String::new();
    for my in 0..grid.span {
        let y0 = grid.edge(my, size);
        let h = grid.edge(my + 1, size) - y0;
        let mut mx = 0;
        while mx < grid.span {
            if !grid.is_dark(mx, my) {
                mx += 1;
                continue;
            }
            let start = mx;
            while mx < grid.span && grid.is_dark(mx, my) {
                mx += 1;
            }
            let x0 = grid.edge(start, size);
            let w = grid.edge(mx, size) - x0;
            let _ = write!(path, "M{x0} {y0}h{w}v{h}h-{w}z");
        }
    }

    let mut svg = String::with_capacity(path.len() + 320);
    svg.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{size}\" height=\"{size}\" viewBox=\"0 0 {size} {size}\" shape-rendering=\"crispEdges\">"
    );
    let _ = writeln!(svg, "  <path fill=\"#ffffff\" d=\"M0 0h{size}v{size}H0z\"/>");
    let _ = writeln!(svg, "  <path fill=\"#000000\" d=\"{path}\"/>");
    svg.push_str("</svg>\n");
    Ok(svg)
}
