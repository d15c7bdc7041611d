//! Logo composition over a rendered QR symbol.
//!
//! A white clear area is drawn first so the decoder sees an erased region
//! instead of logo noise, then the fitted logo is centered on top of it.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use tracing::debug;

use crate::encoder::RenderedQr;
use crate::geometry::LogoPlacement;
use crate::{LIGHT_LUMA, Logo, PipelineError};

const CLEAR_AREA: Rgba<u8> = Rgba([LIGHT_LUMA, LIGHT_LUMA, LIGHT_LUMA, 255]);

/// Produce a new artifact with the logo merged in. The input is left untouched.
pub fn composite(
    rendered: &RenderedQr,
    logo: &Logo,
    placement: &LogoPlacement,
) -> Result<RenderedQr, PipelineError> {
    match rendered {
        RenderedQr::Vector { markup } => Ok(RenderedQr::Vector {
            markup: composite_svg(markup, logo, placement)?,
        }),
        RenderedQr::Raster { bytes } => Ok(RenderedQr::Raster {
            bytes: composite_raster(bytes, logo, placement)?,
        }),
    }
}

/// Pixel composition over a PNG-encoded symbol. Output is PNG as well.
pub fn composite_raster(
    png: &[u8],
    logo: &Logo,
    placement: &LogoPlacement,
) -> Result<Vec<u8>, PipelineError> {
    let base = image::load_from_memory_with_format(png, ImageFormat::Png)
        .map_err(|e| PipelineError::LogoProcessing(format!("cannot decode QR raster: {e}")))?;
    let fitted = logo.fitted(placement.logo_size)?;

    let mut canvas = base.to_rgba8();
    fill_clear_area(&mut canvas, placement);

    let (x, y) = placement.centered_origin_px(fitted.width(), fitted.height());
    overlay(&mut canvas, &fitted, x, y);
    debug!(
        logo_w = fitted.width(),
        logo_h = fitted.height(),
        x,
        y,
        "Logo composited onto raster QR"
    );

    let mut out = Vec::new();
    DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8())
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .map_err(|e| PipelineError::LogoProcessing(format!("cannot encode composited QR: {e}")))?;
    Ok(out)
}

/// Inject the clear-area `<rect>` and an embedded logo `<image>` as the last
/// children of the root element. Everything else is copied verbatim.
pub fn composite_svg(
    markup: &str,
    logo: &Logo,
    placement: &LogoPlacement,
) -> Result<String, PipelineError> {
    logo.probe()?;

    let close = markup.rfind("</svg>").ok_or_else(|| {
        PipelineError::LogoProcessing("QR markup has no closing </svg> element".into())
    })?;

    let rect = format!(
        "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"white\"/>",
        placement.clear_x, placement.clear_y, placement.clear_width, placement.clear_height
    );
    let image = format!(
        "<image x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" href=\"{}\"/>",
        placement.logo_x,
        placement.logo_y,
        placement.logo_size,
        placement.logo_size,
        logo.data_uri()
    );

    let mut out = String::with_capacity(markup.len() + rect.len() + image.len() + 8);
    out.push_str(&markup[..close]);
    out.push_str("  ");
    out.push_str(&rect);
    out.push_str("\n  ");
    out.push_str(&image);
    out.push('\n');
    out.push_str(&markup[close..]);

    debug!(logo_size = placement.logo_size, "Logo injected into SVG QR");
    Ok(out)
}

fn fill_clear_area(canvas: &mut RgbaImage, placement: &LogoPlacement) {
    if placement.clear_width == 0 || placement.clear_height == 0 {
        return;
    }
    let (x, y) = placement.clear_origin_px();
    let rect = Rect::at(x as i32, y as i32).of_size(placement.clear_width, placement.clear_height);
    draw_filled_rect_mut(canvas, rect, CLEAR_AREA);
}

/// Overlay `top` onto `base` at the given position, alpha-blending
/// translucent pixels. Parts falling outside `base` are clipped.
pub fn overlay(base: &mut RgbaImage, top: &DynamicImage, x: i64, y: i64) {
    let top_rgba = top.to_rgba8();
    for (dx, dy, pixel) in top_rgba.enumerate_pixels() {
        let target_x = x + i64::from(dx);
        let target_y = y + i64::from(dy);
        if target_x < 0
            || target_y < 0
            || target_x >= i64::from(base.width())
            || target_y >= i64::from(base.height())
        {
            continue;
        }
        let (tx, ty) = (target_x as u32, target_y as u32);
        let alpha = pixel[3] as f32 / 255.0;
        if alpha > 0.99 {
            base.put_pixel(tx, ty, Rgba([pixel[0], pixel[1], pixel[2], 255]));
        } else if alpha > 0.01 {
            let bg = *base.get_pixel(tx, ty);
            base.put_pixel(tx, ty, blend_pixel(&bg, pixel, alpha));
        }
    }
}

fn blend_pixel(bg: &Rgba<u8>, fg: &Rgba<u8>, alpha: f32) -> Rgba<u8> {
    let inv = 1.0 - alpha;
    Rgba([
        (fg[0] as f32 * alpha + bg[0] as f32 * inv).round() as u8,
        (fg[1] as f32 * alpha + bg[1] as f32 * inv).round() as u8,
        (fg[2] as f32 * alpha + bg[2] as f32 * inv).round() as u8,
        255,
    ])
}
