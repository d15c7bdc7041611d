//! QR generation API.

use std::str::FromStr;

use axum::Json;
use axum::body::Body;
use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use qr_engine::request::{DEFAULT_LOGO_PADDING, DEFAULT_LOGO_SIZE, DEFAULT_QUALITY, DEFAULT_SIZE};
use qr_engine::{GenerationRequest, OutputFormat};
use serde_json::json;

use crate::app::SharedState;
use crate::services::generation::{self, GenerateOutcome, UploadedLogo};

use super::{ApiError, err_json, generation_error, validation_error};

const ACCEPTED_LOGO_TYPES: [&str; 5] = [
    "image/png",
    "image/jpeg",
    "image/jpg",
    "image/webp",
    "image/svg+xml",
];

/// Raw multipart fields before parsing.
#[derive(Debug, Default)]
struct GenerateForm {
    text: Option<String>,
    size: Option<String>,
    format: Option<String>,
    quality: Option<String>,
    logo_size: Option<String>,
    logo_padding_width: Option<String>,
    logo_padding_height: Option<String>,
    persist: Option<String>,
    logo: Option<UploadedLogo>,
}

impl GenerateForm {
    fn to_request(&self) -> Result<GenerationRequest, ApiError> {
        let format = match non_empty(&self.format) {
            Some(f) => OutputFormat::from_str(f).map_err(|e| validation_error(&e.to_string()))?,
            None => OutputFormat::Png,
        };
        let quality: u32 = parse_field("quality", &self.quality, u32::from(DEFAULT_QUALITY))?;
        let logo_size = parse_field("logoSize", &self.logo_size, DEFAULT_LOGO_SIZE)?;
        let padding_width = parse_field("logoPaddingWidth", &self.logo_padding_width, DEFAULT_LOGO_PADDING)?;
        let padding_height = parse_field("logoPaddingHeight", &self.logo_padding_height, DEFAULT_LOGO_PADDING)?;

        Ok(GenerationRequest::new(self.text.clone().unwrap_or_default())
            .with_size(parse_field("size", &self.size, DEFAULT_SIZE)?)
            .with_format(format)
            // Out-of-range values saturate and are rejected by request validation.
            .with_quality(u8::try_from(quality).unwrap_or(u8::MAX))
            .with_logo_geometry(logo_size, padding_width, padding_height))
    }

    fn persist(&self) -> Result<bool, ApiError> {
        match non_empty(&self.persist).map(str::to_ascii_lowercase).as_deref() {
            None | Some("true") | Some("1") => Ok(true),
            Some("false") | Some("0") => Ok(false),
            Some(other) => Err(validation_error(&format!(
                "persist must be true or false, got {other:?}"
            ))),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_field<T: FromStr>(name: &str, value: &Option<String>, default: T) -> Result<T, ApiError> {
    match non_empty(value) {
        Some(v) => v
            .parse()
            .map_err(|_| validation_error(&format!("{name} must be a number, got {v:?}"))),
        None => Ok(default),
    }
}

async fn read_form(multipart: &mut Multipart, max_logo_bytes: usize) -> Result<GenerateForm, ApiError> {
    let mut form = GenerateForm::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(validation_error(&e.body_text())),
        };
        let name = field.name().unwrap_or("").to_string();

        if name == "logo" {
            if form.logo.is_some() {
                return Err(validation_error("Only one logo file may be uploaded"));
            }
            let mime = match field.content_type() {
                Some(ct) if ct != "application/octet-stream" => ct.to_ascii_lowercase(),
                _ => field
                    .file_name()
                    .map(|f| mime_guess::from_path(f).first_or_octet_stream().to_string())
                    .unwrap_or_default(),
            };
            if !ACCEPTED_LOGO_TYPES.contains(&mime.as_str()) {
                return Err(validation_error(&format!(
                    "Unsupported logo type {mime:?}; use PNG, JPEG, WEBP or SVG"
                )));
            }
            let data = field
                .bytes()
                .await
                .map_err(|e| validation_error(&e.body_text()))?;
            if data.len() > max_logo_bytes {
                return Err(validation_error(&format!(
                    "Logo exceeds the {max_logo_bytes} byte limit"
                )));
            }
            if !data.is_empty() {
                form.logo = Some(UploadedLogo {
                    bytes: data.to_vec(),
                    mime,
                });
            }
            continue;
        }

        let slot = match name.as_str() {
            "text" => &mut form.text,
            "size" => &mut form.size,
            "format" => &mut form.format,
            "quality" => &mut form.quality,
            "logoSize" => &mut form.logo_size,
            "logoPaddingWidth" => &mut form.logo_padding_width,
            "logoPaddingHeight" => &mut form.logo_padding_height,
            "persist" => &mut form.persist,
            _ => continue,
        };
        let text = field
            .text()
            .await
            .map_err(|e| validation_error(&e.body_text()))?;
        *slot = Some(text);
    }

    Ok(form)
}

/// POST /api/qr/generate – Render a QR code, optionally with a logo
pub async fn generate_qr(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = read_form(&mut multipart, state.config().max_logo_bytes).await?;
    let request = form.to_request()?;
    let persist = form.persist()?;

    tracing::debug!(
        format = %request.format,
        size = request.size,
        has_logo = form.logo.is_some(),
        persist = persist,
        "Generate request"
    );

    let outcome = generation::generate(&state, request, form.logo, persist)
        .await
        .map_err(|e| generation_error(&e))?;

    match outcome {
        GenerateOutcome::Stored(stored) => {
            Ok(Json(json!({ "success": true, "data": stored })).into_response())
        }
        GenerateOutcome::Direct {
            bytes,
            content_type,
            file_name,
            fallback,
        } => {
            let mut builder = Response::builder()
                .header(header::CONTENT_TYPE, content_type)
                .header(header::CONTENT_LENGTH, bytes.len())
                .header(
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{file_name}\""),
                );
            if fallback {
                builder = builder.header("X-Storage-Fallback", "true");
            }
            builder
                .body(Body::from(bytes))
                .map_err(|e| err_json(500, super::INTERNAL_ERROR, &e.to_string()))
        }
    }
}
