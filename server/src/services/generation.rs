//! One QR generation request end to end: stage the logo, run the pipeline,
//! stage the render, then persist it or hand the bytes back directly.

use qr_engine::{GenerationRequest, Logo, PipelineError, compose};

use crate::app::SharedState;

use super::staging::StagingError;
use super::store::StoredArtifact;

/// Logo file as received from the client, already checked against the
/// accepted MIME types.
#[derive(Debug, Clone)]
pub struct UploadedLogo {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl UploadedLogo {
    /// File extension used when staging this logo.
    pub fn extension(&self) -> &'static str {
        match self.mime.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/svg+xml" => "svg",
            _ => "png",
        }
    }
}

#[derive(Debug)]
pub enum GenerateOutcome {
    /// Persisted; the record points at the durable copy.
    Stored(StoredArtifact),
    /// Returned to the caller as-is. `fallback` is set when persisting was
    /// requested but the store failed.
    Direct {
        bytes: Vec<u8>,
        content_type: &'static str,
        file_name: String,
        fallback: bool,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("Staging error: {0}")]
    Staging(#[from] StagingError),
    #[error("Worker failed: {0}")]
    Worker(String),
}

/// Run a generation. Staged files are removed on every exit path when their
/// guards drop at the end of this function.
pub async fn generate(
    state: &SharedState,
    request: GenerationRequest,
    logo: Option<UploadedLogo>,
    persist: bool,
) -> Result<GenerateOutcome, GenerationError> {
    let staged_logo = match &logo {
        Some(upload) => Some(state.staging().stage_logo(&upload.bytes, upload.extension())?),
        None => None,
    };
    let logo_path = staged_logo.as_ref().map(|s| s.path().to_path_buf());

    let composition = tokio::task::spawn_blocking(move || {
        let logo = logo_path.as_deref().map(Logo::from_path).transpose()?;
        compose(&request, logo.as_ref())
    })
    .await
    .map_err(|e| GenerationError::Worker(e.to_string()))??;

    let artifact = composition.artifact;
    let metadata = composition.metadata;
    let format = artifact.format();

    let staged_render =
        state
            .staging()
            .stage_render(artifact.bytes(), format.extension(), metadata.created_at)?;
    let file_name = staged_render.file_name();

    if persist {
        match state.store().upload(staged_render.path(), &metadata).await {
            Ok(stored) => {
                tracing::info!(id = %stored.id, format = %format, has_logo = metadata.has_logo, "QR generated and stored");
                return Ok(GenerateOutcome::Stored(stored));
            }
            Err(e) => {
                tracing::error!(format = %format, "Store upload failed, returning bytes directly: {e}");
                return Ok(GenerateOutcome::Direct {
                    content_type: artifact.content_type(),
                    bytes: artifact.into_bytes(),
                    file_name,
                    fallback: true,
                });
            }
        }
    }

    tracing::info!(format = %format, has_logo = metadata.has_logo, "QR generated");
    Ok(GenerateOutcome::Direct {
        content_type: artifact.content_type(),
        bytes: artifact.into_bytes(),
        file_name,
        fallback: false,
    })
}
