//! Pipeline error taxonomy.

/// Errors raised while building a QR artifact. Every variant is terminal for
/// the request that produced it.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("QR encoding failed: {0}")]
    Encoding(String),

    #[error("Logo processing failed: {0}")]
    LogoProcessing(String),

    #[error("Format conversion failed: {0}")]
    Conversion(String),
}

impl PipelineError {
    /// Stable name of the error kind, used in API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::Encoding(_) => "EncodingError",
            Self::LogoProcessing(_) => "LogoProcessingError",
            Self::Conversion(_) => "ConversionError",
        }
    }
}
