use rooftop_imagery::ImageryError;
use rooftop_vision::EstimationError;

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Terminal failure of one analysis run. Nothing is rendered when one occurs.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Image unavailable: {0}")]
    ImageUnavailable(String),

    #[error("Estimation failed: {0}")]
    Estimation(#[from] EstimationError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AnalysisError {
    pub fn invalid_input<E: std::fmt::Display>(e: E) -> Self {
        Self::InvalidInput(e.to_string())
    }

    pub fn config<E: std::fmt::Display>(e: E) -> Self {
        Self::Config(e.to_string())
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::ImageUnavailable(_) => "IMAGE_UNAVAILABLE",
            Self::Estimation(_) => "ESTIMATION_FAILED",
            Self::Config(_) => "CONFIGURATION_ERROR",
        }
    }
}

impl From<ImageryError> for AnalysisError {
    fn from(err: ImageryError) -> Self {
        match err {
            ImageryError::InvalidCoordinate { .. } => Self::InvalidInput(err.to_string()),
            other => Self::ImageUnavailable(other.to_string()),
        }
    }
}
