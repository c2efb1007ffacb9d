use async_trait::async_trait;
use rooftop_imagery::RooftopImage;
use serde::Serialize;

pub mod mock;
pub mod preprocess;
pub mod vision;

pub use mock::MockEstimator;
pub use vision::{VisionEstimator, VisionSettings};

/// Errors raised while estimating a rooftop
#[derive(Debug, thiserror::Error)]
pub enum EstimationError {
    #[error("Vision API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Vision API error: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("No response from vision API")]
    EmptyResponse,

    #[error("Failed to parse vision response: {0}")]
    Malformed(String),

    #[error("Invalid rooftop estimate: {0}")]
    InvalidEstimate(String),

    #[error("Failed to prepare image for inference: {0}")]
    Image(#[from] image::ImageError),

    #[error("Vision estimator misconfigured: {0}")]
    Config(String),
}

/// Vision-derived area, description and confidence for one image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RooftopEstimate {
    area_m2: f64,
    description: String,
    confidence: f64,
}

impl RooftopEstimate {
    /// Build an estimate, rejecting negative or non-finite areas and
    /// confidences outside `[0, 1]`
    pub fn new(
        area_m2: f64,
        description: impl Into<String>,
        confidence: f64,
    ) -> Result<Self, EstimationError> {
        if !area_m2.is_finite() || area_m2 < 0.0 {
            return Err(EstimationError::InvalidEstimate(format!(
                "area_m2 must be a finite number >= 0, got {}",
                area_m2
            )));
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(EstimationError::InvalidEstimate(format!(
                "confidence must be within [0, 1], got {}",
                confidence
            )));
        }

        Ok(Self {
            area_m2,
            description: description.into(),
            confidence,
        })
    }

    pub fn area_m2(&self) -> f64 {
        self.area_m2
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}

/// Capability interface over rooftop area estimation
#[async_trait]
pub trait RooftopEstimator: Send + Sync {
    async fn estimate(&self, image: &RooftopImage) -> Result<RooftopEstimate, EstimationError>;

    /// Strategy name used in logs and reports
    fn name(&self) -> &'static str;
}
