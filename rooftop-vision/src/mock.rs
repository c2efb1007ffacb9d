use crate::{EstimationError, RooftopEstimate, RooftopEstimator};
use async_trait::async_trait;
use rooftop_imagery::RooftopImage;
use tracing::info;

pub const MOCK_AREA_M2: f64 = 120.0;
pub const MOCK_CONFIDENCE: f64 = 0.85;
pub const MOCK_DESCRIPTION: &str = "Mock estimate: rectangular rooftop with a clear, unobstructed \
     surface suitable for a standard panel layout. No vision model was consulted.";

/// Deterministic stand-in for the vision API. Ignores the image content.
#[derive(Debug, Clone, Default)]
pub struct MockEstimator;

impl MockEstimator {
    pub fn new() -> Self {
        Self
    }

    pub fn canonical_estimate() -> RooftopEstimate {
        RooftopEstimate {
            area_m2: MOCK_AREA_M2,
            description: MOCK_DESCRIPTION.to_string(),
            confidence: MOCK_CONFIDENCE,
        }
    }
}

#[async_trait]
impl RooftopEstimator for MockEstimator {
    async fn estimate(&self, image: &RooftopImage) -> Result<RooftopEstimate, EstimationError> {
        info!(
            "Mock estimator returning canonical estimate for {}",
            image.coordinate()
        );
        Ok(Self::canonical_estimate())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
