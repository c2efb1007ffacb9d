use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::metrics::{compute, validate_rate, SolarConstants, SolarMetrics};
use crate::recommendation::{generate, Recommendation};
use chrono::{DateTime, Utc};
use rooftop_imagery::{
    Coordinate, HttpImagerySource, ImageProvider, LocalImageStore, ResolvedImage, RooftopImage,
};
use rooftop_vision::{MockEstimator, RooftopEstimate, RooftopEstimator, VisionEstimator};
use serde::Serialize;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// One analysis invocation as supplied by a presentation layer
#[derive(Debug, Clone, Copy)]
pub struct AnalysisRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub electricity_rate: f64,
    /// Permit substituting the configured fallback location when the
    /// requested one has no imagery
    pub allow_fallback: bool,
}

impl AnalysisRequest {
    pub fn new(latitude: f64, longitude: f64, electricity_rate: f64) -> Self {
        Self {
            latitude,
            longitude,
            electricity_rate,
            allow_fallback: false,
        }
    }

    pub fn with_fallback(mut self, allow: bool) -> Self {
        self.allow_fallback = allow;
        self
    }
}

/// Complete result of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub analysis_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// Location the caller asked about
    pub coordinate: Coordinate,
    pub electricity_rate: f64,
    /// Set when `image` belongs to a substituted fallback location
    pub image_coordinate: Option<Coordinate>,
    pub estimator: &'static str,
    #[serde(skip)]
    pub image: RooftopImage,
    pub estimate: RooftopEstimate,
    pub metrics: SolarMetrics,
    pub recommendation: Recommendation,
}

impl AnalysisReport {
    pub fn is_substituted(&self) -> bool {
        self.image_coordinate.is_some()
    }
}

/// Image Provider → Rooftop Estimator → Solar Metrics → Recommendation
pub struct SolarPipeline {
    provider: ImageProvider,
    estimator: Box<dyn RooftopEstimator>,
    constants: SolarConstants,
    fallback: Option<Coordinate>,
}

impl SolarPipeline {
    pub fn new(
        provider: ImageProvider,
        estimator: Box<dyn RooftopEstimator>,
        constants: SolarConstants,
    ) -> Self {
        Self {
            provider,
            estimator,
            constants,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, coordinate: Coordinate) -> Self {
        self.fallback = Some(coordinate);
        self
    }

    /// Assemble a pipeline from configuration
    pub fn from_config(config: &AnalysisConfig) -> Result<Self> {
        config.validate()?;

        let mut provider = ImageProvider::new(LocalImageStore::new(&config.image_dir));
        if let Some(url) = &config.imagery_url {
            let source = HttpImagerySource::new(
                url.clone(),
                config.imagery_api_key.clone(),
                config.request_timeout,
            )
            .map_err(AnalysisError::config)?;
            provider = provider.with_remote(Box::new(source));
        }

        let estimator: Box<dyn RooftopEstimator> = if config.use_live_estimator() {
            let settings = config.vision_settings().ok_or_else(|| {
                AnalysisError::Config("live estimator requires OPENROUTER_API_KEY".to_string())
            })?;
            info!("Using live vision estimator (model: {})", settings.model);
            Box::new(VisionEstimator::new(settings).map_err(AnalysisError::config)?)
        } else {
            info!("Using mock rooftop estimator (no live vision API configured)");
            Box::new(MockEstimator::new())
        };

        let mut pipeline = Self::new(provider, estimator, config.constants);
        if let Some(fallback) = config.fallback_coordinate {
            pipeline = pipeline.with_fallback(fallback);
        }
        Ok(pipeline)
    }

    pub fn provider(&self) -> &ImageProvider {
        &self.provider
    }

    pub fn estimator_name(&self) -> &'static str {
        self.estimator.name()
    }

    pub fn constants(&self) -> &SolarConstants {
        &self.constants
    }

    pub fn fallback(&self) -> Option<Coordinate> {
        self.fallback
    }

    /// Run every stage. Any failure aborts the run with a single error.
    pub async fn run(&self, request: AnalysisRequest) -> Result<AnalysisReport> {
        let start = Instant::now();

        validate_rate(request.electricity_rate)?;
        let coordinate = Coordinate::new(request.latitude, request.longitude)?;

        info!(
            "Analyzing rooftop at {} (rate ${}/kWh)",
            coordinate, request.electricity_rate
        );

        let resolved = self.resolve_image(&coordinate, request.allow_fallback).await?;
        let image_coordinate = resolved
            .substituted_for
            .map(|_| resolved.image.coordinate());

        let estimate = self.estimator.estimate(&resolved.image).await?;
        let metrics = compute(estimate.area_m2(), request.electricity_rate, &self.constants)?;
        let recommendation = generate(&metrics, &estimate);

        info!(
            "Analysis complete for {} in {}ms: {:.2} m², {:.2} kW, {} panels",
            coordinate,
            start.elapsed().as_millis(),
            estimate.area_m2(),
            metrics.potential_kw,
            metrics.panel_count
        );

        Ok(AnalysisReport {
            analysis_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            coordinate,
            electricity_rate: request.electricity_rate,
            image_coordinate,
            estimator: self.estimator.name(),
            image: resolved.image,
            estimate,
            metrics,
            recommendation,
        })
    }

    async fn resolve_image(
        &self,
        coordinate: &Coordinate,
        allow_fallback: bool,
    ) -> Result<ResolvedImage> {
        match (allow_fallback, self.fallback) {
            (true, Some(fallback)) => {
                let resolved = self
                    .provider
                    .resolve_or_substitute(coordinate, &fallback)
                    .await?;
                if resolved.substituted_for.is_some() {
                    warn!(
                        "Analysis for {} uses imagery of {} (explicit fallback)",
                        coordinate,
                        resolved.image.coordinate()
                    );
                }
                Ok(resolved)
            }
            (true, None) => {
                warn!("Fallback requested but no fallback coordinate is configured");
                self.resolve_exact(coordinate).await
            }
            (false, _) => self.resolve_exact(coordinate).await,
        }
    }

    async fn resolve_exact(&self, coordinate: &Coordinate) -> Result<ResolvedImage> {
        let image = self.provider.resolve(coordinate).await?;
        Ok(ResolvedImage {
            image,
            substituted_for: None,
        })
    }
}
