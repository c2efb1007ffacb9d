//! Rooftop solar analysis
//!
//! Resolves an aerial image for a coordinate, estimates the usable rooftop
//! area, derives solar metrics and renders installation guidance.

pub mod batch;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod recommendation;
pub mod report;

pub use batch::{read_batch, read_batch_file, run_batch, BatchOutcome, BatchRow, BatchSummary};
pub use config::{AnalysisConfig, EstimatorMode};
pub use error::{AnalysisError, Result};
pub use metrics::{compute, SolarConstants, SolarMetrics};
pub use pipeline::{AnalysisReport, AnalysisRequest, SolarPipeline};
pub use recommendation::{generate, Recommendation, RecommendationCategory, RecommendationEntry};
pub use report::render_text;
