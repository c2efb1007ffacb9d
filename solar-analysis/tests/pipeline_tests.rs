use async_trait::async_trait;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use rooftop_imagery::{Coordinate, ImageProvider, LocalImageStore, RooftopImage};
use rooftop_vision::{EstimationError, MockEstimator, RooftopEstimate, RooftopEstimator};
use solar_analysis::{
    render_text, run_batch, AnalysisError, AnalysisRequest, BatchRow, RecommendationCategory,
    SolarConstants, SolarPipeline,
};
use std::io::Cursor;
use tempfile::TempDir;

const LAT: f64 = 27.7778;
const LON: f64 = 78.8667;

fn roof_png() -> Vec<u8> {
    let img = ImageBuffer::from_fn(32, 32, |x, y| {
        if (8..24).contains(&x) && (8..24).contains(&y) {
            Rgb([180u8, 60u8, 40u8])
        } else {
            Rgb([40u8, 120u8, 40u8])
        }
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn seeded_store(coordinates: &[(f64, f64)]) -> (TempDir, LocalImageStore) {
    let dir = TempDir::new().unwrap();
    let store = LocalImageStore::new(dir.path());
    for &(lat, lon) in coordinates {
        let coordinate = Coordinate::new(lat, lon).unwrap();
        let image = RooftopImage::from_bytes(coordinate, roof_png()).unwrap();
        store.save(&image).unwrap();
    }
    (dir, store)
}

fn mock_pipeline(store: LocalImageStore) -> SolarPipeline {
    SolarPipeline::new(
        ImageProvider::new(store),
        Box::new(MockEstimator::new()),
        SolarConstants::default(),
    )
}

struct FailingEstimator;

#[async_trait]
impl RooftopEstimator for FailingEstimator {
    async fn estimate(&self, _image: &RooftopImage) -> Result<RooftopEstimate, EstimationError> {
        Err(EstimationError::Malformed("model returned prose".to_string()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

struct FixedEstimator(f64);

#[async_trait]
impl RooftopEstimator for FixedEstimator {
    async fn estimate(&self, _image: &RooftopImage) -> Result<RooftopEstimate, EstimationError> {
        RooftopEstimate::new(self.0, "fixed", 0.6)
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

#[tokio::test]
async fn test_mock_run_reference_figures() {
    let (_dir, store) = seeded_store(&[(LAT, LON)]);
    let pipeline = mock_pipeline(store);

    let report = pipeline
        .run(AnalysisRequest::new(LAT, LON, 0.104))
        .await
        .unwrap();

    assert_eq!(report.estimator, "mock");
    assert_eq!(report.estimate.area_m2(), 120.0);
    assert_eq!(report.estimate.confidence(), 0.85);

    let m = &report.metrics;
    assert!((m.potential_kw - 24.0).abs() < 1e-9);
    assert_eq!(m.panel_count, 75);
    assert!((m.annual_energy_kwh - 43_800.0).abs() < 1e-6);
    assert!((m.install_cost_usd - 24_000.0).abs() < 1e-6);
    assert!((m.annual_savings_usd - 4_555.2).abs() < 1e-6);
    assert!((m.payback_years.unwrap() - 5.2687).abs() < 1e-3);

    assert_eq!(report.recommendation.len(), 6);
    assert!(!report.is_substituted());
    assert_eq!(report.image.coordinate().cache_key(), "27.7778_78.8667");
}

#[tokio::test]
async fn test_mock_run_is_deterministic() {
    let (_dir, store) = seeded_store(&[(LAT, LON)]);
    let pipeline = mock_pipeline(store);

    let first = pipeline.run(AnalysisRequest::new(LAT, LON, 0.12)).await.unwrap();
    let second = pipeline.run(AnalysisRequest::new(LAT, LON, 0.12)).await.unwrap();

    assert_eq!(first.metrics, second.metrics);
    assert_eq!(first.recommendation, second.recommendation);
    assert_eq!(render_text(&first), render_text(&second));
    assert_ne!(first.analysis_id, second.analysis_id);
}

#[tokio::test]
async fn test_invalid_rate_rejected_before_image_lookup() {
    // Empty store: a rate error must win over the missing image
    let (_dir, store) = seeded_store(&[]);
    let pipeline = mock_pipeline(store);

    for rate in [0.0, -0.1, f64::NAN] {
        let err = pipeline
            .run(AnalysisRequest::new(LAT, LON, rate))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)), "rate {rate}: {err}");
    }
}

#[tokio::test]
async fn test_invalid_coordinate() {
    let (_dir, store) = seeded_store(&[]);
    let pipeline = mock_pipeline(store);

    let err = pipeline
        .run(AnalysisRequest::new(91.0, LON, 0.1))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_INPUT");
}

#[tokio::test]
async fn test_missing_image_without_fallback() {
    let (_dir, store) = seeded_store(&[(LAT, LON)]);
    let pipeline = mock_pipeline(store).with_fallback(Coordinate::new(LAT, LON).unwrap());

    // Fallback is configured but not requested
    let err = pipeline
        .run(AnalysisRequest::new(10.0, 20.0, 0.1))
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::ImageUnavailable(_)));
    assert!(err.to_string().contains("10.0000_20.0000"));
}

#[tokio::test]
async fn test_explicit_fallback_is_surfaced() {
    let (_dir, store) = seeded_store(&[(LAT, LON)]);
    let pipeline = mock_pipeline(store).with_fallback(Coordinate::new(LAT, LON).unwrap());

    let report = pipeline
        .run(AnalysisRequest::new(10.0, 20.0, 0.1).with_fallback(true))
        .await
        .unwrap();

    assert!(report.is_substituted());
    assert_eq!(report.coordinate.cache_key(), "10.0000_20.0000");
    assert_eq!(
        report.image_coordinate.map(|c| c.cache_key()),
        Some("27.7778_78.8667".to_string())
    );
    assert!(render_text(&report).contains("**Notice**"));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["image_coordinate"]["latitude"], 27.7778);
}

#[tokio::test]
async fn test_fallback_requested_but_not_configured() {
    let (_dir, store) = seeded_store(&[]);
    let pipeline = mock_pipeline(store);

    let err = pipeline
        .run(AnalysisRequest::new(10.0, 20.0, 0.1).with_fallback(true))
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::ImageUnavailable(_)));
}

#[tokio::test]
async fn test_estimator_failure_aborts_run() {
    let (_dir, store) = seeded_store(&[(LAT, LON)]);
    let pipeline = SolarPipeline::new(
        ImageProvider::new(store),
        Box::new(FailingEstimator),
        SolarConstants::default(),
    );

    let err = pipeline
        .run(AnalysisRequest::new(LAT, LON, 0.1))
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::Estimation(_)));
    assert_eq!(err.code(), "ESTIMATION_FAILED");
}

#[tokio::test]
async fn test_zero_area_estimate() {
    let (_dir, store) = seeded_store(&[(LAT, LON)]);
    let pipeline = SolarPipeline::new(
        ImageProvider::new(store),
        Box::new(FixedEstimator(0.0)),
        SolarConstants::default(),
    );

    let report = pipeline.run(AnalysisRequest::new(LAT, LON, 0.1)).await.unwrap();

    assert_eq!(report.metrics.panel_count, 0);
    assert_eq!(report.metrics.potential_kw, 0.0);
    assert_eq!(report.metrics.payback_years, None);
    let tech = report
        .recommendation
        .get(RecommendationCategory::Technology)
        .unwrap();
    assert!(tech.text.contains("on-site assessment"));

    let text = render_text(&report);
    assert!(text.contains("**Number of Panels**: 0"));
    assert!(text.contains("Consider an on-site inspection"));
}

#[tokio::test]
async fn test_batch_records_failures_and_continues() {
    let (_dir, store) = seeded_store(&[(LAT, LON)]);
    let pipeline = mock_pipeline(store);

    let rows = vec![
        BatchRow { latitude: LAT, longitude: LON, electricity_rate: None },
        BatchRow { latitude: 10.0, longitude: 20.0, electricity_rate: Some(0.2) },
        BatchRow { latitude: LAT, longitude: LON, electricity_rate: Some(-1.0) },
    ];

    let summary = run_batch(&pipeline, &rows, 0.104, false).await;

    assert_eq!(summary.total, 3);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.outcomes[0].electricity_rate, 0.104);
    assert_eq!(summary.outcomes[0].panel_count, Some(75));
    assert_eq!(summary.outcomes[1].error_code, Some("IMAGE_UNAVAILABLE"));
    assert_eq!(summary.outcomes[2].error_code, Some("INVALID_INPUT"));
    assert!((summary.total_potential_kw - 24.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_overflowing_estimate_is_rejected() {
    let (_dir, store) = seeded_store(&[(LAT, LON)]);
    let pipeline = SolarPipeline::new(
        ImageProvider::new(store),
        Box::new(FixedEstimator(1e307)),
        SolarConstants::default(),
    );

    let err = pipeline
        .run(AnalysisRequest::new(LAT, LON, 0.12))
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidInput(_)), "{err}");
}
