use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Json, State},
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use rooftop_imagery::Coordinate;
use rooftop_vision::RooftopEstimate;
use serde::{Deserialize, Serialize};
use solar_analysis::{
    render_text, AnalysisError, AnalysisReport, AnalysisRequest, Recommendation, SolarMetrics,
    SolarPipeline,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

const DEFAULT_ALLOWED_ORIGINS: &str =
    "http://localhost:8080,http://127.0.0.1:8080,http://localhost:7860,http://127.0.0.1:7860";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<SolarPipeline>,
    /// Rate applied when a request omits one
    pub default_electricity_rate: f64,
}

impl AppState {
    pub fn new(pipeline: SolarPipeline, default_electricity_rate: f64) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            default_electricity_rate,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub electricity_rate: Option<f64>,
    #[serde(default)]
    pub allow_fallback: bool,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub analysis_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub coordinate: Coordinate,
    pub electricity_rate: f64,
    pub image_coordinate: Option<Coordinate>,
    pub estimator: &'static str,
    pub estimate: RooftopEstimate,
    pub metrics: SolarMetrics,
    pub recommendation: Recommendation,
    /// Analysed image as a `data:` URL
    pub image: String,
    pub report: String,
}

impl From<AnalysisReport> for AnalyzeResponse {
    fn from(report: AnalysisReport) -> Self {
        let rendered = render_text(&report);
        Self {
            analysis_id: report.analysis_id,
            generated_at: report.generated_at,
            coordinate: report.coordinate,
            electricity_rate: report.electricity_rate,
            image_coordinate: report.image_coordinate,
            estimator: report.estimator,
            image: report.image.to_data_url(),
            estimate: report.estimate,
            metrics: report.metrics,
            recommendation: report.recommendation,
            report: rendered,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    estimator: &'static str,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(err: AnalysisError) -> ApiError {
    let status = match &err {
        AnalysisError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        AnalysisError::ImageUnavailable(_) => StatusCode::NOT_FOUND,
        AnalysisError::Estimation(_) => StatusCode::BAD_GATEWAY,
        AnalysisError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    warn!("Analysis failed ({}): {}", status, err);

    (
        status,
        Json(ErrorResponse {
            error: err.code().to_string(),
            message: err.to_string(),
        }),
    )
}

fn rejection_response(rejection: JsonRejection) -> ApiError {
    let status = rejection.status();
    warn!("Rejected request body ({}): {}", status, rejection.body_text());

    (
        status,
        Json(ErrorResponse {
            error: "INVALID_REQUEST_BODY".to_string(),
            message: rejection.body_text(),
        }),
    )
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        estimator: state.pipeline.estimator_name(),
    })
}

async fn run_analysis(
    state: &AppState,
    request: AnalyzeRequest,
) -> Result<AnalysisReport, ApiError> {
    info!(
        "Received analysis request for ({}, {})",
        request.latitude, request.longitude
    );

    let rate = request
        .electricity_rate
        .unwrap_or(state.default_electricity_rate);
    let request = AnalysisRequest::new(request.latitude, request.longitude, rate)
        .with_fallback(request.allow_fallback);

    state.pipeline.run(request).await.map_err(error_response)
}

async fn analyze_handler(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Json(request) = payload.map_err(rejection_response)?;
    let report = run_analysis(&state, request).await?;
    Ok(Json(report.into()))
}

async fn analyze_report_handler(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload.map_err(rejection_response)?;
    let report = run_analysis(&state, request).await?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        render_text(&report),
    ))
}

fn cors_layer(allowed_origins: &str) -> CorsLayer {
    let origins: Vec<_> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}

/// Build the router. CORS origins come from `ALLOWED_ORIGINS`.
pub fn create_app(state: AppState) -> Router {
    let allowed_origins = std::env::var("ALLOWED_ORIGINS")
        .unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.to_string());

    Router::new()
        .route("/health", get(health_check))
        .route("/analyze", post(analyze_handler))
        .route("/analyze/report", post(analyze_report_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer(&allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
