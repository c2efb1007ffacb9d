use crate::pipeline::{AnalysisRequest, SolarPipeline};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// One row of a batch file: `latitude,longitude[,electricity_rate]`
#[derive(Debug, Clone, Deserialize)]
pub struct BatchRow {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub electricity_rate: Option<f64>,
}

/// Outcome of analysing a single batch row
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub latitude: f64,
    pub longitude: f64,
    pub electricity_rate: f64,
    pub success: bool,
    pub area_m2: Option<f64>,
    pub potential_kw: Option<f64>,
    pub panel_count: Option<u64>,
    pub annual_savings_usd: Option<f64>,
    pub payback_years: Option<f64>,
    pub substituted: bool,
    pub error_code: Option<&'static str>,
    pub error: Option<String>,
}

/// Aggregate results for a batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_potential_kw: f64,
    pub outcomes: Vec<BatchOutcome>,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: Vec<BatchOutcome>) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.success).count();
        let total_potential_kw = outcomes.iter().filter_map(|o| o.potential_kw).sum();

        Self {
            total: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            total_potential_kw,
            outcomes,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.succeeded as f64 / self.total as f64) * 100.0
        }
    }
}

/// Parse batch rows from a CSV file with a header line
pub fn read_batch_file(path: &Path) -> Result<Vec<BatchRow>, csv::Error> {
    let reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;
    collect_rows(reader)
}

/// Parse batch rows from any CSV reader
pub fn read_batch<R: Read>(input: R) -> Result<Vec<BatchRow>, csv::Error> {
    let reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(input);
    collect_rows(reader)
}

fn collect_rows<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<BatchRow>, csv::Error> {
    reader.deserialize().collect()
}

/// Analyse each row in turn. A failing row is recorded and does not stop the batch.
pub async fn run_batch(
    pipeline: &SolarPipeline,
    rows: &[BatchRow],
    default_rate: f64,
    allow_fallback: bool,
) -> BatchSummary {
    let mut outcomes = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        let rate = row.electricity_rate.unwrap_or(default_rate);
        let request =
            AnalysisRequest::new(row.latitude, row.longitude, rate).with_fallback(allow_fallback);

        info!("Batch row {}/{}: ({}, {})", i + 1, rows.len(), row.latitude, row.longitude);

        let outcome = match pipeline.run(request).await {
            Ok(report) => BatchOutcome {
                latitude: row.latitude,
                longitude: row.longitude,
                electricity_rate: rate,
                success: true,
                area_m2: Some(report.estimate.area_m2()),
                potential_kw: Some(report.metrics.potential_kw),
                panel_count: Some(report.metrics.panel_count),
                annual_savings_usd: Some(report.metrics.annual_savings_usd),
                payback_years: report.metrics.payback_years,
                substituted: report.is_substituted(),
                error_code: None,
                error: None,
            },
            Err(e) => {
                warn!("Batch row {} failed: {}", i + 1, e);
                BatchOutcome {
                    latitude: row.latitude,
                    longitude: row.longitude,
                    electricity_rate: rate,
                    success: false,
                    area_m2: None,
                    potential_kw: None,
                    panel_count: None,
                    annual_savings_usd: None,
                    payback_years: None,
                    substituted: false,
                    error_code: Some(e.code()),
                    error: Some(e.to_string()),
                }
            }
        };

        outcomes.push(outcome);
    }

    BatchSummary::from_outcomes(outcomes)
}
