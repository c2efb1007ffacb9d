use crate::pipeline::AnalysisReport;

/// Confidence below which the report suggests an on-site inspection
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.8;

/// Render a report as human-readable text
pub fn render_text(report: &AnalysisReport) -> String {
    let metrics = &report.metrics;
    let estimate = &report.estimate;

    let mut lines = vec![
        "**Rooftop Solar Potential Analysis**".to_string(),
        format!("Location: {}", report.coordinate),
    ];
    if let Some(image_coordinate) = report.image_coordinate {
        lines.push(format!(
            "**Notice**: No imagery exists for the requested location. \
             Results below are based on imagery of {} instead.",
            image_coordinate
        ));
    }

    lines.extend([
        String::new(),
        format!("**Rooftop Description**: {}", estimate.description()),
        String::new(),
        format!("**Rooftop Area Detected**: {:.2} m²", estimate.area_m2()),
        format!("**Number of Panels**: {}", metrics.panel_count),
        format!("**Solar Potential**: {:.2} kW", metrics.potential_kw),
        format!("**Electricity Rate**: ${}/kWh", report.electricity_rate),
    ]);

    for entry in report.recommendation.entries() {
        lines.extend([String::new(), format!("**{}**", entry.title), entry.text.clone()]);
    }

    lines.extend([
        String::new(),
        "**Analysis Confidence**".to_string(),
        format!(
            "Analysis Confidence: {:.2} ({} estimator)",
            estimate.confidence(),
            report.estimator
        ),
    ]);
    if estimate.confidence() < LOW_CONFIDENCE_THRESHOLD {
        lines.push(format!(
            "- Note: Confidence below {:.1} may indicate unclear imagery or complex rooftop \
             structures. Consider an on-site inspection for accuracy.",
            LOW_CONFIDENCE_THRESHOLD
        ));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
