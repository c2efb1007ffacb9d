//! Templated installation guidance.
//!
//! The category set and order never depend on the input; only the figures
//! quoted inside the text do.

use crate::metrics::SolarMetrics;
use rooftop_vision::RooftopEstimate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationCategory {
    Technology,
    Installation,
    Maintenance,
    Roi,
    Regulation,
    MarketTrends,
}

impl RecommendationCategory {
    pub const ALL: [RecommendationCategory; 6] = [
        Self::Technology,
        Self::Installation,
        Self::Maintenance,
        Self::Roi,
        Self::Regulation,
        Self::MarketTrends,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Self::Technology => "Solar Panel Technology",
            Self::Installation => "Installation Process",
            Self::Maintenance => "Maintenance Requirements",
            Self::Roi => "Cost & ROI Analysis",
            Self::Regulation => "Industry Regulations",
            Self::MarketTrends => "Market Trends",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationEntry {
    pub category: RecommendationCategory,
    pub title: &'static str,
    pub text: String,
}

/// Ordered guidance, one entry per [`RecommendationCategory`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Recommendation {
    entries: Vec<RecommendationEntry>,
}

impl Recommendation {
    pub fn entries(&self) -> &[RecommendationEntry] {
        &self.entries
    }

    pub fn get(&self, category: RecommendationCategory) -> Option<&RecommendationEntry> {
        self.entries.iter().find(|e| e.category == category)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Produce the six-category recommendation for a rooftop
pub fn generate(metrics: &SolarMetrics, estimate: &RooftopEstimate) -> Recommendation {
    let entries = RecommendationCategory::ALL
        .iter()
        .map(|&category| RecommendationEntry {
            category,
            title: category.title(),
            text: match category {
                RecommendationCategory::Technology => technology(metrics, estimate),
                RecommendationCategory::Installation => installation(metrics),
                RecommendationCategory::Maintenance => maintenance(),
                RecommendationCategory::Roi => roi(metrics),
                RecommendationCategory::Regulation => regulation(),
                RecommendationCategory::MarketTrends => market_trends(),
            },
        })
        .collect();

    Recommendation { entries }
}

fn technology(metrics: &SolarMetrics, estimate: &RooftopEstimate) -> String {
    if metrics.panel_count == 0 {
        return format!(
            "No usable rooftop area was detected for a panel installation ({:.2} m² estimated).\n\
             - Verify the image clarity or try a different location with better visibility.\n\
             - Ensure the area has distinct rooftops, not obscured by vegetation or terrain.\n\
             - Alternatively, consult a local solar professional for an on-site assessment.",
            estimate.area_m2()
        );
    }

    format!(
        "Recommended Solar Panels: Monocrystalline panels (e.g., 400W, 20% efficiency).\n\
         - Layout: about {} panels for {:.2} kW of capacity.\n\
         - Advantages: High efficiency, long lifespan (25+ years), performs well in low light.\n\
         - Consider bifacial modules on flat roofs where the mounting height allows rear-side gain.",
        metrics.panel_count, metrics.potential_kw
    )
}

fn installation(metrics: &SolarMetrics) -> String {
    let timeline = if metrics.potential_kw > 50.0 {
        "3-6 weeks for a system of this size"
    } else {
        "1-2 weeks"
    };

    format!(
        "Installation Process:\n\
         - Mounting: Use racking systems compatible with your roof type (e.g., asphalt shingle, metal, concrete).\n\
         - Electrical: Requires an inverter (string or microinverters) and connection to the grid.\n\
         - Permits: Obtain local building permits and utility interconnection agreements.\n\
         - Timeline: Typically {}.",
        timeline
    )
}

fn maintenance() -> String {
    "Maintenance Requirements:\n\
     - Monitoring: Install a monitoring system to track energy production.\n\
     - Cleaning: Clean panels 1-2 times/year to remove dust/debris (use soft brushes, water).\n\
     - Warranties: Panels typically come with 25-year performance warranties; inverters 5-10 years."
        .to_string()
}

fn roi(metrics: &SolarMetrics) -> String {
    let payback = match metrics.payback_years {
        Some(years) => format!("{:.2} years", years),
        None => "not applicable (no annual savings to recover the installation cost)".to_string(),
    };

    format!(
        "Cost & ROI Analysis:\n\
         - Installation Cost: ${:.2}.\n\
         - Annual Energy Production: {:.2} kWh.\n\
         - Annual Savings: ${:.2}.\n\
         - Payback Period: {}.\n\
         - Incentives: Check for local incentives (e.g., tax credits, rebates, net metering).",
        metrics.install_cost_usd, metrics.annual_energy_kwh, metrics.annual_savings_usd, payback
    )
}

fn regulation() -> String {
    "Industry Regulations:\n\
     - Codes: Comply with local building codes (e.g., IS 875 for structural safety in India).\n\
     - Net Metering: Where available, excess energy can be sold back to the grid.\n\
     - Safety: Ensure proper grounding and use certified installers (e.g., MNRE-approved in India)."
        .to_string()
}

fn market_trends() -> String {
    "Market Trends:\n\
     - Technology Advances: Bifacial panels and home energy storage are gaining popularity.\n\
     - Adoption Rates: Residential solar adoption is growing quickly, driven by government initiatives \
     (e.g., PM Surya Ghar Yojana in India).\n\
     - Cost Decline: Panel prices keep falling, making installations more affordable."
        .to_string()
}
