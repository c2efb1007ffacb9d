use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

pub const WATTS_PER_KILOWATT: f64 = 1000.0;

/// Named inputs to the solar formula. Defaults describe a 20%-efficient
/// panel under a 1000 W/m² reference irradiance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolarConstants {
    /// Rated output per square metre of panel (W/m²)
    pub panel_output_w_per_m2: f64,
    /// Footprint of one panel (m²)
    pub panel_area_m2: f64,
    /// Equivalent hours of full-intensity sunlight per day
    pub peak_sun_hours_per_day: f64,
    /// Installed cost per kW of capacity (USD)
    pub cost_per_kw_usd: f64,
    pub days_per_year: f64,
}

impl Default for SolarConstants {
    fn default() -> Self {
        Self {
            panel_output_w_per_m2: 200.0,
            panel_area_m2: 1.6,
            peak_sun_hours_per_day: 5.0,
            cost_per_kw_usd: 1000.0,
            days_per_year: 365.0,
        }
    }
}

impl SolarConstants {
    /// Every constant must be finite and strictly positive
    pub fn validate(&self) -> Result<()> {
        let named = [
            ("panel_output_w_per_m2", self.panel_output_w_per_m2),
            ("panel_area_m2", self.panel_area_m2),
            ("peak_sun_hours_per_day", self.peak_sun_hours_per_day),
            ("cost_per_kw_usd", self.cost_per_kw_usd),
            ("days_per_year", self.days_per_year),
        ];

        for (name, value) in named {
            if !value.is_finite() || value <= 0.0 {
                return Err(AnalysisError::Config(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

/// Derived energy, cost and savings figures for one rooftop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolarMetrics {
    pub potential_kw: f64,
    pub panel_count: u64,
    pub annual_energy_kwh: f64,
    pub install_cost_usd: f64,
    pub annual_savings_usd: f64,
    /// `None` when there are no savings to pay the installation back
    pub payback_years: Option<f64>,
}

/// Reject non-positive or non-finite electricity rates
pub fn validate_rate(electricity_rate_usd_per_kwh: f64) -> Result<()> {
    if !electricity_rate_usd_per_kwh.is_finite() || electricity_rate_usd_per_kwh <= 0.0 {
        return Err(AnalysisError::InvalidInput(format!(
            "electricity rate must be greater than 0 $/kWh, got {}",
            electricity_rate_usd_per_kwh
        )));
    }
    Ok(())
}

/// Map rooftop area and electricity rate to solar metrics
pub fn compute(
    area_m2: f64,
    electricity_rate_usd_per_kwh: f64,
    constants: &SolarConstants,
) -> Result<SolarMetrics> {
    if !area_m2.is_finite() || area_m2 < 0.0 {
        return Err(AnalysisError::InvalidInput(format!(
            "rooftop area must be a finite number >= 0 m², got {}",
            area_m2
        )));
    }
    validate_rate(electricity_rate_usd_per_kwh)?;

    let potential_kw = area_m2 * constants.panel_output_w_per_m2 / WATTS_PER_KILOWATT;
    let panel_count = (area_m2 / constants.panel_area_m2).floor() as u64;
    let annual_energy_kwh =
        potential_kw * constants.peak_sun_hours_per_day * constants.days_per_year;
    let install_cost_usd = potential_kw * constants.cost_per_kw_usd;
    let annual_savings_usd = annual_energy_kwh * electricity_rate_usd_per_kwh;

    let derived = [
        ("potential_kw", potential_kw),
        ("annual_energy_kwh", annual_energy_kwh),
        ("install_cost_usd", install_cost_usd),
        ("annual_savings_usd", annual_savings_usd),
    ];
    if let Some((name, value)) = derived.iter().find(|(_, v)| !v.is_finite()) {
        return Err(AnalysisError::InvalidInput(format!(
            "rooftop area {} m² is out of range ({} = {})",
            area_m2, name, value
        )));
    }

    let payback_years = if annual_savings_usd > 0.0 {
        Some(install_cost_usd / annual_savings_usd)
    } else {
        None
    };
    if let Some(years) = payback_years.filter(|y| !y.is_finite()) {
        return Err(AnalysisError::InvalidInput(format!(
            "payback period is out of range ({} years) for area {} m² at ${}/kWh",
            years, area_m2, electricity_rate_usd_per_kwh
        )));
    }

    Ok(SolarMetrics {
        potential_kw,
        panel_count,
        annual_energy_kwh,
        install_cost_usd,
        annual_savings_usd,
        payback_years,
    })
}
