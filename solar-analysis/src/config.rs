use crate::error::{AnalysisError, Result};
use crate::metrics::{validate_rate, SolarConstants};
use rooftop_imagery::Coordinate;
use rooftop_vision::vision::{DEFAULT_API_URL, DEFAULT_MODEL};
use rooftop_vision::VisionSettings;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// How the rooftop estimator is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimatorMode {
    /// Live when a credential is configured, mock otherwise
    Auto,
    Live,
    Mock,
}

impl FromStr for EstimatorMode {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => Ok(Self::Auto),
            "live" => Ok(Self::Live),
            "mock" => Ok(Self::Mock),
            other => Err(AnalysisError::Config(format!(
                "VISION_MODE must be auto, live or mock, got {:?}",
                other
            ))),
        }
    }
}

/// Externally supplied settings for one pipeline
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub image_dir: PathBuf,
    pub imagery_url: Option<String>,
    pub imagery_api_key: Option<String>,
    pub vision_mode: EstimatorMode,
    pub vision_api_url: String,
    pub vision_api_key: Option<String>,
    pub vision_model: String,
    pub request_timeout: Duration,
    pub fallback_coordinate: Option<Coordinate>,
    pub default_electricity_rate: f64,
    pub constants: SolarConstants,
}

fn default_image_dir() -> PathBuf {
    PathBuf::from("./images")
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_electricity_rate() -> f64 {
    0.12
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            image_dir: default_image_dir(),
            imagery_url: None,
            imagery_api_key: None,
            vision_mode: EstimatorMode::Auto,
            vision_api_url: DEFAULT_API_URL.to_string(),
            vision_api_key: None,
            vision_model: DEFAULT_MODEL.to_string(),
            request_timeout: default_request_timeout(),
            fallback_coordinate: None,
            default_electricity_rate: default_electricity_rate(),
            constants: SolarConstants::default(),
        }
    }
}

impl AnalysisConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup. Unset or blank
    /// values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let number = |key: &str, default: f64| -> Result<f64> {
            match get(key) {
                Some(raw) => raw.parse::<f64>().map_err(|_| {
                    AnalysisError::Config(format!("{} must be a number, got {:?}", key, raw))
                }),
                None => Ok(default),
            }
        };

        let defaults = Self::default();
        let default_constants = defaults.constants;

        let constants = SolarConstants {
            panel_output_w_per_m2: number(
                "SOLAR_PANEL_OUTPUT_W_PER_M2",
                default_constants.panel_output_w_per_m2,
            )?,
            panel_area_m2: number("SOLAR_PANEL_AREA_M2", default_constants.panel_area_m2)?,
            peak_sun_hours_per_day: number(
                "SOLAR_PEAK_SUN_HOURS",
                default_constants.peak_sun_hours_per_day,
            )?,
            cost_per_kw_usd: number("SOLAR_COST_PER_KW_USD", default_constants.cost_per_kw_usd)?,
            days_per_year: number("SOLAR_DAYS_PER_YEAR", default_constants.days_per_year)?,
        };

        let timeout_secs = number(
            "REQUEST_TIMEOUT_SECS",
            defaults.request_timeout.as_secs_f64(),
        )?;
        if !timeout_secs.is_finite() || timeout_secs <= 0.0 {
            return Err(AnalysisError::Config(format!(
                "REQUEST_TIMEOUT_SECS must be positive, got {}",
                timeout_secs
            )));
        }
        let request_timeout = Duration::try_from_secs_f64(timeout_secs).map_err(|e| {
            AnalysisError::Config(format!(
                "REQUEST_TIMEOUT_SECS is out of range ({}): {}",
                timeout_secs, e
            ))
        })?;

        let fallback_coordinate = get("SOLAR_FALLBACK_COORDINATE")
            .map(|raw| {
                raw.parse::<Coordinate>().map_err(|_| {
                    AnalysisError::Config(format!(
                        "SOLAR_FALLBACK_COORDINATE must be \"lat,lon\", got {:?}",
                        raw
                    ))
                })
            })
            .transpose()?;

        let config = Self {
            image_dir: get("SOLAR_IMAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.image_dir),
            imagery_url: get("IMAGERY_URL"),
            imagery_api_key: get("IMAGERY_API_KEY"),
            vision_mode: get("VISION_MODE")
                .map(|raw| raw.parse::<EstimatorMode>())
                .transpose()?
                .unwrap_or(EstimatorMode::Auto),
            vision_api_url: get("VISION_API_URL").unwrap_or(defaults.vision_api_url),
            vision_api_key: get("OPENROUTER_API_KEY"),
            vision_model: get("VISION_MODEL").unwrap_or(defaults.vision_model),
            request_timeout,
            fallback_coordinate,
            default_electricity_rate: number(
                "SOLAR_ELECTRICITY_RATE",
                defaults.default_electricity_rate,
            )?,
            constants,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.constants.validate()?;
        validate_rate(self.default_electricity_rate)
            .map_err(|_| AnalysisError::Config(format!(
                "SOLAR_ELECTRICITY_RATE must be positive, got {}",
                self.default_electricity_rate
            )))?;

        if self.vision_mode == EstimatorMode::Live && self.vision_api_key.is_none() {
            return Err(AnalysisError::Config(
                "VISION_MODE=live requires OPENROUTER_API_KEY".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether the live vision estimator should be used
    pub fn use_live_estimator(&self) -> bool {
        match self.vision_mode {
            EstimatorMode::Live => true,
            EstimatorMode::Mock => false,
            EstimatorMode::Auto => self.vision_api_key.is_some(),
        }
    }

    /// Settings for the live estimator, if a credential is configured
    pub fn vision_settings(&self) -> Option<VisionSettings> {
        let api_key = self.vision_api_key.clone()?;
        let mut settings = VisionSettings::new(api_key);
        settings.api_url = self.vision_api_url.clone();
        settings.model = self.vision_model.clone();
        settings.timeout = self.request_timeout;
        Some(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AnalysisConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AnalysisConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.image_dir, PathBuf::from("./images"));
        assert_eq!(config.vision_mode, EstimatorMode::Auto);
        assert_eq!(config.vision_model, "openai/gpt-4o");
        assert_eq!(config.default_electricity_rate, 0.12);
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.constants, SolarConstants::default());
        assert!(config.imagery_url.is_none());
        assert!(config.fallback_coordinate.is_none());
        assert!(!config.use_live_estimator());
    }

    #[test]
    fn test_auto_mode_goes_live_with_credential() {
        let config = config_from(&[("OPENROUTER_API_KEY", "sk-or-test")]).unwrap();
        assert!(config.use_live_estimator());

        let settings = config.vision_settings().unwrap();
        assert_eq!(settings.api_key, "sk-or-test");
        assert_eq!(settings.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_explicit_mock_ignores_credential() {
        let config = config_from(&[("OPENROUTER_API_KEY", "sk-or-test"), ("VISION_MODE", "MOCK")])
            .unwrap();
        assert!(!config.use_live_estimator());
    }

    #[test]
    fn test_live_without_credential_is_rejected() {
        let result = config_from(&[("VISION_MODE", "live")]);
        assert!(matches!(result, Err(AnalysisError::Config(_))));
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        assert!(config_from(&[("VISION_MODE", "sometimes")]).is_err());
    }

    #[test]
    fn test_constants_from_environment() {
        let config = config_from(&[
            ("SOLAR_PANEL_OUTPUT_W_PER_M2", "180"),
            ("SOLAR_PANEL_AREA_M2", "1.7"),
            ("SOLAR_PEAK_SUN_HOURS", "4.5"),
            ("SOLAR_COST_PER_KW_USD", "1500"),
            ("SOLAR_DAYS_PER_YEAR", "360"),
        ])
        .unwrap();

        assert_eq!(config.constants.panel_output_w_per_m2, 180.0);
        assert_eq!(config.constants.panel_area_m2, 1.7);
        assert_eq!(config.constants.peak_sun_hours_per_day, 4.5);
        assert_eq!(config.constants.cost_per_kw_usd, 1500.0);
        assert_eq!(config.constants.days_per_year, 360.0);
    }

    #[test]
    fn test_bad_numbers_are_rejected() {
        assert!(config_from(&[("SOLAR_PANEL_AREA_M2", "big")]).is_err());
        assert!(config_from(&[("SOLAR_PANEL_AREA_M2", "-1.6")]).is_err());
        assert!(config_from(&[("SOLAR_ELECTRICITY_RATE", "0")]).is_err());
        assert!(config_from(&[("REQUEST_TIMEOUT_SECS", "0")]).is_err());
    }

    #[test]
    fn test_oversized_timeout_is_config_error() {
        let result = config_from(&[("REQUEST_TIMEOUT_SECS", "1e20")]);
        assert!(matches!(result, Err(AnalysisError::Config(_))));

        let config = config_from(&[("REQUEST_TIMEOUT_SECS", "2.5")]).unwrap();
        assert_eq!(config.request_timeout, Duration::from_millis(2500));
    }

    #[test]
    fn test_fallback_coordinate() {
        let config = config_from(&[("SOLAR_FALLBACK_COORDINATE", "27.7778,78.8667")]).unwrap();
        assert_eq!(
            config.fallback_coordinate.map(|c| c.cache_key()),
            Some("27.7778_78.8667".to_string())
        );

        assert!(config_from(&[("SOLAR_FALLBACK_COORDINATE", "somewhere")]).is_err());
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = config_from(&[("SOLAR_IMAGE_DIR", "  "), ("IMAGERY_URL", "")]).unwrap();
        assert_eq!(config.image_dir, PathBuf::from("./images"));
        assert!(config.imagery_url.is_none());
    }
}
