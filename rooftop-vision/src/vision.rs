use crate::preprocess::prepare_for_inference;
use crate::{EstimationError, RooftopEstimate, RooftopEstimator};
use async_trait::async_trait;
use reqwest::Client;
use rooftop_imagery::RooftopImage;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "openai/gpt-4o";

const ROOFTOP_PROMPT: &str = "Analyze this satellite image (1m resolution) for a rooftop suitable for solar panel installation. \
Look for distinct rectangular or polygonal shapes that indicate building rooftops, avoiding areas with vegetation or irregular terrain. \
Estimate the rooftop area in square meters (assume 1m/pixel). \
Return ONLY a valid JSON object with: \
- `total_area_m2`: Estimated rooftop area in square meters (numeric, rounded to 2 decimal places). \
- `description`: Brief description of the rooftop (e.g., shape, obstructions, clarity of detection, max 100 words). \
- `confidence`: Confidence score (0-1) for the detection accuracy. \
If no rooftop is detected, return `total_area_m2` as 0, set `confidence` to 0, and explain why in `description` \
(e.g., image too unclear, no distinct rooftops).";

/// Connection settings for a chat-completions style vision endpoint
#[derive(Debug, Clone)]
pub struct VisionSettings {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    /// Single deadline for the whole request; there is no retry
    pub timeout: Duration,
    pub max_tokens: u32,
}

impl VisionSettings {
    pub fn new(api_key: String) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(60),
            max_tokens: 1000,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: Vec<ContentItem>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentItem {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Rooftop estimator backed by a live vision-capable LLM
pub struct VisionEstimator {
    client: Client,
    settings: VisionSettings,
}

impl VisionEstimator {
    pub fn new(settings: VisionSettings) -> Result<Self, EstimationError> {
        if settings.api_key.trim().is_empty() {
            return Err(EstimationError::Config(
                "vision API key is empty".to_string(),
            ));
        }

        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { client, settings })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    fn build_request(&self, image_data_url: String) -> ChatRequest<'_> {
        ChatRequest {
            model: &self.settings.model,
            messages: vec![Message {
                role: "user".to_string(),
                content: vec![
                    ContentItem::Text {
                        text: ROOFTOP_PROMPT.to_string(),
                    },
                    ContentItem::ImageUrl {
                        image_url: ImageUrl {
                            url: image_data_url,
                        },
                    },
                ],
            }],
            max_tokens: self.settings.max_tokens,
        }
    }
}

#[async_trait]
impl RooftopEstimator for VisionEstimator {
    async fn estimate(&self, image: &RooftopImage) -> Result<RooftopEstimate, EstimationError> {
        info!(
            "Estimating rooftop at {} with vision model {}",
            image.coordinate(),
            self.settings.model
        );

        let data_url = prepare_for_inference(image)?;
        let request_body = self.build_request(data_url);

        let response = self
            .client
            .post(&self.settings.api_url)
            .header("Authorization", format!("Bearer {}", self.settings.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Vision API error: {} - {}", status, body);
            return Err(EstimationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let api_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| EstimationError::Malformed(format!("response is not chat JSON: {}", e)))?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(EstimationError::EmptyResponse)?;

        debug!("Vision model replied: {}", content);

        let estimate = parse_estimate(&content)?;
        info!(
            "Vision estimate: {:.2} m² (confidence {:.2})",
            estimate.area_m2(),
            estimate.confidence()
        );

        Ok(estimate)
    }

    fn name(&self) -> &'static str {
        "vision"
    }
}

/// Parse the model's reply into a validated estimate.
///
/// Expects `{total_area_m2, description, confidence}`; numeric fields may be
/// JSON numbers or numeric strings.
pub fn parse_estimate(content: &str) -> Result<RooftopEstimate, EstimationError> {
    let json_str = extract_json_from_response(content);

    let value: Value = serde_json::from_str(json_str).map_err(|e| {
        EstimationError::Malformed(format!("{}. Response: {}", e, json_str))
    })?;

    let area_m2 = number_field(&value, "total_area_m2")?;
    let confidence = number_field(&value, "confidence")?;
    let description = value
        .get("description")
        .and_then(Value::as_str)
        .ok_or_else(|| EstimationError::Malformed("missing `description`".to_string()))?;

    RooftopEstimate::new(area_m2, description.trim(), confidence)
}

fn number_field(value: &Value, key: &str) -> Result<f64, EstimationError> {
    match value.get(key) {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| EstimationError::Malformed(format!("`{}` is not representable", key))),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| EstimationError::Malformed(format!("`{}` is not numeric: {:?}", key, s))),
        Some(other) => Err(EstimationError::Malformed(format!(
            "`{}` has unexpected type: {}",
            key, other
        ))),
        None => Err(EstimationError::Malformed(format!("missing `{}`", key))),
    }
}

/// Extract JSON from a model reply (handles markdown code blocks)
fn extract_json_from_response(content: &str) -> &str {
    let trimmed = content.trim();

    if let Some(rest) = trimmed.strip_prefix("```") {
        // Skip the fence's language tag line, keep everything up to the closing fence
        let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
        let body = body.rsplit_once("```").map(|(inner, _)| inner).unwrap_or(body);
        body.trim()
    } else {
        trimmed
    }
}
