use crate::{Coordinate, ImageryError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{info, warn};

/// Remote imagery collaborator: raw image bytes for a coordinate
#[async_trait]
pub trait ImagerySource: Send + Sync {
    async fn fetch(&self, coordinate: &Coordinate) -> Result<Vec<u8>>;

    /// Short description for logs
    fn describe(&self) -> String;
}

/// HTTP GET against a URL template.
///
/// The template may contain `{lat}`, `{lon}` and `{key}` placeholders, e.g.
/// `https://maps.example.com/static?center={lat},{lon}&size=640x640&key={key}`.
pub struct HttpImagerySource {
    client: Client,
    url_template: String,
    api_key: Option<String>,
}

impl HttpImagerySource {
    pub fn new(url_template: String, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ImageryError::Io(std::io::Error::other(e)))?;

        Ok(Self {
            client,
            url_template,
            api_key,
        })
    }

    pub fn url_for(&self, coordinate: &Coordinate) -> String {
        self.url_template
            .replace("{lat}", &coordinate.latitude().to_string())
            .replace("{lon}", &coordinate.longitude().to_string())
            .replace("{key}", self.api_key.as_deref().unwrap_or(""))
    }
}

#[async_trait]
impl ImagerySource for HttpImagerySource {
    async fn fetch(&self, coordinate: &Coordinate) -> Result<Vec<u8>> {
        info!("Fetching imagery for {} from remote source", coordinate);

        let response = self
            .client
            .get(self.url_for(coordinate))
            .send()
            .await
            .map_err(|e| ImageryError::unavailable(coordinate, format!("imagery request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Imagery source returned {} for {}", status, coordinate);
            return Err(ImageryError::unavailable(
                coordinate,
                format!("imagery source returned {}", status),
            ));
        }

        let bytes = response.bytes().await.map_err(|e| {
            ImageryError::unavailable(coordinate, format!("failed to read imagery body: {}", e))
        })?;

        info!("Received {} bytes of imagery for {}", bytes.len(), coordinate);
        Ok(bytes.to_vec())
    }

    fn describe(&self) -> String {
        // Never log the key itself
        self.url_template.clone()
    }
}
