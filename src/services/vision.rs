use crate::models::ImageLabel;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when calling the classification service
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Image label classification capability
///
/// Returns labels ordered as the service ranked them. An empty list is a
/// valid answer for a well-formed image.
#[async_trait]
pub trait LabelClassifier: Send + Sync {
    async fn classify(&self, image: &[u8]) -> Result<Vec<ImageLabel>, VisionError>;
}

/// Google Cloud Vision REST client (label detection)
pub struct VisionClient {
    endpoint: String,
    api_key: String,
    max_labels: u32,
    client: Client,
}

impl VisionClient {
    pub fn new(endpoint: String, api_key: String, max_labels: u32) -> Result<Self, VisionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            endpoint,
            api_key,
            max_labels,
            client,
        })
    }

    fn parse_labels(json: &Value) -> Result<Vec<ImageLabel>, VisionError> {
        let response = json
            .get("responses")
            .and_then(|r| r.as_array())
            .and_then(|r| r.first())
            .ok_or_else(|| VisionError::InvalidResponse("Missing responses array".into()))?;

        if let Some(error) = response.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            return Err(VisionError::ApiError(message.to_string()));
        }

        // Vision omits labelAnnotations entirely when nothing was detected
        let Some(annotations) = response.get("labelAnnotations") else {
            return Ok(Vec::new());
        };

        serde_json::from_value(annotations.clone())
            .map_err(|e| VisionError::InvalidResponse(format!("Failed to parse labels: {}", e)))
    }
}

#[async_trait]
impl LabelClassifier for VisionClient {
    async fn classify(&self, image: &[u8]) -> Result<Vec<ImageLabel>, VisionError> {
        let url = format!(
            "{}/v1/images:annotate?key={}",
            self.endpoint.trim_end_matches('/'),
            urlencoding::encode(&self.api_key)
        );

        let body = json!({
            "requests": [{
                "image": { "content": BASE64.encode(image) },
                "features": [{ "type": "LABEL_DETECTION", "maxResults": self.max_labels }]
            }]
        });

        tracing::debug!("Requesting label detection for {} byte image", image.len());

        let response = self.client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            return Err(VisionError::ApiError(format!(
                "Label detection failed: {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;
        let labels = Self::parse_labels(&json)?;

        tracing::info!(
            "Detected labels: {:?}",
            labels.iter().map(|l| l.description.as_str()).collect::<Vec<_>>()
        );

        Ok(labels)
    }
}
