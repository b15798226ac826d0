use crate::errors::ServiceError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

#[derive(Debug, Serialize)]
struct OcrRequest<'a> {
    image: &'a str,
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    success: bool,
    #[serde(default)]
    text: String,
    #[serde(default)]
    error: Option<String>,
}

/// Client for the external OCR service. The service accepts a base64
/// image and returns the recognized text.
#[derive(Clone)]
pub struct OcrClient {
    http: reqwest::Client,
    endpoint: String,
}

impl OcrClient {
    pub fn new(endpoint: String) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self { http, endpoint })
    }

    #[instrument(skip(self, image_base64), fields(image_bytes = image_base64.len()))]
    pub async fn extract_text(&self, image_base64: &str) -> Result<String, ServiceError> {
        let url = format!("{}/ocr", self.endpoint.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .json(&OcrRequest {
                image: image_base64,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "OCR service returned {}",
                response.status()
            )));
        }

        let body: OcrResponse = response.json().await?;
        if !body.success {
            return Err(ServiceError::ExternalServiceError(format!(
                "OCR failed: {}",
                body.error.unwrap_or_else(|| "unknown error".to_string())
            )));
        }
        if body.text.trim().is_empty() {
            return Err(ServiceError::ExternalServiceError(
                "OCR returned no text".to_string(),
            ));
        }
        Ok(body.text)
    }
}
