use crate::errors::ServiceError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::instrument;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

/// Client for the chat-completion text-generation endpoint. Used for
/// billing insights prose and for schema-constrained menu extraction.
#[derive(Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl LlmClient {
    pub fn new(
        endpoint: String,
        api_key: Option<String>,
        model: String,
    ) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            http,
            endpoint,
            api_key,
            model,
        })
    }

    /// Free-form completion: one system and one user message, prose back.
    #[instrument(skip(self, system, user))]
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, ServiceError> {
        let body = json!({
            "model": self.model,
            "messages": [
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
        });
        self.send(body).await
    }

    /// Completion constrained to a JSON schema via `response_format`.
    /// Returns the raw content string for the caller to deserialize.
    #[instrument(skip(self, system, user, schema))]
    pub async fn complete_json(
        &self,
        system: &str,
        user: &str,
        schema_name: &str,
        schema: Value,
    ) -> Result<String, ServiceError> {
        let body = json!({
            "model": self.model,
            "messages": [
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": schema_name,
                    "strict": true,
                    "schema": schema,
                },
            },
        });
        self.send(body).await
    }

    async fn send(&self, body: Value) -> Result<String, ServiceError> {
        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "text-generation endpoint returned {}",
                response.status()
            )));
        }

        let completion: ChatCompletionResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                ServiceError::ExternalServiceError(
                    "text-generation endpoint returned no content".to_string(),
                )
            })
    }
}
