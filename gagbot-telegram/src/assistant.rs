//! Gemini-backed implementation of [`AssistantGateway`].
//!
//! One REST call per turn: the fully built prompt goes in, plain text comes
//! out. Any transport or shape problem surfaces as a gateway error.

use async_trait::async_trait;
use gagbot_core::{AssistantGateway, GagbotError, Result};
use serde_json::json;
use tracing::instrument;

const GEMINI_MODEL: &str = "gemini-2.5-flash-lite";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiAssistant {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiAssistant {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    /// Overrides the API base URL (for tests against a local server).
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
        }
    }
}

fn gateway_err(e: impl std::fmt::Display) -> GagbotError {
    GagbotError::Gateway(e.to_string())
}

#[async_trait]
impl AssistantGateway for GeminiAssistant {
    #[instrument(skip(self, prompt))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, GEMINI_MODEL
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(gateway_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GagbotError::Gateway(format!(
                "assistant backend returned {}",
                status
            )));
        }

        let value: serde_json::Value = response.json().await.map_err(gateway_err)?;
        value["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(|text| text.trim().to_string())
            .ok_or_else(|| GagbotError::Gateway("assistant reply missing text".to_string()))
    }
}
