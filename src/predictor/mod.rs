//! Prediction client for the remote inference endpoint.
//!
//! The request/response shape is the OpenAI-style chat-completions format:
//! `{model, messages:[{role, content}, ...]}` in, completion text at
//! `choices[0].message.content` out.

pub(crate) mod prompt;

use crate::feed::DrawResult;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::{json, Value};
use std::time::Duration;

use prompt::{build_prediction_prompt, SYSTEM_PROMPT};

const PREDICT_TIMEOUT: Duration = Duration::from_secs(60);

/// Produces a prediction text for a batch of draw results.
///
/// An `Err` marks a transient failure (timeout, non-2xx, malformed body);
/// the poll loop logs it and skips that cycle's delivery.
#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, results: &[DrawResult]) -> Result<String>;
}

/// Chat-completions client with bearer-token auth (Groq-hosted models).
pub struct GroqPredictor {
    client: Client,
    api_url: Url,
    api_key: String,
    model: String,
}

impl GroqPredictor {
    pub fn new(api_url: Url, api_key: String, model: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(PREDICT_TIMEOUT)
            .build()
            .context("Failed to build predictor HTTP client")?;
        Ok(Self {
            client,
            api_url,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl Predictor for GroqPredictor {
    async fn predict(&self, results: &[DrawResult]) -> Result<String> {
        let prompt = build_prediction_prompt(results)?;

        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt}
            ]
        });

        let resp = self
            .client
            .post(self.api_url.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to send prediction request")?
            .error_for_status()
            .context("Non-success status from inference endpoint")?;

        let response: Value = resp
            .json()
            .await
            .context("Failed to parse inference response as JSON")?;

        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .context("No completion text in inference response")?;

        Ok(content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_text_path_matches_chat_format() {
        let response = json!({
            "choices": [{"message": {"role": "assistant", "content": "  Period: 1051\nNumber: 4  "}}]
        });
        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .unwrap();
        assert_eq!(content.trim(), "Period: 1051\nNumber: 4");
    }

    #[test]
    fn missing_completion_text_is_detected() {
        let response: Value = json!({"choices": []});
        assert!(response["choices"][0]["message"]["content"]
            .as_str()
            .is_none());
    }
}
