//! Chat-completions client (OpenAI-compatible API)

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::GenerationClient;
use crate::config::GenerationConfig;
use crate::error::{LabError, Result};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

/// Chat-completions client
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    timeout_secs: u64,
}

impl OpenAiClient {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| LabError::config(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| LabError::config("API key contains invalid characters"))?;
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }

    fn transport_error(&self, err: reqwest::Error) -> LabError {
        if err.is_timeout() {
            LabError::Timeout(self.timeout_secs)
        } else {
            LabError::Network(err.to_string())
        }
    }
}

impl GenerationClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: self.temperature,
        };

        info!(model = %self.model, prompt_len = prompt.len(), "requesting completion");

        let response = self
            .client
            .post(self.completions_url())
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LabError::Auth(message),
                StatusCode::TOO_MANY_REQUESTS => LabError::RateLimited,
                _ => LabError::Api {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        let reply: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                LabError::Timeout(self.timeout_secs)
            } else {
                LabError::malformed(format!("unreadable completion envelope: {}", e))
            }
        })?;

        let text = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LabError::malformed("response has no completion text"))?;

        debug!(completion_len = text.len(), "completion received");
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completions_url() {
        let mut cfg = GenerationConfig::new("sk-test");
        cfg.base_url = "http://localhost:8080/".to_string();
        let client = OpenAiClient::new(&cfg).unwrap();
        assert_eq!(client.completions_url(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(client.model(), "gpt-4o");
    }

    #[test]
    fn test_rejects_invalid_config() {
        let cfg = GenerationConfig::new("");
        assert!(OpenAiClient::new(&cfg).is_err());
    }

    #[test]
    fn test_request_body_shape() {
        let body = ChatRequest {
            model: "gpt-4o",
            messages: vec![ChatMessage { role: "user", content: "hi" }],
            temperature: 0.5,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], "gpt-4o");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"], "hi");
        assert_eq!(value["temperature"], 0.5);
    }
}
