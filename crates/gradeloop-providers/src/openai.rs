//! OpenAI-compatible chat-completions oracle.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use gradeloop_core::error::OracleError;
use gradeloop_core::traits::{Oracle, OracleRequest, OracleResponse};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 180;

/// Oracle backed by a `/v1/chat/completions` endpoint.
pub struct OpenAiOracle {
    name: String,
    api_key: Option<String>,
    base_url: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl OpenAiOracle {
    /// Build a client. An empty or missing key sends no `Authorization` header.
    pub fn new(
        name: &str,
        api_key: Option<String>,
        base_url: Option<String>,
        timeout_secs: u64,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        let base_url = base_url
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            name: name.to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs,
            client,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl Oracle for OpenAiOracle {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, request), fields(oracle = %self.name, model = %request.model))]
    async fn complete(&self, request: &OracleRequest) -> Result<OracleResponse, OracleError> {
        let start = Instant::now();

        let body = ChatRequest {
            model: &request.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
        };

        let mut req = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("content-type", "application/json");
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {key}"));
        }

        let response = req.json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                OracleError::Timeout(self.timeout_secs)
            } else {
                OracleError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(OracleError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let api_response: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                OracleError::Timeout(self.timeout_secs)
            } else {
                OracleError::ApiError {
                    status: status.as_u16(),
                    message: format!("failed to parse response: {e}"),
                }
            }
        })?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(OracleError::EmptyResponse)?;

        let latency_ms = start.elapsed().as_millis() as u64;
        debug!(latency_ms, chars = content.len(), "oracle replied");

        Ok(OracleResponse {
            content,
            model: api_response
                .model
                .unwrap_or_else(|| request.model.clone()),
            latency_ms,
        })
    }
}
