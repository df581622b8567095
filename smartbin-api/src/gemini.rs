//! Gemini `generateContent` backend
//!
//! One [`GeminiClient`] talks to one model. Several clients wrapped in a
//! [`smartbin::classify::FallbackClassifier`] give the model fallback list.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use smartbin::classify::{
    Assistant, Classification, ClassifyError, ClassifyResult, Classifier, ImageInput,
};
use std::time::Duration;
use tracing::{debug, info};

/// Instruction sent alongside every image
pub const CLASSIFY_PROMPT: &str = "Identify this trash (brief): what is it? Also explain:
1) How to safely dispose it
2) How to recycle it (step-by-step, short)";

/// Answer used when the model returns no text for a question
pub const NO_ANSWER: &str = "No answer";

/// Longest raw response kept when no candidate text can be found
pub const RAW_RESPONSE_LIMIT: usize = 2000;

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Inline { inline_data: InlineData },
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

/// Client for a single Gemini model
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    name: String,
}

impl GeminiClient {
    /// Create a client with its own connection pool
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> ClassifyResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClassifyError::NotConfigured(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self::with_client(client, endpoint, api_key, model))
    }

    /// Create a client sharing an existing connection pool
    pub fn with_client(
        client: Client,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        let model = model.into();
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            name: format!("Gemini({model})"),
            model,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        )
    }

    async fn generate(&self, request: &GenerateRequest) -> ClassifyResult<Value> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ClassifyError::MissingCredentials("GEMINI_API_KEY".to_string()))?;

        let response = self
            .client
            .post(self.url())
            .query(&[("key", key)])
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClassifyError::Network("request timed out".to_string())
                } else if e.is_connect() {
                    ClassifyError::Network(format!("unable to reach {}", self.endpoint))
                } else {
                    ClassifyError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClassifyError::Network(format!("failed to read response: {e}")))?;
        debug!(model = %self.model, status = status.as_u16(), bytes = body.len(), "gemini response");

        if !status.is_success() {
            return Err(map_status(status, &self.model, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            ClassifyError::MalformedResponse(format!("response is not JSON: {e}"))
        })
    }
}

#[async_trait]
impl Classifier for GeminiClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn classify(&self, image: &ImageInput) -> ClassifyResult<Classification> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: image.mime_type.clone(),
                            data: STANDARD.encode(&image.data),
                        },
                    },
                    Part::Text {
                        text: CLASSIFY_PROMPT.to_string(),
                    },
                ],
            }],
        };

        info!(model = %self.model, bytes = image.len(), mime = %image.mime_type, "classifying image");
        let response = self.generate(&request).await?;

        Ok(Classification {
            text: extract_answer(&response),
            confidence: None,
            model_used: self.name.clone(),
        })
    }
}

#[async_trait]
impl Assistant for GeminiClient {
    async fn ask(&self, prompt: &str) -> ClassifyResult<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part::Text {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self.generate(&request).await?;
        Ok(first_part_text(&response)
            .unwrap_or(NO_ANSWER)
            .to_string())
    }
}

fn map_status(status: StatusCode, model: &str, body: &str) -> ClassifyError {
    let message = upstream_message(body);
    match status.as_u16() {
        404 => ClassifyError::ModelNotFound(model.to_string()),
        401 | 403 => ClassifyError::Authentication(message),
        429 => ClassifyError::RateLimited(message),
        code => ClassifyError::Upstream {
            status: code,
            message,
        },
    }
}

/// The `error.message` of a Gemini error body, or the body itself
fn upstream_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| truncate_chars(body, RAW_RESPONSE_LIMIT))
}

/// Text of the first candidate, all parts joined by newlines.
///
/// Falls back to the raw JSON (truncated) when the response has no
/// candidate parts at all.
pub fn extract_answer(response: &Value) -> String {
    match response["candidates"][0]["content"]["parts"].as_array() {
        Some(parts) => parts
            .iter()
            .map(|p| p["text"].as_str().unwrap_or(""))
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string(),
        None => truncate_chars(&response.to_string(), RAW_RESPONSE_LIMIT),
    }
}

fn first_part_text(response: &Value) -> Option<&str> {
    response["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .filter(|t| !t.is_empty())
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
