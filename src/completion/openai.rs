//! OpenAI-compatible chat completion invoker.
//!
//! Works with any provider that follows the `/chat/completions` schema
//! (Groq, OpenAI, OpenRouter, local servers).

use super::{parse_rate_limit_error, CompletionInvoker, CompletionOutcome, ProviderConfig, TokenLimitExceeded};
use crate::error::{Result, SkriveError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Invoker for a single OpenAI-compatible provider.
pub struct OpenAiCompatibleInvoker {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl OpenAiCompatibleInvoker {
    /// Create an invoker with the provider's configured request timeout.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SkriveError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn build_request(&self, system_prompt: &str, user_text: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_text.to_string(),
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }
}

#[async_trait]
impl CompletionInvoker for OpenAiCompatibleInvoker {
    fn name(&self) -> &str {
        &self.config.display_name
    }

    #[instrument(skip_all, fields(provider = %self.config.display_name, model = %self.config.model))]
    async fn invoke(&self, system_prompt: &str, user_text: &str) -> CompletionOutcome {
        // Resolved per call so a rotated key is picked up without a restart.
        let api_key = match std::env::var(&self.config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => key,
            _ => {
                return CompletionOutcome::Fatal {
                    cause: format!("{} is not set", self.config.api_key_env),
                }
            }
        };

        let request = self.build_request(system_prompt, user_text);
        debug!(chars = user_text.len(), "Sending completion request");

        let response = match self
            .client
            .post(&self.config.endpoint_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_builder() => {
                return CompletionOutcome::Fatal {
                    cause: format!("Invalid request: {}", e),
                }
            }
            Err(e) => {
                warn!("Completion request failed: {}", e);
                return CompletionOutcome::Transient {
                    cause: describe_transport_error(&e),
                };
            }
        };

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return CompletionOutcome::Transient {
                    cause: format!("Failed to read response body: {}", e),
                }
            }
        };

        debug!(status, bytes = body.len(), "Received completion response");
        classify_response(status, &body)
    }
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("Request timed out: {}", e)
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else {
        format!("Request failed: {}", e)
    }
}

/// Classify an HTTP status and body into a completion outcome.
///
/// - 2xx: the first choice's content and finish reason, unmodified
/// - 413/429: `RateLimited` when the error message carries limit figures,
///   otherwise `Rejected`
/// - 408 and 5xx: `Transient`
/// - any other 4xx: `RateLimited` if the message parses, otherwise `Fatal`
pub fn classify_response(status: u16, body: &str) -> CompletionOutcome {
    if (200..300).contains(&status) {
        return parse_success(body);
    }

    let message = error_message(body);

    match status {
        413 | 429 => match parse_rate_limit_error(&message) {
            Some(info) => CompletionOutcome::RateLimited(TokenLimitExceeded::from_info(info, message)),
            None => CompletionOutcome::Rejected { status, message },
        },
        408 | 500..=599 => CompletionOutcome::Transient {
            cause: format!("HTTP {}: {}", status, message),
        },
        400..=499 => match parse_rate_limit_error(&message) {
            Some(info) => CompletionOutcome::RateLimited(TokenLimitExceeded::from_info(info, message)),
            None => CompletionOutcome::Fatal {
                cause: format!("HTTP {}: {}", status, message),
            },
        },
        _ => CompletionOutcome::Fatal {
            cause: format!("Unexpected HTTP status {}: {}", status, message),
        },
    }
}

fn parse_success(body: &str) -> CompletionOutcome {
    let parsed: ChatCompletionResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(e) => {
            return CompletionOutcome::Fatal {
                cause: format!("Failed to parse completion response: {}", e),
            }
        }
    };

    let Some(choice) = parsed.choices.into_iter().next() else {
        return CompletionOutcome::Fatal {
            cause: "Completion response has no choices".to_string(),
        };
    };

    match choice.message.content {
        Some(content) => CompletionOutcome::Success {
            content,
            finish_reason: choice.finish_reason.unwrap_or_else(|| "unknown".to_string()),
        },
        None => CompletionOutcome::Fatal {
            cause: "Completion response has no message content".to_string(),
        },
    }
}

/// Pull `error.message` out of an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse {
            error: ErrorPayload::Detailed { message },
        }) => message,
        Ok(ErrorResponse {
            error: ErrorPayload::Plain(message),
        }) => message,
        Err(_) => body.trim().to_string(),
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorPayload,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorPayload {
    Detailed { message: String },
    Plain(String),
}
