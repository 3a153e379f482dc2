//! Text completion against token-rate-limited providers.
//!
//! - `rate_limit` - parsing limit figures out of rejection messages
//! - `openai` - OpenAI-compatible chat completion invoker
//! - `controller` - adaptive chunking and retry over a whole transcript
//! - `merge` - joining chunk outputs into one document

mod controller;
mod merge;
mod openai;
mod rate_limit;

pub use controller::{AdaptiveRetryController, ChunkedCompletion, ControllerConfig, ControllerState};
pub use merge::merge_outputs;
pub use openai::{classify_response, OpenAiCompatibleInvoker};
pub use rate_limit::{parse_rate_limit_error, RateLimitInfo};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Connection details for an OpenAI-compatible chat completion endpoint.
///
/// The API key itself is never stored here; only the name of the environment
/// variable that holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Human-readable provider name.
    pub display_name: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Full URL of the chat completions endpoint.
    pub endpoint_url: String,
    /// Model name sent with each request.
    pub model: String,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Maximum completion tokens per request.
    pub max_tokens: Option<u32>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// Successful completion of one chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResult {
    /// Sequence index of the chunk this result belongs to.
    pub chunk_index: usize,
    /// Text of the first completion choice, unmodified.
    pub content: String,
    /// Finish reason reported by the provider.
    pub finish_reason: String,
}

/// A rejection that carries the provider's authoritative token figures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenLimitExceeded {
    pub limit: u64,
    pub requested: u64,
    pub message: String,
}

impl TokenLimitExceeded {
    pub fn from_info(info: RateLimitInfo, message: impl Into<String>) -> Self {
        Self {
            limit: info.limit,
            requested: info.requested,
            message: message.into(),
        }
    }
}

/// Classified outcome of a single completion request.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    /// The provider returned a completion.
    Success {
        content: String,
        finish_reason: String,
    },
    /// The request was too large for the provider's token budget.
    RateLimited(TokenLimitExceeded),
    /// A rejection whose message carried no usable limit figures.
    Rejected { status: u16, message: String },
    /// Network-level failure or provider hiccup; worth retrying unchanged.
    Transient { cause: String },
    /// A failure no retry can fix (bad credentials, malformed response).
    Fatal { cause: String },
}

/// Performs one request/response cycle against a completion provider.
#[async_trait]
pub trait CompletionInvoker: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Send a system prompt and user text, classifying the response.
    async fn invoke(&self, system_prompt: &str, user_text: &str) -> CompletionOutcome;
}
