//! Error types for Skrive.

use thiserror::Error;

/// Library-level error type for Skrive operations.
#[derive(Error, Debug)]
pub enum SkriveError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Content source error: {0}")]
    Source(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Terminal outcomes of a chunked completion run.
///
/// Rate-limit rejections, transient failures and unparseable rejections are
/// recovered inside the controller; only these escape to the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompletionError {
    #[error("Nothing to complete: input text is empty")]
    EmptyInput,

    #[error(
        "Character budget of {char_budget} cannot hold a single word of {longest_word} characters (limit {limit})"
    )]
    FatalBudgetFailure {
        char_budget: usize,
        longest_word: usize,
        limit: u64,
    },

    #[error(
        "Chunk {chunk_index} still rejected after {attempts} attempts (limit {limit}, requested {requested})"
    )]
    ExhaustedRetries {
        chunk_index: usize,
        attempts: u32,
        limit: u64,
        requested: u64,
    },

    #[error("Chunk {chunk_index} failed after {attempts} transient retries: {cause}")]
    TransientFailureExhausted {
        chunk_index: usize,
        attempts: u32,
        cause: String,
    },

    #[error("Provider error on chunk {chunk_index}: {cause}")]
    ProviderFatal { chunk_index: usize, cause: String },

    #[error("Cancelled after {completed} completed chunks")]
    Cancelled { completed: usize },
}

/// Result type alias for Skrive operations.
pub type Result<T> = std::result::Result<T, SkriveError>;
