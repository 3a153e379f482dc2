//! Adaptive chunking and retry over a whole transcript.
//!
//! The controller sends a text to a completion provider in as few requests
//! as the provider's tokens-per-minute budget allows. It starts from an
//! assumed limit; the first rejection that reports the provider's real limit
//! replaces it, and only the text not yet completed is re-chunked under the
//! new budget.
//!
//! Requests are issued strictly one after another. Running them concurrently
//! would let simultaneous requests jointly overrun the per-minute budget.

use super::{merge_outputs, CompletionInvoker, CompletionOutcome, CompletionResult};
use crate::chunking::{longest_word, split_words, ChunkRequest, TextChunker, TokenBudget};
use crate::error::CompletionError;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Tuning for a controller run.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// TPM limit assumed until the provider reports its own.
    pub assumed_limit: u64,
    /// Share of the limit a single request may use for input.
    pub safety_factor: f64,
    /// Characters of source text per token.
    pub chars_per_token: f64,
    /// Rate-limit rejections tolerated for one unit of work.
    pub max_attempts_per_chunk: u32,
    /// Words repeated at the start of each chunk after the first.
    pub overlap_word_count: usize,
    /// Retries for transient failures and unparseable rejections.
    pub max_transient_retries: u32,
    /// Backoff step; retry `n` waits `n * transient_backoff`.
    pub transient_backoff: Duration,
    /// Pause before retrying after a rate-limit rejection.
    pub rate_limit_cooldown: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            assumed_limit: 12_000,
            safety_factor: 0.7,
            chars_per_token: 4.0,
            max_attempts_per_chunk: 3,
            overlap_word_count: 50,
            max_transient_retries: 3,
            transient_backoff: Duration::from_secs(2),
            rate_limit_cooldown: Duration::ZERO,
        }
    }
}

/// Per-run limit knowledge and attempt accounting.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerState {
    pub assumed_limit: u64,
    /// Limit reported by the provider; supersedes `assumed_limit` once set.
    pub authoritative_limit: Option<u64>,
    pub safety_factor: f64,
    pub chars_per_token: f64,
    /// Rate-limit attempts left for the chunk at the cursor.
    pub attempts_remaining: u32,
}

impl ControllerState {
    /// The limit budgets are computed from.
    pub fn current_limit(&self) -> u64 {
        self.authoritative_limit.unwrap_or(self.assumed_limit)
    }

    pub fn budget(&self) -> TokenBudget {
        TokenBudget::compute(self.current_limit(), self.safety_factor, self.chars_per_token)
    }
}

/// Output of a completed run.
#[derive(Debug, Clone)]
pub struct ChunkedCompletion {
    /// Chunk outputs merged in sequence order.
    pub text: String,
    /// Per-chunk results in sequence order.
    pub results: Vec<CompletionResult>,
    /// State at the end of the run.
    pub state: ControllerState,
    /// Number of times the remaining text was re-chunked.
    pub rechunks: u32,
}

impl ChunkedCompletion {
    pub fn chunk_count(&self) -> usize {
        self.results.len()
    }
}

/// Drives a [`CompletionInvoker`] over text of any length.
pub struct AdaptiveRetryController {
    invoker: Arc<dyn CompletionInvoker>,
    config: ControllerConfig,
    cancel: CancellationToken,
}

impl AdaptiveRetryController {
    pub fn new(invoker: Arc<dyn CompletionInvoker>, config: ControllerConfig) -> Self {
        Self {
            invoker,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop between requests once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Fresh state for a run. Nothing carries over between runs.
    pub fn initial_state(&self) -> ControllerState {
        ControllerState {
            assumed_limit: self.config.assumed_limit,
            authoritative_limit: None,
            safety_factor: self.config.safety_factor,
            chars_per_token: self.config.chars_per_token,
            attempts_remaining: self.config.max_attempts_per_chunk,
        }
    }

    /// Complete `text` under `system_prompt`, chunking as needed.
    #[instrument(skip_all, fields(provider = %self.invoker.name(), chars = text.len()))]
    pub async fn complete(
        &self,
        system_prompt: &str,
        text: &str,
    ) -> Result<ChunkedCompletion, CompletionError> {
        let words = split_words(text);
        if words.is_empty() {
            return Err(CompletionError::EmptyInput);
        }

        let mut state = self.initial_state();
        let mut pending: VecDeque<ChunkRequest> = self.plan_initial(&state, &words)?.into();
        let mut results: Vec<CompletionResult> = Vec::with_capacity(pending.len());
        let mut transient_failures = 0u32;
        let mut rechunks = 0u32;

        while let Some(request) = pending.front() {
            if self.cancel.is_cancelled() {
                info!("Cancelled after {} chunks", results.len());
                return Err(CompletionError::Cancelled {
                    completed: results.len(),
                });
            }

            debug!(
                chunk = request.sequence_index,
                words = request.word_count(),
                chars = request.text.len(),
                "Invoking chunk"
            );

            let outcome = self.invoker.invoke(system_prompt, &request.text).await;
            match outcome {
                CompletionOutcome::Success {
                    content,
                    finish_reason,
                } => {
                    if finish_reason == "length" {
                        warn!(
                            chunk = request.sequence_index,
                            "Completion was cut off by the provider's output limit"
                        );
                    }
                    results.push(CompletionResult {
                        chunk_index: request.sequence_index,
                        content,
                        finish_reason,
                    });
                    pending.pop_front();
                    state.attempts_remaining = self.config.max_attempts_per_chunk;
                    transient_failures = 0;
                }

                CompletionOutcome::RateLimited(rejection) => {
                    let chunk_index = request.sequence_index;
                    let (start, seed) = (request.start_word, request.overlap_word_count);

                    state.authoritative_limit = Some(rejection.limit);
                    state.attempts_remaining = state.attempts_remaining.saturating_sub(1);
                    warn!(
                        chunk = chunk_index,
                        limit = rejection.limit,
                        requested = rejection.requested,
                        attempts_remaining = state.attempts_remaining,
                        "Provider rejected chunk as too large"
                    );

                    if state.attempts_remaining == 0 {
                        return Err(CompletionError::ExhaustedRetries {
                            chunk_index,
                            attempts: self.config.max_attempts_per_chunk,
                            limit: rejection.limit,
                            requested: rejection.requested,
                        });
                    }

                    pending = self.replan(&state, &words, start, seed, chunk_index)?.into();
                    rechunks += 1;
                    transient_failures = 0;

                    self.pause(self.config.rate_limit_cooldown).await;
                }

                CompletionOutcome::Rejected { status, message } => {
                    let chunk_index = request.sequence_index;
                    transient_failures += 1;
                    warn!(
                        chunk = chunk_index,
                        status, "Provider rejected chunk without limit details: {}", message
                    );
                    self.check_transient_budget(chunk_index, transient_failures, message)?;
                    self.pause(self.config.transient_backoff * transient_failures).await;
                }

                CompletionOutcome::Transient { cause } => {
                    let chunk_index = request.sequence_index;
                    transient_failures += 1;
                    warn!(chunk = chunk_index, "Transient failure: {}", cause);
                    self.check_transient_budget(chunk_index, transient_failures, cause)?;
                    self.pause(self.config.transient_backoff * transient_failures).await;
                }

                CompletionOutcome::Fatal { cause } => {
                    return Err(CompletionError::ProviderFatal {
                        chunk_index: request.sequence_index,
                        cause,
                    });
                }
            }
        }

        info!(
            chunks = results.len(),
            rechunks,
            limit = state.current_limit(),
            "Completed all chunks"
        );

        Ok(ChunkedCompletion {
            text: merge_outputs(&results),
            results,
            state,
            rechunks,
        })
    }

    fn plan_initial(
        &self,
        state: &ControllerState,
        words: &[&str],
    ) -> Result<Vec<ChunkRequest>, CompletionError> {
        let budget = self.checked_budget(state, words)?;

        if budget.fits_words(words.len()) {
            info!(
                words = words.len(),
                safe_input_tokens = budget.safe_input_tokens,
                "Text fits in a single request"
            );
            return Ok(vec![ChunkRequest::from_span(words, 0, words.len(), 0, 0)]);
        }

        let plan = TextChunker::new(budget.char_budget, self.config.overlap_word_count)
            .plan(words, 0, 0, 0);
        info!(
            chunks = plan.len(),
            char_budget = budget.char_budget,
            limit = budget.limit,
            "Split text into chunks"
        );
        Ok(plan)
    }

    /// Re-chunk from the rejected chunk onward under the current budget.
    fn replan(
        &self,
        state: &ControllerState,
        words: &[&str],
        start: usize,
        seed: usize,
        first_sequence: usize,
    ) -> Result<Vec<ChunkRequest>, CompletionError> {
        let budget = self.checked_budget(state, &words[start..])?;
        let plan = TextChunker::new(budget.char_budget, self.config.overlap_word_count)
            .plan(words, start, seed, first_sequence);
        info!(
            from_chunk = first_sequence,
            chunks = plan.len(),
            char_budget = budget.char_budget,
            limit = budget.limit,
            "Re-chunked remaining text"
        );
        Ok(plan)
    }

    fn checked_budget(
        &self,
        state: &ControllerState,
        words: &[&str],
    ) -> Result<TokenBudget, CompletionError> {
        let budget = state.budget();
        let longest = longest_word(words);
        if !budget.holds_word(longest) {
            return Err(CompletionError::FatalBudgetFailure {
                char_budget: budget.char_budget,
                longest_word: longest,
                limit: budget.limit,
            });
        }
        Ok(budget)
    }

    fn check_transient_budget(
        &self,
        chunk_index: usize,
        failures: u32,
        cause: String,
    ) -> Result<(), CompletionError> {
        if failures > self.config.max_transient_retries {
            return Err(CompletionError::TransientFailureExhausted {
                chunk_index,
                attempts: failures,
                cause,
            });
        }
        Ok(())
    }

    /// Sleep between requests; wakes early on cancellation.
    async fn pause(&self, delay: Duration) {
        if delay.is_zero() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = self.cancel.cancelled() => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::TokenLimitExceeded;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Invoker that plays back scripted outcomes, then succeeds with a
    /// summary naming the first and last word of the chunk.
    struct ScriptedInvoker {
        script: Mutex<VecDeque<CompletionOutcome>>,
        calls: Mutex<Vec<String>>,
        cancel_after: Option<(usize, CancellationToken)>,
    }

    impl ScriptedInvoker {
        fn new(script: Vec<CompletionOutcome>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
                cancel_after: None,
            }
        }

        fn cancelling_after(calls: usize, token: CancellationToken) -> Self {
            Self {
                cancel_after: Some((calls, token)),
                ..Self::new(Vec::new())
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn summary_of(text: &str) -> String {
        let words: Vec<&str> = text.split(' ').collect();
        format!("summary {}..{}", words[0], words[words.len() - 1])
    }

    #[async_trait]
    impl CompletionInvoker for ScriptedInvoker {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn invoke(&self, _system_prompt: &str, user_text: &str) -> CompletionOutcome {
            let call_count = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(user_text.to_string());
                calls.len()
            };

            if let Some((after, token)) = &self.cancel_after {
                if call_count >= *after {
                    token.cancel();
                }
            }

            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| CompletionOutcome::Success {
                    content: summary_of(user_text),
                    finish_reason: "stop".to_string(),
                })
        }
    }

    fn rate_limited(limit: u64, requested: u64) -> CompletionOutcome {
        CompletionOutcome::RateLimited(TokenLimitExceeded {
            limit,
            requested,
            message: format!("Limit {}, Requested {}", limit, requested),
        })
    }

    fn transient() -> CompletionOutcome {
        CompletionOutcome::Transient {
            cause: "connection reset".to_string(),
        }
    }

    fn test_config() -> ControllerConfig {
        ControllerConfig {
            assumed_limit: 1_000,
            safety_factor: 0.5,
            chars_per_token: 4.0,
            max_attempts_per_chunk: 3,
            overlap_word_count: 5,
            max_transient_retries: 2,
            transient_backoff: Duration::ZERO,
            rate_limit_cooldown: Duration::ZERO,
        }
    }

    fn numbered_text(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    fn controller(invoker: &Arc<ScriptedInvoker>, config: ControllerConfig) -> AdaptiveRetryController {
        AdaptiveRetryController::new(invoker.clone(), config)
    }

    #[tokio::test]
    async fn test_short_text_single_request() {
        let invoker = Arc::new(ScriptedInvoker::new(vec![CompletionOutcome::Success {
            content: "Generated notes here".to_string(),
            finish_reason: "stop".to_string(),
        }]));

        let output = controller(&invoker, test_config())
            .complete("system", "a short transcript")
            .await
            .unwrap();

        assert_eq!(output.text, "Generated notes here");
        assert_eq!(output.chunk_count(), 1);
        assert_eq!(invoker.calls(), vec!["a short transcript".to_string()]);
        assert_eq!(output.state.authoritative_limit, None);
    }

    #[tokio::test]
    async fn test_long_text_is_chunked_in_order() {
        let invoker = Arc::new(ScriptedInvoker::new(Vec::new()));
        let text = numbered_text(2_000);

        let output = controller(&invoker, test_config())
            .complete("system", &text)
            .await
            .unwrap();

        let calls = invoker.calls();
        assert!(calls.len() > 1);
        assert_eq!(output.chunk_count(), calls.len());
        for (i, result) in output.results.iter().enumerate() {
            assert_eq!(result.chunk_index, i);
            assert_eq!(result.content, summary_of(&calls[i]));
        }
        for call in &calls {
            assert!(call.len() <= 2_000);
        }
        assert!(calls[0].starts_with("w0 "));
        assert!(calls.last().unwrap().ends_with("w1999"));
        assert_eq!(output.rechunks, 0);
    }

    #[tokio::test]
    async fn test_rate_limit_rechunks_only_remaining_text() {
        let invoker = Arc::new(ScriptedInvoker::new(vec![
            CompletionOutcome::Success {
                content: "first notes".to_string(),
                finish_reason: "stop".to_string(),
            },
            rate_limited(500, 900),
        ]));
        let text = numbered_text(2_000);

        let output = controller(&invoker, test_config())
            .complete("system", &text)
            .await
            .unwrap();

        let calls = invoker.calls();
        let new_budget = TokenBudget::compute(500, 0.5, 4.0).char_budget;
        assert_eq!(new_budget, 1_000);

        assert_eq!(output.state.authoritative_limit, Some(500));
        assert_eq!(output.state.current_limit(), 500);
        assert_eq!(output.rechunks, 1);

        // The first chunk is never resent and its result is kept as-is.
        assert_eq!(calls.iter().filter(|c| **c == calls[0]).count(), 1);
        assert_eq!(output.results[0].content, "first notes");

        // The retry starts where the rejected chunk started, under the new budget.
        assert!(calls[1].starts_with(&calls[2]));
        for call in &calls[2..] {
            assert!(call.len() <= new_budget);
        }
        assert!(calls.last().unwrap().ends_with("w1999"));

        for (i, result) in output.results.iter().enumerate() {
            assert_eq!(result.chunk_index, i);
        }
        assert_eq!(output.results.len(), calls.len() - 1);
    }

    #[tokio::test]
    async fn test_rate_limit_exhausts_attempts() {
        let invoker = Arc::new(ScriptedInvoker::new(vec![
            rate_limited(500, 900),
            rate_limited(500, 900),
            rate_limited(500, 900),
        ]));

        let err = controller(&invoker, test_config())
            .complete("system", &numbered_text(2_000))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            CompletionError::ExhaustedRetries {
                chunk_index: 0,
                attempts: 3,
                limit: 500,
                requested: 900,
            }
        );
        assert_eq!(invoker.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_attempts_reset_after_success() {
        let invoker = Arc::new(ScriptedInvoker::new(vec![
            rate_limited(800, 900),
            rate_limited(800, 900),
            CompletionOutcome::Success {
                content: "ok".to_string(),
                finish_reason: "stop".to_string(),
            },
            rate_limited(600, 900),
            rate_limited(600, 900),
        ]));

        let output = controller(&invoker, test_config())
            .complete("system", &numbered_text(2_000))
            .await
            .unwrap();

        assert_eq!(output.state.authoritative_limit, Some(600));
        assert_eq!(output.rechunks, 4);
    }

    #[tokio::test]
    async fn test_budget_too_small_for_a_word_is_fatal() {
        let invoker = Arc::new(ScriptedInvoker::new(vec![rate_limited(1, 900)]));

        let err = controller(&invoker, test_config())
            .complete("system", &numbered_text(2_000))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CompletionError::FatalBudgetFailure { char_budget: 0, limit: 1, .. }
        ));
        assert_eq!(invoker.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_initial_budget_too_small_is_fatal_without_calls() {
        let invoker = Arc::new(ScriptedInvoker::new(Vec::new()));
        let config = ControllerConfig {
            assumed_limit: 2,
            ..test_config()
        };

        let err = controller(&invoker, config)
            .complete("system", "supercalifragilistic")
            .await
            .unwrap_err();

        assert!(matches!(err, CompletionError::FatalBudgetFailure { char_budget: 4, .. }));
        assert!(invoker.calls().is_empty());
    }

    #[tokio::test]
    async fn test_transient_failure_retries_same_chunk() {
        let invoker = Arc::new(ScriptedInvoker::new(vec![transient(), transient()]));

        let output = controller(&invoker, test_config())
            .complete("system", "one two three")
            .await
            .unwrap();

        let calls = invoker.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|c| c == "one two three"));
        assert_eq!(output.text, "summary one..three");
    }

    #[tokio::test]
    async fn test_transient_failures_exhaust() {
        let invoker = Arc::new(ScriptedInvoker::new(vec![transient(), transient(), transient()]));

        let err = controller(&invoker, test_config())
            .complete("system", "one two three")
            .await
            .unwrap_err();

        assert_eq!(
            err,
            CompletionError::TransientFailureExhausted {
                chunk_index: 0,
                attempts: 3,
                cause: "connection reset".to_string(),
            }
        );
        assert_eq!(invoker.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_unparseable_rejection_is_retried_unchanged() {
        let invoker = Arc::new(ScriptedInvoker::new(vec![CompletionOutcome::Rejected {
            status: 429,
            message: "slow down".to_string(),
        }]));

        let output = controller(&invoker, test_config())
            .complete("system", "one two three")
            .await
            .unwrap();

        assert_eq!(invoker.calls().len(), 2);
        assert_eq!(output.state.authoritative_limit, None);
        assert_eq!(output.rechunks, 0);
    }

    #[tokio::test]
    async fn test_fatal_outcome_stops_immediately() {
        let invoker = Arc::new(ScriptedInvoker::new(vec![CompletionOutcome::Fatal {
            cause: "GROQ_API_KEY is not set".to_string(),
        }]));

        let err = controller(&invoker, test_config())
            .complete("system", "one two three")
            .await
            .unwrap_err();

        assert!(matches!(err, CompletionError::ProviderFatal { chunk_index: 0, .. }));
        assert_eq!(invoker.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let invoker = Arc::new(ScriptedInvoker::new(Vec::new()));

        let err = controller(&invoker, test_config())
            .complete("system", "  \n ")
            .await
            .unwrap_err();

        assert_eq!(err, CompletionError::EmptyInput);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let invoker = Arc::new(ScriptedInvoker::new(Vec::new()));
        let token = CancellationToken::new();
        token.cancel();

        let err = controller(&invoker, test_config())
            .with_cancellation(token)
            .complete("system", "one two three")
            .await
            .unwrap_err();

        assert_eq!(err, CompletionError::Cancelled { completed: 0 });
        assert!(invoker.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_waits_for_in_flight_call() {
        let token = CancellationToken::new();
        let invoker = Arc::new(ScriptedInvoker::cancelling_after(1, token.clone()));

        let err = controller(&invoker, test_config())
            .with_cancellation(token)
            .complete("system", &numbered_text(2_000))
            .await
            .unwrap_err();

        // The call that triggered cancellation still completed.
        assert_eq!(err, CompletionError::Cancelled { completed: 1 });
        assert_eq!(invoker.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_runs_do_not_share_limit_knowledge() {
        let invoker = Arc::new(ScriptedInvoker::new(vec![rate_limited(500, 900)]));
        let controller = controller(&invoker, test_config());
        let text = numbered_text(2_000);

        let first = controller.complete("system", &text).await.unwrap();
        let first_calls = invoker.calls().len();
        let second = controller.complete("system", &text).await.unwrap();

        assert_eq!(first.state.authoritative_limit, Some(500));
        assert_eq!(second.state.authoritative_limit, None);

        let calls = invoker.calls();
        // The second run starts from the assumed budget again.
        assert_eq!(calls[first_calls], calls[0]);
        assert!(calls[first_calls].len() > 1_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_backoff_grows_per_failure() {
        let invoker = Arc::new(ScriptedInvoker::new(vec![transient(), transient(), transient()]));
        let config = ControllerConfig {
            max_transient_retries: 3,
            transient_backoff: Duration::from_secs(1),
            ..test_config()
        };

        let start = tokio::time::Instant::now();
        let output = controller(&invoker, config)
            .complete("system", "one two three")
            .await
            .unwrap();

        // 1s + 2s + 3s before the fourth call.
        assert_eq!(start.elapsed(), Duration::from_secs(6));
        assert_eq!(invoker.calls().len(), 4);
        assert_eq!(output.text, "summary one..three");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_waits_for_cooldown() {
        let invoker = Arc::new(ScriptedInvoker::new(vec![rate_limited(500, 900)]));
        let config = ControllerConfig {
            transient_backoff: Duration::from_secs(1),
            rate_limit_cooldown: Duration::from_secs(20),
            ..test_config()
        };

        let start = tokio::time::Instant::now();
        let output = controller(&invoker, config)
            .complete("system", &numbered_text(2_000))
            .await
            .unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(20));
        assert_eq!(output.rechunks, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_cuts_backoff_short() {
        let invoker = Arc::new(ScriptedInvoker::new(vec![transient()]));
        let token = CancellationToken::new();
        let config = ControllerConfig {
            transient_backoff: Duration::from_secs(60),
            ..test_config()
        };

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            canceller.cancel();
        });

        let start = tokio::time::Instant::now();
        let err = controller(&invoker, config)
            .with_cancellation(token)
            .complete("system", "one two three")
            .await
            .unwrap_err();

        assert_eq!(start.elapsed(), Duration::from_secs(5));
        assert_eq!(err, CompletionError::Cancelled { completed: 0 });
        assert_eq!(invoker.calls().len(), 1);
    }
}
