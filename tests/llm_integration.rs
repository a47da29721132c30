//! LLM Client Integration Tests
//!
//! Tests the OpenAI-compatible client, the resilience layer, and the two
//! LLM-backed services built on them:
//! - Provider configuration and validation
//! - Connection failures surface as errors, never panics
//! - Retries for timeouts only, and circuit breaking
//! - Extraction and suggestion services degrade to their fallbacks
//!
//! These tests do NOT require actual API keys; network tests target closed
//! local ports.

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic, dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use hiddenthread::cli::{build_llm_provider, build_openai_client};
use hiddenthread::config::{HiddenThreadConfig, LlmConfig, MatchingConfig};
use hiddenthread::embedding::FastEmbedEmbedder;
use hiddenthread::llm::{
    LlmHttpConfig, LlmProvider, LlmResilienceConfig, OpenAiClient, ResilientLlmProvider,
};
use hiddenthread::services::{
    FALLBACK_PREFIX, LlmNoteExtractor, LlmSuggestionGenerator, MatchingPipeline, NoteExtractor,
    NoteProcessor,
};
use hiddenthread::{Error, Result};

/// Closed local port; connections are refused immediately.
const REFUSED_ENDPOINT: &str = "http://127.0.0.1:59997";

fn unreachable_client() -> OpenAiClient {
    OpenAiClient::new()
        .with_api_key("sk-or-test-key-for-testing-only")
        .with_endpoint(REFUSED_ENDPOINT)
        .with_http_config(LlmHttpConfig {
            timeout_ms: 2_000,
            connect_timeout_ms: 500,
        })
}

fn no_backoff() -> LlmResilienceConfig {
    LlmResilienceConfig {
        retry_backoff_ms: 0,
        ..LlmResilienceConfig::default()
    }
}

// ============================================================================
// Provider Configuration Tests
// ============================================================================

mod provider_config {
    use super::*;

    #[test]
    fn test_openai_client_defaults() {
        let client = OpenAiClient::new();
        assert_eq!(client.model(), OpenAiClient::DEFAULT_MODEL);
        assert_eq!(client.name(), "openai");
    }

    #[test]
    fn test_client_from_config() {
        let config = HiddenThreadConfig::new().with_overrides_from(|key| match key {
            "HIDDENTHREAD_LLM_MODEL" => Some("meta-llama/llama-3.1-8b-instruct".to_string()),
            "HIDDENTHREAD_LLM_API_KEY" => Some("sk-or-abc".to_string()),
            _ => None,
        });

        let client = build_openai_client(&config.llm);
        assert_eq!(client.model(), "meta-llama/llama-3.1-8b-instruct");
        assert!(client.validate().is_ok());
    }

    #[test]
    fn test_resilience_config_from_llm_config() {
        let llm = LlmConfig {
            max_retries: Some(3),
            breaker_failure_threshold: Some(0),
            ..LlmConfig::default()
        };
        let config = LlmResilienceConfig::from_config(&llm);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.breaker_failure_threshold, 1);
    }
}

// ============================================================================
// Provider Validation Tests
// ============================================================================

mod provider_validation {
    use super::*;

    #[test]
    fn test_openai_rejects_missing_api_key() {
        let result = OpenAiClient::new().complete("test prompt");
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_factory_rejects_missing_api_key() {
        assert!(matches!(
            build_llm_provider(&LlmConfig::default()),
            Err(Error::Configuration(_))
        ));
    }
}

// ============================================================================
// Connection Error Tests
// ============================================================================

mod connection_errors {
    use super::*;

    #[test]
    fn test_openai_connection_refused() {
        let result = unreachable_client().complete("test prompt");
        assert!(matches!(result, Err(Error::OperationFailed { .. })));
    }

    #[test]
    fn test_resilient_provider_passes_error_through() {
        let provider = ResilientLlmProvider::new(unreachable_client(), no_backoff());
        let result = provider.complete_with_system("system", "user");
        assert!(matches!(result, Err(Error::OperationFailed { .. })));
    }
}

// ============================================================================
// Resilient Provider Tests
// ============================================================================

mod resilient_provider {
    use super::*;

    /// Fails with `cause` for the first `failures` calls, then succeeds.
    struct ScriptedProvider {
        failures: u32,
        cause: &'static str,
        calls: AtomicU32,
    }

    impl ScriptedProvider {
        fn new(failures: u32, cause: &'static str) -> Self {
            Self {
                failures,
                cause,
                calls: AtomicU32::new(0),
            }
        }
    }

    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn complete(&self, _prompt: &str) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(Error::OperationFailed {
                    operation: "scripted".to_string(),
                    cause: self.cause.to_string(),
                })
            } else {
                Ok("ok".to_string())
            }
        }
    }

    #[test]
    fn test_succeeds_on_first_try() {
        let provider = ResilientLlmProvider::new(ScriptedProvider::new(0, ""), no_backoff());
        assert_eq!(provider.complete("p").expect("complete"), "ok");
    }

    #[test]
    fn test_retries_on_timeout() {
        let provider =
            ResilientLlmProvider::new(ScriptedProvider::new(1, "request timed out"), no_backoff());
        assert_eq!(provider.complete("p").expect("complete"), "ok");
    }

    #[test]
    fn test_does_not_retry_other_errors() {
        let provider = ResilientLlmProvider::new(
            ScriptedProvider::new(1, "API returned status: 400 Bad Request"),
            no_backoff(),
        );
        assert!(provider.complete("p").is_err());
    }

    #[test]
    fn test_circuit_opens_after_threshold() {
        let config = LlmResilienceConfig {
            max_retries: 0,
            retry_backoff_ms: 0,
            breaker_failure_threshold: 2,
            breaker_reset_timeout_ms: 60_000,
            breaker_half_open_max_calls: 1,
        };
        let provider = ResilientLlmProvider::new(ScriptedProvider::new(10, "boom"), config);

        assert!(provider.complete("p").is_err());
        assert!(provider.complete("p").is_err());

        let err = provider.complete("p").unwrap_err();
        assert!(err.to_string().contains("circuit breaker open"));
    }

    #[test]
    fn test_preserves_name() {
        let provider = ResilientLlmProvider::new(ScriptedProvider::new(0, ""), no_backoff());
        assert_eq!(provider.name(), "scripted");
    }
}

// ============================================================================
// Service Degradation Tests
// ============================================================================

mod service_degradation {
    use super::*;

    fn shared_unreachable() -> Arc<dyn LlmProvider> {
        Arc::new(ResilientLlmProvider::new(unreachable_client(), no_backoff()))
    }

    #[test]
    fn test_extractor_falls_back_when_provider_unreachable() {
        let extractor = LlmNoteExtractor::new(shared_unreachable());
        let extraction = extractor.extract(0, "I need a ladder and I have a spare bike");

        assert!(extraction.used_fallback);
        assert!(extraction.is_empty());
    }

    #[test]
    fn test_processor_completes_with_every_note_fallen_back() {
        let llm = shared_unreachable();
        let pipeline = MatchingPipeline::new(
            Arc::new(FastEmbedEmbedder::new()),
            Arc::new(LlmSuggestionGenerator::new(Arc::clone(&llm))),
            MatchingConfig::default(),
        )
        .expect("pipeline");
        let processor = NoteProcessor::new(Arc::new(LlmNoteExtractor::new(llm)), pipeline);

        let result = processor
            .process_notes(&["first note".to_string(), "second note".to_string()])
            .expect("batch succeeds");

        assert_eq!(result.processed_notes.len(), 2);
        assert!(result.processed_notes.iter().all(|n| n.used_fallback));
        assert!(result.suggestions.is_empty());
    }

    #[test]
    fn test_suggestions_fall_back_when_provider_unreachable() {
        let pipeline = MatchingPipeline::new(
            Arc::new(FastEmbedEmbedder::new()),
            Arc::new(LlmSuggestionGenerator::new(shared_unreachable())),
            MatchingConfig::default(),
        )
        .expect("pipeline");

        let suggestions = pipeline
            .run(&[
                hiddenthread::NoteExtraction::new(0, vec!["a spare bike".to_string()], Vec::new()),
                hiddenthread::NoteExtraction::new(1, Vec::new(), vec!["a spare bike".to_string()]),
            ])
            .expect("batch succeeds");

        assert_eq!(suggestions.len(), 1);
        assert!(suggestions[0].fallback);
        assert!(suggestions[0].suggestion.starts_with(FALLBACK_PREFIX));
    }
}
