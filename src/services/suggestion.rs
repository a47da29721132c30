//! Suggestion generation.

use crate::llm::{LlmProvider, prompts};
use crate::{Error, Result};
use std::fmt::Display;
use std::sync::Arc;

/// Prefix of the text substituted when generation fails.
pub const FALLBACK_PREFIX: &str = "Could not generate suggestion";

/// Builds the fallback suggestion text for a generation error.
#[must_use]
pub fn fallback_text(error: impl Display) -> String {
    format!("{FALLBACK_PREFIX}: {error}")
}

/// Produces free-text suggestions for matched (need, availability) pairs.
///
/// Errors are returned, not swallowed; the pipeline substitutes
/// [`fallback_text`] per failed pair.
pub trait SuggestionGenerator: Send + Sync {
    /// Generates a suggestion connecting `need` with `availability`.
    ///
    /// # Errors
    ///
    /// Returns an error if the text service fails or returns nothing usable.
    fn generate(&self, need: &str, availability: &str) -> Result<String>;
}

impl<F> SuggestionGenerator for F
where
    F: Fn(&str, &str) -> Result<String> + Send + Sync,
{
    fn generate(&self, need: &str, availability: &str) -> Result<String> {
        self(need, availability)
    }
}

/// LLM-backed suggestion generator.
pub struct LlmSuggestionGenerator {
    llm: Arc<dyn LlmProvider>,
}

impl LlmSuggestionGenerator {
    /// Creates a generator that shares `llm` with other services.
    #[must_use]
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }
}

impl SuggestionGenerator for LlmSuggestionGenerator {
    fn generate(&self, need: &str, availability: &str) -> Result<String> {
        let response = self.llm.complete_with_system(
            prompts::SUGGESTION_SYSTEM_PROMPT,
            &prompts::suggestion_prompt(need, availability),
        )?;

        let text = response.trim();
        if text.is_empty() {
            return Err(Error::OperationFailed {
                operation: "generate_suggestion".to_string(),
                cause: "empty response".to_string(),
            });
        }
        Ok(text.to_string())
    }
}
