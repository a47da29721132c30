//! Prompts for the two LLM-backed collaborators.

/// System prompt for note extraction.
pub const EXTRACTION_SYSTEM_PROMPT: &str = "You are an intelligent note analyzer. \
Respond only with a single JSON object and no commentary.";

/// System prompt for suggestion generation.
pub const SUGGESTION_SYSTEM_PROMPT: &str = "You connect people's needs with resources \
other people have mentioned. Keep suggestions short, concrete and kind.";

/// Builds the user prompt asking for sentiments, needs and availabilities.
#[must_use]
pub fn extraction_prompt(note: &str) -> String {
    format!(
        r#"Given this personal note:
"""{note}"""

Extract the following:
1. Sentiments to be satisfied (e.g., happiness, public service, learning curiosity).
2. Resources needed (concrete or abstract things the author desires).
3. Resources available (concrete or abstract things the author already has access to).

Return your answer in JSON with keys: "sentiments", "resources_needed", "resources_available".
Each value must be a list of short phrases."#
    )
}

/// Builds the user prompt connecting one need with one availability.
#[must_use]
pub fn suggestion_prompt(need: &str, availability: &str) -> String {
    format!(
        "A person wrote this as a problem note: \"{need}\"\n\
         Another resource note says: \"{availability}\"\n\
         Generate a thoughtful, creative, actionable suggestion connecting the two."
    )
}
