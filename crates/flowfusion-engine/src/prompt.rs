//! Prompt text and assembly for the generation step.

/// Default system instruction sent with every generation call.
pub const SYSTEM_INSTRUCTION: &str =
    "You are a helpful assistant answering questions based on a user's workflow.";

/// Opens the user prompt, ahead of the accumulated context.
pub const PROMPT_PREAMBLE: &str = "Based on the following context, please answer the user's query.\n";

pub const CONTEXT_HEADER: &str = "\n\nContext from Knowledge Base:\n- ";
pub const PASSAGE_SEPARATOR: &str = "\n- ";

/// Appended to the context when a retrieval step fails.
pub const RETRIEVAL_FALLBACK_NOTE: &str = "\n\n(Could not retrieve context from Knowledge Base.)";

/// Returned instead of an answer when the generation service has no credential.
pub const UNCONFIGURED_ADVISORY: &str =
    "Generation service is not configured. Set OPENAI_API_KEY or model.api_key in flowfusion.toml.";

/// Format retrieved passages as one context block.
pub fn context_block(passages: &[String]) -> String {
    format!("{}{}", CONTEXT_HEADER, passages.join(PASSAGE_SEPARATOR))
}

/// The user prompt: preamble, accumulated context, then the literal query.
pub fn assemble_prompt(context: &str, query: &str) -> String {
    format!("{}{}\n\nUser Query: {}", PROMPT_PREAMBLE, context, query)
}
