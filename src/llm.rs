//! LLM collaborators that propose a category for a file or directory.
//!
//! Two strategies implement [`CategorizationClient`]: [`OllamaClient`] talks
//! to an Ollama server over HTTP, [`RuleBasedClient`] answers offline from an
//! extension table. Both produce a raw line that must go through
//! [`parse_category_response`] before it reaches the taxonomy.
mod client;
mod response;
mod rules;

pub use client::{
    CategorizationClient, LlmError, OllamaClient, OllamaClientBuilder, build_prompt,
    retry_with_backoff,
};
pub use response::parse_category_response;
pub use rules::RuleBasedClient;
