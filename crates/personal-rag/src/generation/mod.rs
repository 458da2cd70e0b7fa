//! Prompt construction for answer generation

pub mod prompt;

pub use prompt::{Prompt, PromptBuilder, NO_CONTEXT, RAG_SYSTEM_PROMPT, SIMPLE_SYSTEM_PROMPT};
