//! Prompt templates for RAG generation

use crate::types::RetrievedMatch;

/// System prompt used when answering from retrieved context
pub const RAG_SYSTEM_PROMPT: &str = "You are a helpful, knowledgeable assistant that answers questions based on provided context.

Guidelines:
- Use the provided context to answer questions accurately.
- If the context doesn't contain relevant information, say so clearly.
- Be concise but thorough.
- Cite sources when referencing specific information from the context.
- If unsure, ask for clarification or suggest related topics.";

/// System prompt used when answering without retrieval
pub const SIMPLE_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Answer questions clearly and concisely.";

/// Rendered in place of context when retrieval found nothing
pub const NO_CONTEXT: &str = "No relevant context found.";

/// A system/user message pair for a chat completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: &'static str,
    pub user: String,
}

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the grounded prompt for a question and its formatted context
    pub fn build_rag_prompt(query: &str, context: &str) -> Prompt {
        Prompt {
            system: RAG_SYSTEM_PROMPT,
            user: format!(
                "Based on the following context, answer this question:\n\nQuestion: {}\n\nContext:\n{}\n\nAnswer:",
                query, context
            ),
        }
    }

    /// Build a prompt that passes the question through verbatim
    pub fn build_simple_prompt(query: &str) -> Prompt {
        Prompt {
            system: SIMPLE_SYSTEM_PROMPT,
            user: query.to_string(),
        }
    }

    /// Render retrieved chunks as numbered source blocks
    pub fn format_context_for_prompt(matches: &[RetrievedMatch]) -> String {
        if matches.is_empty() {
            return NO_CONTEXT.to_string();
        }

        matches
            .iter()
            .enumerate()
            .map(|(i, m)| {
                format!(
                    "[Source {}] {} (similarity: {:.2})\n{}",
                    i + 1,
                    m.display_filename(),
                    m.score,
                    m.text.trim()
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n---\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkMetadata;

    fn retrieved(filename: &str, score: f32, text: &str) -> RetrievedMatch {
        RetrievedMatch {
            id: "id".to_string(),
            score,
            text: text.to_string(),
            metadata: ChunkMetadata {
                filename: filename.to_string(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_empty_context() {
        assert_eq!(
            PromptBuilder::format_context_for_prompt(&[]),
            "No relevant context found."
        );
    }

    #[test]
    fn test_single_source_block() {
        let context =
            PromptBuilder::format_context_for_prompt(&[retrieved("notes.md", 0.876, "  Rust is fast.\n")]);
        assert_eq!(context, "[Source 1] notes.md (similarity: 0.88)\nRust is fast.");
        assert_eq!(context.matches("[Source").count(), 1);
    }

    #[test]
    fn test_blocks_are_separated_and_unknown_filename() {
        let context = PromptBuilder::format_context_for_prompt(&[
            retrieved("a.txt", 0.9, "alpha"),
            retrieved("", 0.5, "beta"),
        ]);
        assert_eq!(
            context,
            "[Source 1] a.txt (similarity: 0.90)\nalpha\n\n---\n\n[Source 2] unknown (similarity: 0.50)\nbeta"
        );
    }

    #[test]
    fn test_simple_prompt_is_verbatim() {
        let prompt = PromptBuilder::build_simple_prompt("x");
        assert_eq!(prompt.system, SIMPLE_SYSTEM_PROMPT);
        assert_eq!(prompt.user, "x");
    }

    #[test]
    fn test_rag_prompt_template() {
        let prompt = PromptBuilder::build_rag_prompt("What is RAG?", "[Source 1] ...");
        assert_eq!(prompt.system, RAG_SYSTEM_PROMPT);
        assert_eq!(
            prompt.user,
            "Based on the following context, answer this question:\n\nQuestion: What is RAG?\n\nContext:\n[Source 1] ...\n\nAnswer:"
        );
    }
}
