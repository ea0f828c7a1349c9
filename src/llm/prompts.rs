//! LLM prompts for answer generation.
//!
//! The RAG answer prompt mirrors the one used by the original financial QA
//! deployment.

/// Collection of prompts used for answer generation.
pub struct Prompts;

impl Prompts {
    /// Prompt to answer a question from retrieved context.
    pub fn rag_answer() -> &'static str {
        r#"You are a helpful assistant.
Context:
{context}

Question:
{question}

Answer:"#
    }

    /// System prompt for financial question answering.
    pub fn system_financial_qa() -> &'static str {
        "You answer questions about financial reports using only the provided context. If the context does not contain the answer, say so."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rag_answer_has_placeholders() {
        let prompt = Prompts::rag_answer();
        assert!(prompt.contains("{context}"));
        assert!(prompt.contains("{question}"));
    }
}
