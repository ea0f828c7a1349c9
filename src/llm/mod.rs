//! LLM client for answer generation.

mod client;
mod prompts;

pub use client::{LlmClient, LlmResponse, Message, Role, TokenUsage};
pub use prompts::Prompts;

use crate::error::Result;

/// Answer generation seam: takes a question and retrieved context, returns
/// an answer string. Implemented by [`LlmClient`] and by test stubs.
pub trait AnswerGenerator {
    /// Generate an answer for `query` grounded in `context`.
    fn generate(
        &self,
        query: &str,
        context: &str,
    ) -> impl std::future::Future<Output = Result<String>>;
}
