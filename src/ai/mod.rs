//! AI module for commit messages
//!
//! Provides:
//! - The `MessageGenerator` capability and template fallback
//! - Prompt building with truncated diff context
//! - Chat completion clients (OpenAI-compatible, Anthropic)

mod message;
mod providers;

pub use message::{
    build_prompt, commit_message, template_message, truncate_chars, MessageGenerator, CONTEXT_LIMIT,
};
pub use providers::{AiClient, AiConfig, AiProvider};
