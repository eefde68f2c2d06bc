//! LLM node library
//!
//! Prompt assembly and chat completion against OpenAI-compatible APIs.

pub mod chat;
pub mod template;
