//! LLM integration crate for docbot.
//!
//! This crate provides a provider-agnostic abstraction for streaming and
//! non-streaming chat completion through a unified trait-based interface.
//!
//! # Example
//! ```no_run
//! use docbot_llm::{ChatMessage, Completer, CompletionRequest, providers::OpenAiCompleter};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OpenAiCompleter::new("sk-...");
//! let request = CompletionRequest::new(
//!     vec![ChatMessage::user("Hello, world!")],
//!     "gpt-4o-mini",
//! );
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;

// Re-export main types
pub use client::{
    ChatMessage, Completer, CompletionChunk, CompletionRequest, CompletionResponse,
    CompletionStream,
};
pub use factory::create_completer;
pub use providers::OpenAiCompleter;
