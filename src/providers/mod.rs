// Language model providers
//
// The chat loop talks to a local model through this trait; Ollama is the
// only implementation.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc::Receiver;

pub mod ollama;
pub mod types;

pub use ollama::OllamaProvider;
pub use types::{ChatMessage, ChatRole, StreamChunk};

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send the conversation and stream the reply
    ///
    /// The channel closes after `StreamChunk::Done` or an error.
    async fn send_message_stream(
        &self,
        messages: &[ChatMessage],
    ) -> Result<Receiver<Result<StreamChunk>>>;

    /// Provider name (e.g., "ollama")
    fn name(&self) -> &str;

    /// Model used for requests
    fn default_model(&self) -> &str;
}
