// Ollama provider
//
// Streams replies from the native `/api/chat` endpoint, which answers with
// newline-delimited JSON objects.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::types::{ChatMessage, StreamChunk};
use super::LlmProvider;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponseLine {
    #[serde(default)]
    message: Option<ResponseMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

impl OllamaProvider {
    pub fn new(base_url: &str, model: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Parse one NDJSON line into a chunk
    fn parse_line(line: &str) -> Result<Option<StreamChunk>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let parsed: ChatResponseLine =
            serde_json::from_str(line).context("Failed to parse Ollama stream line")?;

        if let Some(error) = parsed.error {
            anyhow::bail!("Ollama error: {}", error);
        }
        if parsed.done {
            return Ok(Some(StreamChunk::Done));
        }

        Ok(parsed
            .message
            .map(|m| m.content)
            .filter(|content| !content.is_empty())
            .map(StreamChunk::TextDelta))
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn send_message_stream(
        &self,
        messages: &[ChatMessage],
    ) -> Result<mpsc::Receiver<Result<StreamChunk>>> {
        let (tx, rx) = mpsc::channel(100);
        let url = format!("{}/api/chat", self.base_url);

        tracing::debug!(model = %self.model, messages = messages.len(), "Sending streaming request to Ollama");

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest {
                model: &self.model,
                messages,
                stream: true,
            })
            .send()
            .await
            .with_context(|| format!("Failed to reach Ollama at {}", self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Ollama request failed\n\nStatus: {}\nBody: {}",
                status,
                error_body
            );
        }

        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut buffer = Vec::new();

            while let Some(chunk) = stream.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let _ = tx.send(Err(anyhow::anyhow!("Ollama stream error: {}", e))).await;
                        return;
                    }
                };
                buffer.extend_from_slice(&bytes);

                while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                    let line_bytes: Vec<u8> = buffer.drain(..=newline_pos).collect();
                    let line = String::from_utf8_lossy(&line_bytes);

                    match Self::parse_line(&line) {
                        Ok(Some(StreamChunk::Done)) => {
                            let _ = tx.send(Ok(StreamChunk::Done)).await;
                            return;
                        }
                        Ok(Some(chunk)) => {
                            if tx.send(Ok(chunk)).await.is_err() {
                                return;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            let _ = tx.send(Err(e)).await;
                            return;
                        }
                    }
                }
            }

            // Trailing line without a newline
            let rest = String::from_utf8_lossy(&buffer).into_owned();
            let last = match Self::parse_line(&rest) {
                Ok(Some(StreamChunk::Done)) | Ok(None) => Ok(StreamChunk::Done),
                Ok(Some(chunk)) => {
                    if tx.send(Ok(chunk)).await.is_err() {
                        return;
                    }
                    Ok(StreamChunk::Done)
                }
                Err(e) => Err(e),
            };
            let _ = tx.send(last).await;
        });

        Ok(rx)
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}
