// Interactive chat loop
//
// Lines naming a tool with an extractable target go straight to the gateway.
// Everything else is sent to the model; if its reply names a runnable tool
// the user is asked before it runs.

use anyhow::{Context, Result};
use std::io::Write;

use super::conversation::ConversationHistory;
use super::extractor::{extract_tool_intent, ToolIntent};
use super::input::{default_history_path, InputHandler};
use super::prompt::{system_prompt, tools_guide};
use crate::client::{GatewayClient, GatewayReply};
use crate::config::ChatConfig;
use crate::errors::{
    gateway_unreachable_error, ollama_unreachable_error, wrap_error_with_suggestion,
    UserFriendlyError,
};
use crate::providers::{LlmProvider, OllamaProvider, StreamChunk};
use crate::tools::ToolKind;

/// What a single input line led to
#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    Exit,
    Help,
    /// A tool was run directly from the user's line
    ToolRan(String),
    /// The model answered, possibly suggesting a tool
    Reply {
        text: String,
        suggestion: Option<ToolIntent>,
    },
}

pub struct ChatSession {
    provider: Box<dyn LlmProvider>,
    gateway: GatewayClient,
    conversation: ConversationHistory,
    system_prompt: String,
    confirm_tools: bool,
}

impl ChatSession {
    pub fn new(provider: Box<dyn LlmProvider>, gateway: GatewayClient, config: &ChatConfig) -> Self {
        Self {
            provider,
            gateway,
            conversation: ConversationHistory::new(config.max_messages),
            system_prompt: system_prompt(),
            confirm_tools: config.confirm_tools,
        }
    }

    pub fn from_config(config: &ChatConfig) -> Result<Self> {
        let provider = OllamaProvider::new(&config.ollama_url, config.model.clone())
            .user_context_with_suggestion(
                "Could not set up the Ollama client",
                "check that the system TLS certificates are installed",
            )?;
        let gateway = GatewayClient::new(&config.gateway_url).user_context_with_suggestion(
            "Could not set up the gateway client",
            "check that the system TLS certificates are installed",
        )?;
        Ok(Self::new(Box::new(provider), gateway, config))
    }

    pub fn conversation(&self) -> &ConversationHistory {
        &self.conversation
    }

    /// Run the read-eval loop until the user quits
    pub async fn run(&mut self) -> Result<()> {
        self.gateway
            .check_health()
            .await
            .user_context(&gateway_unreachable_error(self.gateway.base_url()))?;

        let mut input = InputHandler::new(default_history_path())?;
        let mut stdout = std::io::stdout();

        println!("Kali Linux Tools chat ({} via {})", self.provider.default_model(), self.provider.name());
        println!("Type 'help' for the tool list, 'exit' to quit.\n");

        loop {
            let Some(line) = input.read_line("You: ")? else {
                break;
            };
            if line.is_empty() {
                continue;
            }

            match self.process_line(&line, &mut stdout).await {
                Ok(Turn::Exit) => break,
                Ok(Turn::Help) => println!("{}", tools_guide()),
                Ok(Turn::ToolRan(_)) => {}
                Ok(Turn::Reply {
                    suggestion: Some(intent),
                    ..
                }) => {
                    if self.confirm_tools && !input.confirm(&confirm_question(&intent))? {
                        continue;
                    }
                    let rendered = self.run_tool(&intent).await;
                    println!("\n{}\n", rendered);
                }
                Ok(Turn::Reply { .. }) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Chat turn failed");
                    println!("\nError: {:#}\n", e);
                }
            }
        }

        if let Err(e) = input.save_history() {
            tracing::warn!(error = %e, "Failed to save input history");
        }
        println!("Goodbye.");
        Ok(())
    }

    /// Handle one line of user input, writing streamed output to `out`
    pub async fn process_line<W: Write>(&mut self, line: &str, out: &mut W) -> Result<Turn> {
        match line.trim().to_lowercase().as_str() {
            "exit" | "quit" => return Ok(Turn::Exit),
            "help" => return Ok(Turn::Help),
            _ => {}
        }

        self.conversation.add_user_message(line);

        if let Some(intent) = extract_tool_intent(line) {
            writeln!(out, "\nRunning {}...", intent.kind)?;
            let rendered = self.run_tool(&intent).await;
            writeln!(out, "\n{}\n", rendered)?;
            self.conversation.add_assistant_message(rendered.clone());
            return Ok(Turn::ToolRan(rendered));
        }

        let text = self.stream_reply(out).await?;
        self.conversation.add_assistant_message(text.clone());
        let suggestion = extract_tool_intent(&text);

        Ok(Turn::Reply { text, suggestion })
    }

    async fn stream_reply<W: Write>(&self, out: &mut W) -> Result<String> {
        let messages = self.conversation.with_system(&self.system_prompt);
        let mut rx = self
            .provider
            .send_message_stream(&messages)
            .await
            .user_context(&ollama_unreachable_error())?;

        let mut text = String::new();
        write!(out, "\nAssistant: ")?;
        while let Some(chunk) = rx.recv().await {
            match chunk? {
                StreamChunk::TextDelta(delta) => {
                    write!(out, "{}", delta)?;
                    out.flush().context("Failed to flush output")?;
                    text.push_str(&delta);
                }
                StreamChunk::Done => break,
            }
        }
        writeln!(out, "\n")?;

        Ok(text)
    }

    async fn run_tool(&self, intent: &ToolIntent) -> String {
        match self.gateway.invoke(intent.kind, &intent.params).await {
            Ok(reply) => render_reply(intent.kind, &reply),
            Err(e) => {
                tracing::warn!(tool = %intent.kind, error = %e, "Gateway call failed");
                wrap_error_with_suggestion(
                    format!("Failed to execute {}: {:#}", intent.kind, e),
                    &format!("check the gateway with `curl {}/health`", self.gateway.base_url()),
                )
            }
        }
    }
}

fn confirm_question(intent: &ToolIntent) -> String {
    format!(
        "Run {} with {}?",
        intent.kind,
        serde_json::Value::Object(intent.params.clone())
    )
}

/// Format a gateway reply for the terminal
pub fn render_reply(kind: ToolKind, reply: &GatewayReply) -> String {
    match reply {
        GatewayReply::Success { tool, results } => {
            let status = if results.success { "Success" } else { "Failed" };
            let mut rendered = format!(
                "Tool: {}\nStatus: {}\n\nOutput:\n```\n{}\n```\n",
                tool,
                status,
                results.stdout.trim_end()
            );
            if !results.stderr.trim().is_empty() {
                rendered.push_str(&format!(
                    "\nErrors/Warnings:\n```\n{}\n```\n",
                    results.stderr.trim_end()
                ));
            }
            rendered
        }
        GatewayReply::Error { message, code } => match code {
            Some(code) => format!("Failed to execute {}: {} (HTTP {})", kind, message, code),
            None => format!("Failed to execute {}: {}", kind, message),
        },
    }
}
