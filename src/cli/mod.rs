// CLI module
// Public interface for the interactive chat client

mod chat;
mod conversation;
mod extractor;
mod input;
mod prompt;

pub use chat::{render_reply, ChatSession, Turn};
pub use conversation::ConversationHistory;
pub use extractor::{extract_tool_intent, ToolIntent};
pub use input::{default_history_path, InputHandler};
pub use prompt::{system_prompt, tools_guide};
