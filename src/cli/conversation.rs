// Conversation transcript for the chat loop

use crate::providers::ChatMessage;

/// Ordered transcript, trimmed from the front when it grows past its limit
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    messages: Vec<ChatMessage>,
    max_messages: usize,
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(50)
    }
}

impl ConversationHistory {
    pub fn new(max_messages: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_messages: max_messages.max(1),
        }
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.push(ChatMessage::user(content));
    }

    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.push(ChatMessage::assistant(content));
    }

    /// Messages for a model request, with the system prompt first
    pub fn with_system(&self, system_prompt: &str) -> Vec<ChatMessage> {
        std::iter::once(ChatMessage::system(system_prompt))
            .chain(self.messages.iter().cloned())
            .collect()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
        if self.messages.len() > self.max_messages {
            let remove_count = self.messages.len() - self.max_messages;
            self.messages.drain(0..remove_count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ChatRole;

    #[test]
    fn test_trims_oldest_first() {
        let mut history = ConversationHistory::new(3);
        history.add_user_message("one");
        history.add_assistant_message("two");
        history.add_user_message("three");
        history.add_assistant_message("four");

        let contents: Vec<&str> = history.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["two", "three", "four"]);
    }

    #[test]
    fn test_system_prompt_leads() {
        let mut history = ConversationHistory::default();
        history.add_user_message("hello");

        let messages = history.with_system("be terse");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(messages[1], ChatMessage::user("hello"));
        assert_eq!(history.message_count(), 1);
    }
}
