use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A multi-turn conversation derived from prompt stages and a chunk plan.
///
/// Message order is significant: the system message first, data messages in
/// chunk order, the analysis message last.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationPlan {
    system_message: Message,
    data_messages: Vec<Message>,
    analysis_message: Message,
}

impl ConversationPlan {
    pub(crate) fn new(
        system_message: Message,
        data_messages: Vec<Message>,
        analysis_message: Message,
    ) -> Self {
        Self {
            system_message,
            data_messages,
            analysis_message,
        }
    }

    pub fn system_message(&self) -> &Message {
        &self.system_message
    }

    pub fn data_messages(&self) -> &[Message] {
        &self.data_messages
    }

    pub fn analysis_message(&self) -> &Message {
        &self.analysis_message
    }

    /// Flatten into the wire order the backend expects.
    pub fn into_messages(self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.data_messages.len() + 2);
        messages.push(self.system_message);
        messages.extend(self.data_messages);
        messages.push(self.analysis_message);
        messages
    }
}
