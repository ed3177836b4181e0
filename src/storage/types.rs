use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ChatBranchError;

/// Identifier of a thread row (auto-increment)
pub type ThreadId = i64;

/// Identifier of a message row (auto-increment)
pub type MessageId = i64;

/// Name given to threads created without an explicit name
pub const DEFAULT_THREAD_NAME: &str = "New Chat";

/// A top-level conversation container holding a forest of messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    /// Unique identifier for the thread
    pub id: ThreadId,
    /// User-facing name
    pub name: String,
    /// When the thread was created
    pub created_at: DateTime<Utc>,
    /// Last rename, prompt change or message add
    pub updated_at: DateTime<Utc>,
    /// Per-thread system prompt, empty when unset
    pub thread_system_prompt: String,
}

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Written by the user
    User,
    /// Produced by the model
    Assistant,
}

impl Role {
    /// Stable string stored in the `role` column
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ChatBranchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(ChatBranchError::Validation(format!(
                "Invalid role: {}. Must be one of: user, assistant",
                other
            ))),
        }
    }
}

/// One node of the message forest, as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub thread_id: ThreadId,
    /// `None` marks a thread root
    pub parent_message_id: Option<MessageId>,
    pub role: Role,
    pub content: String,
    /// Whether the message is sent to the model as context
    pub is_context: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// True for messages without a parent
    pub fn is_root(&self) -> bool {
        self.parent_message_id.is_none()
    }
}

/// Token counts reported by the provider for one assistant message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Total tokens used (prompt + completion, as reported)
    #[serde(default)]
    pub total_tokens: u64,
    /// Number of tokens in the prompt
    #[serde(default)]
    pub prompt_tokens: u64,
    /// Number of tokens in the completion
    #[serde(default)]
    pub completion_tokens: u64,
}

impl TokenUsage {
    /// Create usage from prompt and completion counts
    ///
    /// # Examples
    ///
    /// ```
    /// use chatbranch::storage::TokenUsage;
    ///
    /// let usage = TokenUsage::new(100, 50);
    /// assert_eq!(usage.total_tokens, 150);
    /// ```
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
            prompt_tokens,
            completion_tokens,
        }
    }

    /// Usage that only carries a total (providers that do not split counts)
    pub fn with_total(total_tokens: u64) -> Self {
        Self {
            total_tokens,
            ..Self::default()
        }
    }
}

/// A message to be inserted with [`super::MessageStore::add_message`]
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub thread_id: ThreadId,
    pub role: Role,
    pub content: String,
    pub parent_message_id: Option<MessageId>,
    pub is_context: bool,
    pub usage: Option<TokenUsage>,
}

impl NewMessage {
    /// A context-included user message
    pub fn user(thread_id: ThreadId, content: impl Into<String>) -> Self {
        Self::new(thread_id, Role::User, content)
    }

    /// A context-included assistant message
    pub fn assistant(thread_id: ThreadId, content: impl Into<String>) -> Self {
        Self::new(thread_id, Role::Assistant, content)
    }

    pub fn new(thread_id: ThreadId, role: Role, content: impl Into<String>) -> Self {
        Self {
            thread_id,
            role,
            content: content.into(),
            parent_message_id: None,
            is_context: true,
            usage: None,
        }
    }

    /// Attach the message under `parent`
    pub fn reply_to(mut self, parent: MessageId) -> Self {
        self.parent_message_id = Some(parent);
        self
    }

    /// Exclude the message from the model context
    pub fn excluded(mut self) -> Self {
        self.is_context = false;
        self
    }

    /// Record provider usage (kept for assistant messages only)
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// A message reduced to what the model needs as context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextMessage {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
}

impl From<&Message> for ContextMessage {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            role: message.role,
            content: message.content.clone(),
        }
    }
}
