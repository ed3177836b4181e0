//! View context for one client session
//!
//! Holds the current thread and current message explicitly. Loading a view
//! never changes either id; only navigation events do.

use serde::Serialize;

use crate::error::Result;
use crate::path::PathOrigin;
use crate::storage::{MessageId, MessageStore, ThreadId};
use crate::tokens::{AnnotatedMessage, CumulativeUsage};

/// Resolved, token-annotated display path of a thread
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreadView {
    pub thread_id: ThreadId,
    /// The id the path was resolved for, unchanged by resolution
    pub current_message_id: Option<MessageId>,
    pub origin: PathOrigin,
    pub messages: Vec<AnnotatedMessage>,
    /// Usage summed over the whole displayed path
    pub usage: CumulativeUsage,
}

impl ThreadView {
    pub fn ids(&self) -> Vec<MessageId> {
        self.messages.iter().map(|m| m.message.id).collect()
    }

    /// Parent for the next message sent from this view
    pub fn reply_parent(&self) -> Option<MessageId> {
        self.messages.last().map(|m| m.message.id)
    }
}

/// Current thread and message of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChatSession {
    thread_id: Option<ThreadId>,
    current_message_id: Option<MessageId>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session positioned on a thread, showing its deepest path
    pub fn for_thread(thread_id: ThreadId) -> Self {
        Self {
            thread_id: Some(thread_id),
            current_message_id: None,
        }
    }

    pub fn thread_id(&self) -> Option<ThreadId> {
        self.thread_id
    }

    pub fn current_message_id(&self) -> Option<MessageId> {
        self.current_message_id
    }

    /// Switch threads; the current message is reset
    pub fn select_thread(&mut self, thread_id: ThreadId) {
        self.thread_id = Some(thread_id);
        self.current_message_id = None;
    }

    /// Click on a node of the current thread
    pub fn select_message(&mut self, message_id: MessageId) {
        self.current_message_id = Some(message_id);
    }

    /// A message was sent and answered; follow the reply
    pub fn record_sent(&mut self, assistant_message_id: MessageId) {
        self.current_message_id = Some(assistant_message_id);
    }

    /// A message was edited; keep it current so reloads show its branch
    pub fn record_edit(&mut self, message_id: MessageId) {
        self.current_message_id = Some(message_id);
    }

    /// The thread was deleted or deselected
    pub fn clear(&mut self) {
        self.thread_id = None;
        self.current_message_id = None;
    }

    /// Resolve the display path for the session state
    ///
    /// Returns `None` when no thread is selected. Calling this repeatedly
    /// without a navigation event yields the same view.
    pub fn load(&self, store: &MessageStore, max_tokens: u64) -> Result<Option<ThreadView>> {
        let Some(thread_id) = self.thread_id else {
            return Ok(None);
        };
        store
            .load_display_path(thread_id, self.current_message_id, max_tokens)
            .map(Some)
    }
}
