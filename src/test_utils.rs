//! Test utilities for ChatBranch
//!
//! This module provides message fixtures, temporary store creation and
//! assertion helpers shared by the unit tests.

use crate::error::Result;
use crate::storage::{Message, MessageId, MessageStore, Role};
use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

/// Fixed creation time of message 0; message `id` is created `id` seconds later
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}

/// Build an in-memory message of thread 1
///
/// Content is `"message {id}"`, and ids double as creation order.
pub fn msg(id: MessageId, parent: Option<MessageId>, role: Role) -> Message {
    Message {
        id,
        thread_id: 1,
        parent_message_id: parent,
        role,
        content: format!("message {}", id),
        is_context: true,
        created_at: base_time() + Duration::seconds(id),
    }
}

/// User/assistant chain 1 -> 2 -> 3 -> 4, alternating roles
pub fn linear_thread() -> Vec<Message> {
    vec![
        msg(1, None, Role::User),
        msg(2, Some(1), Role::Assistant),
        msg(3, Some(2), Role::User),
        msg(4, Some(3), Role::Assistant),
    ]
}

/// Create a temporary directory for testing
///
/// # Returns
///
/// Returns a TempDir that will be cleaned up when dropped
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Create a store backed by a fresh database inside a temporary directory
///
/// The directory must outlive the store, so both are returned.
pub fn temp_store() -> (TempDir, MessageStore) {
    let dir = temp_dir();
    let store = MessageStore::new_with_path(dir.path().join("chatbranch.db"))
        .expect("Failed to create test store");
    (dir, store)
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T>(result: Result<T>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}' but got Ok", expected),
        Err(e) => {
            let error_msg = format!("{:#}", e);
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatBranchError;

    #[test]
    fn test_msg_fixture() {
        let m = msg(3, Some(2), Role::User);
        assert_eq!(m.thread_id, 1);
        assert_eq!(m.content, "message 3");
        assert!(m.created_at > msg(2, None, Role::User).created_at);
    }

    #[test]
    fn test_linear_thread_shape() {
        let thread = linear_thread();
        assert_eq!(thread.len(), 4);
        assert!(thread[0].is_root());
        assert_eq!(thread[3].parent_message_id, Some(3));
    }

    #[test]
    fn test_assert_error_contains() {
        let result: Result<()> = Err(ChatBranchError::Validation("bad input".into()).into());
        assert_error_contains(result, "bad input");
    }

    #[test]
    #[should_panic(expected = "but got Ok")]
    fn test_assert_error_contains_panics_on_ok() {
        assert_error_contains(Ok(()), "x");
    }
}
