//! ChatBranch - branching chat history library
//!
//! This library stores conversations as message trees, resolves which branch
//! of a thread to display and computes cumulative token usage along it.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `storage`: SQLite persistence for threads, messages and token usage
//! - `tree`: Arena forest built from a thread's flat message list
//! - `path`: Display path resolution for the current message
//! - `tokens`: Cumulative usage along paths and across the tree
//! - `session`: Current thread/message state of a client session
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use chatbranch::{ChatSession, MessageStore, NewMessage};
//!
//! fn main() -> anyhow::Result<()> {
//!     let store = MessageStore::new_with_path("/tmp/chatbranch.db")?;
//!     let thread = store.create_thread("Ideas")?;
//!     let question = store.add_message(NewMessage::user(thread, "Hello"))?;
//!
//!     let mut session = ChatSession::for_thread(thread);
//!     session.select_message(question);
//!     if let Some(view) = session.load(&store, 128_000)? {
//!         println!("{}", view.usage.usage_display);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod path;
pub mod session;
pub mod storage;
pub mod tokens;
pub mod tree;

// Re-export commonly used types
pub use config::Config;
pub use error::{ChatBranchError, Result};
pub use path::{resolve_path, DisplayPath, PathOrigin};
pub use session::{ChatSession, ThreadView};
pub use storage::{Message, MessageStore, NewMessage, Role, Thread, TokenUsage};
pub use tokens::{CumulativeUsage, UsageLookup, UsageTier};
pub use tree::MessageForest;

#[cfg(test)]
pub mod test_utils;
