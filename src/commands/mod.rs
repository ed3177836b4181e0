/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `threads`  - Thread creation, listing, renaming and deletion
- `messages` - Adding, editing, branching and deleting messages
- `view`     - Display path, whole tree and token usage output

Handlers take an opened `MessageStore` and print to stdout.
*/

use crate::error::{ChatBranchError, Result};

pub mod messages;
pub mod threads;
pub mod view;

/// Pretty-print a value as JSON on stdout
fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(ChatBranchError::Serialization)?;
    println!("{}", json);
    Ok(())
}

/// Shorten `text` to `max` characters, ending in `...` when cut
fn truncate(text: &str, max: usize) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() <= max {
        return single_line;
    }
    let kept: String = single_line.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}
