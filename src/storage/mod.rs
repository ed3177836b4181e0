//! SQLite message store
//!
//! Persists threads, the parent-linked message forest and per-message token
//! usage. Every read that feeds tree building is a single bulk query per
//! thread; parent chains are never walked with point queries.

use crate::error::{ChatBranchError, Result};
use crate::path::{resolve_path_with, DisplayPath};
use crate::session::ThreadView;
use crate::tokens::{annotate_path, cumulative_usage, enrich_tree, TokenTreeNode};
use crate::tree::MessageForest;
use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use directories::ProjectDirs;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub mod types;
pub use types::{
    ContextMessage, Message, MessageId, NewMessage, Role, Thread, ThreadId, TokenUsage,
    DEFAULT_THREAD_NAME,
};

/// Environment variable that overrides the database location
pub const DB_PATH_ENV: &str = "CHATBRANCH_DB_PATH";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS threads (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    thread_system_prompt TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    thread_id INTEGER NOT NULL REFERENCES threads(id) ON DELETE CASCADE,
    parent_message_id INTEGER REFERENCES messages(id),
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    is_context INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_messages_thread ON messages(thread_id, created_at);
CREATE INDEX IF NOT EXISTS idx_messages_parent ON messages(parent_message_id);
CREATE TABLE IF NOT EXISTS token_usage (
    message_id INTEGER PRIMARY KEY REFERENCES messages(id) ON DELETE CASCADE,
    total_tokens INTEGER NOT NULL DEFAULT 0,
    prompt_tokens INTEGER NOT NULL DEFAULT 0,
    completion_tokens INTEGER NOT NULL DEFAULT 0
);
";

const THREAD_COLUMNS: &str = "id, name, thread_system_prompt, created_at, updated_at";
const MESSAGE_COLUMNS: &str =
    "id, thread_id, parent_message_id, role, content, is_context, created_at";

/// Storage backend for threads and message trees
#[derive(Debug, Clone)]
pub struct MessageStore {
    db_path: PathBuf,
}

impl MessageStore {
    /// Create a new store in the user's data directory
    ///
    /// `CHATBRANCH_DB_PATH` overrides the location.
    pub fn new() -> Result<Self> {
        if let Ok(override_path) = std::env::var(DB_PATH_ENV) {
            return Self::new_with_path(override_path);
        }

        let proj_dirs = ProjectDirs::from("com", "chatbranch", "chatbranch")
            .ok_or_else(|| ChatBranchError::Storage("Could not determine data directory".into()))?;

        Self::new_with_path(proj_dirs.data_dir().join("chatbranch.db"))
    }

    /// Create a store backed by the given database file
    ///
    /// # Examples
    ///
    /// ```
    /// use chatbranch::storage::MessageStore;
    ///
    /// let dir = std::env::temp_dir().join("chatbranch-doc");
    /// let store = MessageStore::new_with_path(dir.join("chat.db")).unwrap();
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(ChatBranchError::from)
                    .context("Failed to create parent directory for database")?;
            }
        }

        let store = Self { db_path };
        store.init()?;
        Ok(store)
    }

    /// Location of the database file
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn open(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)
            .map_err(ChatBranchError::from)
            .context("Failed to open database")?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(ChatBranchError::from)
            .context("Failed to enable foreign keys")?;
        Ok(conn)
    }

    fn init(&self) -> Result<()> {
        let conn = self.open()?;
        conn.execute_batch(SCHEMA)
            .map_err(ChatBranchError::from)
            .context("Failed to create tables")?;
        Ok(())
    }

    // ---- threads ----------------------------------------------------------

    /// Create a thread; `created_at` and `updated_at` are set to now
    pub fn create_thread(&self, name: &str) -> Result<ThreadId> {
        let name = non_blank(name, "thread name")?;
        let conn = self.open()?;
        let now = now_timestamp();

        conn.execute(
            "INSERT INTO threads (name, thread_system_prompt, created_at, updated_at)
             VALUES (?1, '', ?2, ?2)",
            params![name, now],
        )
        .map_err(ChatBranchError::from)
        .context("Failed to insert thread")?;
        let thread_id = conn.last_insert_rowid();

        tracing::info!(thread_id, name = %name, "Thread created");
        Ok(thread_id)
    }

    /// All threads, most recently updated first
    pub fn get_threads(&self) -> Result<Vec<Thread>> {
        let conn = self.open()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {THREAD_COLUMNS} FROM threads ORDER BY updated_at DESC, id DESC"
            ))
            .map_err(ChatBranchError::from)
            .context("Failed to prepare statement")?;

        let threads = stmt
            .query_map([], thread_from_row)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(ChatBranchError::from)
            .context("Failed to query threads")?;
        Ok(threads)
    }

    pub fn get_thread(&self, thread_id: ThreadId) -> Result<Thread> {
        let conn = self.open()?;
        fetch_thread(&conn, thread_id)?
            .ok_or_else(|| ChatBranchError::thread_not_found(thread_id).into())
    }

    /// Threads whose name contains `query`, case-insensitively
    ///
    /// A blank query returns every thread.
    pub fn search_threads(&self, query: &str) -> Result<Vec<Thread>> {
        let threads = self.get_threads()?;
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(threads);
        }
        Ok(threads
            .into_iter()
            .filter(|t| t.name.to_lowercase().contains(&needle))
            .collect())
    }

    pub fn update_thread_name(&self, thread_id: ThreadId, name: &str) -> Result<()> {
        let name = non_blank(name, "thread name")?;
        let conn = self.open()?;
        let changed = conn
            .execute(
                "UPDATE threads SET name = ?1, updated_at = ?2 WHERE id = ?3",
                params![name, now_timestamp(), thread_id],
            )
            .map_err(ChatBranchError::from)
            .context("Failed to rename thread")?;
        if changed == 0 {
            return Err(ChatBranchError::thread_not_found(thread_id).into());
        }

        tracing::info!(thread_id, name = %name, "Thread name updated");
        Ok(())
    }

    pub fn update_thread_system_prompt(&self, thread_id: ThreadId, prompt: &str) -> Result<()> {
        let conn = self.open()?;
        let changed = conn
            .execute(
                "UPDATE threads SET thread_system_prompt = ?1, updated_at = ?2 WHERE id = ?3",
                params![prompt, now_timestamp(), thread_id],
            )
            .map_err(ChatBranchError::from)
            .context("Failed to update system prompt")?;
        if changed == 0 {
            return Err(ChatBranchError::thread_not_found(thread_id).into());
        }

        tracing::info!(thread_id, prompt_length = prompt.len(), "Thread system prompt updated");
        Ok(())
    }

    pub fn get_thread_system_prompt(&self, thread_id: ThreadId) -> Result<String> {
        Ok(self.get_thread(thread_id)?.thread_system_prompt)
    }

    /// Delete a thread and all of its messages
    ///
    /// Returns false when the thread did not exist.
    pub fn delete_thread(&self, thread_id: ThreadId) -> Result<bool> {
        let mut conn = self.open()?;
        let tx = conn
            .transaction()
            .map_err(ChatBranchError::from)
            .context("Failed to start transaction")?;
        let removed = delete_thread_in(&tx, thread_id)?;
        tx.commit()
            .map_err(ChatBranchError::from)
            .context("Failed to commit transaction")?;
        Ok(removed)
    }

    /// Delete several threads at once, returning how many existed
    pub fn delete_threads(&self, thread_ids: &[ThreadId]) -> Result<usize> {
        let mut conn = self.open()?;
        let tx = conn
            .transaction()
            .map_err(ChatBranchError::from)
            .context("Failed to start transaction")?;
        let mut removed = 0;
        for &thread_id in thread_ids {
            if delete_thread_in(&tx, thread_id)? {
                removed += 1;
            }
        }
        tx.commit()
            .map_err(ChatBranchError::from)
            .context("Failed to commit transaction")?;

        tracing::info!(requested = thread_ids.len(), removed, "Threads deleted");
        Ok(removed)
    }

    // ---- messages ---------------------------------------------------------

    /// Insert a message, storing its usage when it is an assistant reply
    ///
    /// # Errors
    ///
    /// `NotFound` when the thread or the parent message is absent,
    /// `Validation` for blank content or a parent from another thread.
    pub fn add_message(&self, new: NewMessage) -> Result<MessageId> {
        let content = non_blank(&new.content, "message content")?;
        let mut conn = self.open()?;
        let tx = conn
            .transaction()
            .map_err(ChatBranchError::from)
            .context("Failed to start transaction")?;

        if fetch_thread(&tx, new.thread_id)?.is_none() {
            return Err(ChatBranchError::thread_not_found(new.thread_id).into());
        }
        if let Some(parent_id) = new.parent_message_id {
            let parent = fetch_message(&tx, parent_id)?
                .ok_or_else(|| ChatBranchError::message_not_found(parent_id))?;
            if parent.thread_id != new.thread_id {
                return Err(ChatBranchError::Validation(format!(
                    "parent message {} belongs to thread {}, not {}",
                    parent_id, parent.thread_id, new.thread_id
                ))
                .into());
            }
        }

        let now = now_timestamp();
        tx.execute(
            "INSERT INTO messages (thread_id, parent_message_id, role, content, is_context, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                new.thread_id,
                new.parent_message_id,
                new.role.as_str(),
                content,
                new.is_context,
                now
            ],
        )
        .map_err(ChatBranchError::from)
        .context("Failed to insert message")?;
        let message_id = tx.last_insert_rowid();

        let store_usage = match (new.role, new.usage) {
            (Role::Assistant, Some(usage)) => Some(usage),
            (Role::User, Some(_)) => {
                tracing::debug!(message_id, "Ignoring token usage on user message");
                None
            }
            _ => None,
        };
        if let Some(usage) = store_usage {
            tx.execute(
                "INSERT OR REPLACE INTO token_usage
                 (message_id, total_tokens, prompt_tokens, completion_tokens)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    message_id,
                    stored_count(usage.total_tokens, "total_tokens")?,
                    stored_count(usage.prompt_tokens, "prompt_tokens")?,
                    stored_count(usage.completion_tokens, "completion_tokens")?
                ],
            )
            .map_err(ChatBranchError::from)
            .context("Failed to store token usage")?;
            tracing::info!(message_id, total_tokens = usage.total_tokens, "Storing token usage");
        }

        tx.execute(
            "UPDATE threads SET updated_at = ?1 WHERE id = ?2",
            params![now, new.thread_id],
        )
        .map_err(ChatBranchError::from)
        .context("Failed to touch thread")?;

        tx.commit()
            .map_err(ChatBranchError::from)
            .context("Failed to commit transaction")?;

        tracing::info!(
            message_id,
            thread_id = new.thread_id,
            role = %new.role,
            parent_id = ?new.parent_message_id,
            has_usage = store_usage.is_some(),
            "Message added"
        );
        Ok(message_id)
    }

    /// Add an alternative under `parent_message_id`, in the parent's thread
    pub fn create_branch(
        &self,
        parent_message_id: MessageId,
        content: &str,
        role: Role,
    ) -> Result<MessageId> {
        let parent = self.get_message(parent_message_id)?;
        self.add_message(NewMessage::new(parent.thread_id, role, content).reply_to(parent.id))
    }

    /// Replace a message's content in place
    pub fn update_message(&self, message_id: MessageId, content: &str) -> Result<()> {
        let content = non_blank(content, "message content")?;
        let conn = self.open()?;
        let changed = conn
            .execute(
                "UPDATE messages SET content = ?1 WHERE id = ?2",
                params![content, message_id],
            )
            .map_err(ChatBranchError::from)
            .context("Failed to update message")?;
        if changed == 0 {
            return Err(ChatBranchError::message_not_found(message_id).into());
        }

        tracing::info!(message_id, "Message updated");
        Ok(())
    }

    pub fn get_message(&self, message_id: MessageId) -> Result<Message> {
        self.find_message(message_id)?
            .ok_or_else(|| ChatBranchError::message_not_found(message_id).into())
    }

    /// Global lookup by id, across all threads
    pub fn find_message(&self, message_id: MessageId) -> Result<Option<Message>> {
        let conn = self.open()?;
        fetch_message(&conn, message_id)
    }

    /// All messages of a thread, oldest first
    pub fn get_messages(&self, thread_id: ThreadId) -> Result<Vec<Message>> {
        let conn = self.open()?;
        if fetch_thread(&conn, thread_id)?.is_none() {
            return Err(ChatBranchError::thread_not_found(thread_id).into());
        }
        fetch_thread_messages(&conn, thread_id)
    }

    /// Direct children of a message, oldest first
    pub fn get_message_children(&self, message_id: MessageId) -> Result<Vec<Message>> {
        let conn = self.open()?;
        if fetch_message(&conn, message_id)?.is_none() {
            return Err(ChatBranchError::message_not_found(message_id).into());
        }
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE parent_message_id = ?1 ORDER BY created_at ASC, id ASC"
            ))
            .map_err(ChatBranchError::from)
            .context("Failed to prepare statement")?;
        let children = stmt
            .query_map(params![message_id], message_from_row)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(ChatBranchError::from)
            .context("Failed to query children")?;
        Ok(children)
    }

    /// Delete a message and its whole subtree
    ///
    /// Returns the number of descendants removed. Deleting an absent id is a
    /// no-op that returns 0.
    pub fn delete_message(&self, message_id: MessageId) -> Result<usize> {
        let mut conn = self.open()?;
        let tx = conn
            .transaction()
            .map_err(ChatBranchError::from)
            .context("Failed to start transaction")?;

        let Some(target) = fetch_message(&tx, message_id)? else {
            tracing::debug!(message_id, "Delete of absent message ignored");
            return Ok(0);
        };

        let descendants = collect_descendants(&tx, target.thread_id, message_id)?;
        {
            let mut stmt = tx
                .prepare("DELETE FROM messages WHERE id = ?1")
                .map_err(ChatBranchError::from)
                .context("Failed to prepare delete")?;
            // Children before parents keeps the parent reference valid at every step.
            for id in descendants.iter().rev().chain(std::iter::once(&message_id)) {
                stmt.execute(params![*id])
                    .map_err(ChatBranchError::from)
                    .context("Failed to delete message")?;
            }
        }

        tx.commit()
            .map_err(ChatBranchError::from)
            .context("Failed to commit transaction")?;

        tracing::info!(
            message_id,
            thread_id = target.thread_id,
            child_count = descendants.len(),
            deleted_ids = ?descendants,
            "Message and children deleted"
        );
        Ok(descendants.len())
    }

    /// Include or exclude a message from the model context
    pub fn update_context_status(&self, message_id: MessageId, is_context: bool) -> Result<()> {
        let conn = self.open()?;
        let changed = conn
            .execute(
                "UPDATE messages SET is_context = ?1 WHERE id = ?2",
                params![is_context, message_id],
            )
            .map_err(ChatBranchError::from)
            .context("Failed to update context status")?;
        if changed == 0 {
            return Err(ChatBranchError::message_not_found(message_id).into());
        }

        tracing::info!(message_id, is_context, "Message context status updated");
        Ok(())
    }

    /// Root-to-message path restricted to context-included messages
    pub fn get_context_messages(&self, message_id: MessageId) -> Result<Vec<ContextMessage>> {
        let target = self.get_message(message_id)?;
        let forest = self.get_message_tree(target.thread_id)?;

        let path: Vec<&Message> = forest.path_to(message_id).unwrap_or_else(|| vec![&target]);
        Ok(path
            .into_iter()
            .filter(|m| m.is_context)
            .map(ContextMessage::from)
            .collect())
    }

    // ---- token usage ------------------------------------------------------

    pub fn get_token_usage(&self, message_id: MessageId) -> Result<Option<TokenUsage>> {
        let conn = self.open()?;
        let usage = conn
            .query_row(
                "SELECT total_tokens, prompt_tokens, completion_tokens
                 FROM token_usage WHERE message_id = ?1",
                params![message_id],
                usage_from_row,
            )
            .optional()
            .map_err(ChatBranchError::from)
            .context("Failed to query token usage")?;
        Ok(usage)
    }

    /// Stored usage for every message of a thread, keyed by message id
    pub fn get_thread_token_usage(
        &self,
        thread_id: ThreadId,
    ) -> Result<HashMap<MessageId, TokenUsage>> {
        let conn = self.open()?;
        let mut stmt = conn
            .prepare(
                "SELECT u.message_id, u.total_tokens, u.prompt_tokens, u.completion_tokens
                 FROM token_usage u JOIN messages m ON m.id = u.message_id
                 WHERE m.thread_id = ?1",
            )
            .map_err(ChatBranchError::from)
            .context("Failed to prepare statement")?;
        let rows = stmt
            .query_map(params![thread_id], |row| {
                let id: MessageId = row.get(0)?;
                Ok((
                    id,
                    TokenUsage {
                        total_tokens: read_count(row, 1)?,
                        prompt_tokens: read_count(row, 2)?,
                        completion_tokens: read_count(row, 3)?,
                    },
                ))
            })
            .and_then(|rows| rows.collect::<rusqlite::Result<HashMap<_, _>>>())
            .map_err(ChatBranchError::from)
            .context("Failed to query token usage")?;
        Ok(rows)
    }

    // ---- composition ------------------------------------------------------

    /// Fetch a thread's messages once and build the forest
    pub fn get_message_tree(&self, thread_id: ThreadId) -> Result<MessageForest> {
        Ok(MessageForest::build(self.get_messages(thread_id)?))
    }

    /// Whole forest with cumulative usage on every node
    pub fn get_message_tree_with_tokens(
        &self,
        thread_id: ThreadId,
        max_tokens: u64,
    ) -> Result<Vec<TokenTreeNode>> {
        let forest = self.get_message_tree(thread_id)?;
        let usage = self.get_thread_token_usage(thread_id)?;
        Ok(enrich_tree(&forest, &usage, max_tokens))
    }

    /// Fetch, build, resolve and annotate the display path of a thread
    ///
    /// The flat fallback for an unreachable `current_message_id` consults the
    /// whole store, so a message left over in another thread still renders as
    /// a detached path.
    pub fn load_display_path(
        &self,
        thread_id: ThreadId,
        current_message_id: Option<MessageId>,
        max_tokens: u64,
    ) -> Result<ThreadView> {
        let forest = self.get_message_tree(thread_id)?;
        let mut usage = self.get_thread_token_usage(thread_id)?;

        let mut lookup_error = None;
        let path: DisplayPath = resolve_path_with(&forest, current_message_id, |id| {
            match self.find_message(id) {
                Ok(found) => found,
                Err(e) => {
                    lookup_error = Some(e);
                    None
                }
            }
        });
        if let Some(err) = lookup_error {
            tracing::warn!(
                thread_id,
                current = ?current_message_id,
                "Current message lookup failed"
            );
            return Err(err.context("Failed to look up current message"));
        }

        for message in path.messages.iter().filter(|m| m.thread_id != thread_id) {
            if let Some(u) = self.get_token_usage(message.id)? {
                usage.insert(message.id, u);
            }
        }

        Ok(ThreadView {
            thread_id,
            current_message_id,
            usage: cumulative_usage(&path.messages, &usage, max_tokens),
            messages: annotate_path(&path.messages, &usage, max_tokens),
            origin: path.origin,
        })
    }
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn non_blank<'a>(value: &'a str, what: &str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(ChatBranchError::Validation(format!("{} cannot be empty", what)).into());
    }
    Ok(value)
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Token counts are stored as SQLite INTEGER, so they must fit in `i64`
fn stored_count(value: u64, field: &str) -> Result<i64> {
    i64::try_from(value).map_err(|_| {
        ChatBranchError::Validation(format!(
            "{} of {} exceeds the storable maximum of {}",
            field,
            value,
            i64::MAX
        ))
        .into()
    })
}

fn read_count(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(idx)?;
    u64::try_from(value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

fn thread_from_row(row: &Row<'_>) -> rusqlite::Result<Thread> {
    Ok(Thread {
        id: row.get(0)?,
        name: row.get(1)?,
        thread_system_prompt: row.get(2)?,
        created_at: parse_timestamp(row, 3)?,
        updated_at: parse_timestamp(row, 4)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    let role: String = row.get(3)?;
    let role = role
        .parse::<Role>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    Ok(Message {
        id: row.get(0)?,
        thread_id: row.get(1)?,
        parent_message_id: row.get(2)?,
        role,
        content: row.get(4)?,
        is_context: row.get(5)?,
        created_at: parse_timestamp(row, 6)?,
    })
}

fn usage_from_row(row: &Row<'_>) -> rusqlite::Result<TokenUsage> {
    Ok(TokenUsage {
        total_tokens: read_count(row, 0)?,
        prompt_tokens: read_count(row, 1)?,
        completion_tokens: read_count(row, 2)?,
    })
}

fn fetch_thread(conn: &Connection, thread_id: ThreadId) -> Result<Option<Thread>> {
    let thread = conn
        .query_row(
            &format!("SELECT {THREAD_COLUMNS} FROM threads WHERE id = ?1"),
            params![thread_id],
            thread_from_row,
        )
        .optional()
        .map_err(ChatBranchError::from)
        .context("Failed to query thread")?;
    Ok(thread)
}

fn fetch_message(conn: &Connection, message_id: MessageId) -> Result<Option<Message>> {
    let message = conn
        .query_row(
            &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
            params![message_id],
            message_from_row,
        )
        .optional()
        .map_err(ChatBranchError::from)
        .context("Failed to query message")?;
    Ok(message)
}

fn fetch_thread_messages(conn: &Connection, thread_id: ThreadId) -> Result<Vec<Message>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE thread_id = ?1 ORDER BY created_at ASC, id ASC"
        ))
        .map_err(ChatBranchError::from)
        .context("Failed to prepare statement")?;
    let messages = stmt
        .query_map(params![thread_id], message_from_row)
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
        .map_err(ChatBranchError::from)
        .context("Failed to query messages")?;
    Ok(messages)
}

/// Every transitive descendant of `root`, parents listed before children
fn collect_descendants(
    conn: &Connection,
    thread_id: ThreadId,
    root: MessageId,
) -> Result<Vec<MessageId>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, parent_message_id FROM messages
             WHERE thread_id = ?1 AND parent_message_id IS NOT NULL",
        )
        .map_err(ChatBranchError::from)
        .context("Failed to prepare statement")?;
    let links = stmt
        .query_map(params![thread_id], |row| {
            Ok((row.get::<_, MessageId>(0)?, row.get::<_, MessageId>(1)?))
        })
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
        .map_err(ChatBranchError::from)
        .context("Failed to query message links")?;

    let mut children: HashMap<MessageId, Vec<MessageId>> = HashMap::new();
    for (id, parent) in links {
        children.entry(parent).or_default().push(id);
    }

    let mut found = Vec::new();
    let mut seen = std::collections::HashSet::from([root]);
    let mut worklist = vec![root];
    while let Some(current) = worklist.pop() {
        for &child in children.get(&current).map(Vec::as_slice).unwrap_or_default() {
            if seen.insert(child) {
                found.push(child);
                worklist.push(child);
            }
        }
    }
    Ok(found)
}

fn delete_thread_in(conn: &Connection, thread_id: ThreadId) -> Result<bool> {
    let message_count: i64 = conn
        .query_row(
            "SELECT count(*) FROM messages WHERE thread_id = ?1",
            params![thread_id],
            |row| row.get(0),
        )
        .map_err(ChatBranchError::from)
        .context("Failed to count messages")?;

    let changed = conn
        .execute("DELETE FROM threads WHERE id = ?1", params![thread_id])
        .map_err(ChatBranchError::from)
        .context("Failed to delete thread")?;

    if changed == 0 {
        tracing::debug!(thread_id, "Delete of absent thread ignored");
        return Ok(false);
    }
    tracing::info!(thread_id, message_count, "Thread physically deleted");
    Ok(true)
}
