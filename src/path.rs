//! Display path resolution
//!
//! Computes the single root-to-leaf branch that is rendered for a thread,
//! given the message the user is currently looking at. Resolution never
//! fails: stale or foreign ids degrade to a detached single-message path or
//! to an empty path.

use serde::Serialize;

use crate::storage::{Message, MessageId};
use crate::tree::{MessageForest, NodeIndex};

/// How a [`DisplayPath`] was derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathOrigin {
    /// No current message: the deepest root-to-leaf path
    Deepest,
    /// Root-to-current path, plus the current message's first child if any
    Anchored,
    /// The current message alone, found only by flat lookup. Does not start
    /// at a thread root.
    Detached,
    /// Nothing to show
    Empty,
}

/// Ordered messages to render, root first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayPath {
    pub messages: Vec<Message>,
    pub origin: PathOrigin,
}

impl DisplayPath {
    fn new(messages: Vec<Message>, origin: PathOrigin) -> Self {
        Self { messages, origin }
    }

    fn empty() -> Self {
        Self::new(Vec::new(), PathOrigin::Empty)
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Last message of the path, the natural parent for the next send
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn ids(&self) -> Vec<MessageId> {
        self.messages.iter().map(|m| m.id).collect()
    }

    /// False for detached paths, which lack their ancestors
    pub fn starts_at_root(&self) -> bool {
        matches!(self.origin, PathOrigin::Deepest | PathOrigin::Anchored)
    }
}

/// Resolve the display path using only the forest itself
///
/// Equivalent to [`resolve_path_with`] with a global lookup that finds
/// nothing beyond the forest's own flat index.
pub fn resolve_path(forest: &MessageForest, current: Option<MessageId>) -> DisplayPath {
    resolve_path_with(forest, current, |_| None)
}

/// Resolve the display path for `current`
///
/// 1. `current` unset: deepest root-to-leaf path, first one wins on ties.
/// 2. `current` reachable from a root: path from its root down to it, plus
///    its first child when it has one.
/// 3. Otherwise a flat id lookup (forest index, then `global_lookup`); a hit
///    becomes a one-message [`PathOrigin::Detached`] path.
/// 4. Otherwise an empty path.
///
/// # Examples
///
/// ```
/// use chatbranch::path::{resolve_path_with, PathOrigin};
/// use chatbranch::tree::MessageForest;
///
/// let forest = MessageForest::build(Vec::new());
/// let path = resolve_path_with(&forest, Some(7), |_| None);
/// assert_eq!(path.origin, PathOrigin::Empty);
/// ```
pub fn resolve_path_with<F>(
    forest: &MessageForest,
    current: Option<MessageId>,
    global_lookup: F,
) -> DisplayPath
where
    F: FnOnce(MessageId) -> Option<Message>,
{
    let Some(current_id) = current else {
        return deepest_path(forest);
    };

    if let Some(path) = anchored_path(forest, current_id) {
        return path;
    }

    let fallback = forest
        .get(current_id)
        .map(|node| node.message.clone())
        .or_else(|| global_lookup(current_id));

    match fallback {
        Some(message) => {
            tracing::warn!(
                message_id = current_id,
                thread_id = message.thread_id,
                "Current message not reachable from a thread root, showing it detached"
            );
            DisplayPath::new(vec![message], PathOrigin::Detached)
        }
        None => {
            tracing::debug!(message_id = current_id, "Current message not found, empty path");
            DisplayPath::empty()
        }
    }
}

/// Longest root-to-leaf path over the whole forest
pub fn deepest_path(forest: &MessageForest) -> DisplayPath {
    let mut best: Option<(NodeIndex, usize)> = None;

    for (idx, depth) in forest.preorder() {
        if !forest.node(idx).children.is_empty() {
            continue;
        }
        let len = depth + 1;
        if best.map_or(true, |(_, best_len)| len > best_len) {
            best = Some((idx, len));
        }
    }

    let Some((leaf, _)) = best else {
        return DisplayPath::empty();
    };

    match forest.ancestry(leaf) {
        Some(chain) => DisplayPath::new(collect(forest, &chain), PathOrigin::Deepest),
        None => DisplayPath::empty(),
    }
}

fn anchored_path(forest: &MessageForest, current_id: MessageId) -> Option<DisplayPath> {
    let idx = forest.index_of(current_id)?;
    let mut chain = forest.ancestry(idx)?;

    if let Some(&first_child) = forest.node(idx).children.first() {
        chain.push(first_child);
    }

    Some(DisplayPath::new(collect(forest, &chain), PathOrigin::Anchored))
}

fn collect(forest: &MessageForest, chain: &[NodeIndex]) -> Vec<Message> {
    chain
        .iter()
        .map(|&i| forest.node(i).message.clone())
        .collect()
}
