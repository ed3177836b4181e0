//! Message forest construction
//!
//! Turns the flat, creation-ordered message list of a thread into an
//! arena-backed forest linked by `parent_message_id`. Building never fails:
//! messages whose parent is missing from the input (or that point at
//! themselves) become additional roots.

use serde::Serialize;
use std::collections::HashMap;

use crate::storage::{Message, MessageId};

/// Position of a node inside [`MessageForest::nodes`]
pub type NodeIndex = usize;

/// A message plus its links inside the arena
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub message: Message,
    /// `None` for roots and for nodes whose parent could not be resolved
    pub parent: Option<NodeIndex>,
    /// Children in input order (creation order)
    pub children: Vec<NodeIndex>,
    /// Whether the node can be reached by walking down from a root
    pub reachable: bool,
}

/// Nested view of the forest, the shape handed to presentation code
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageNode {
    #[serde(flatten)]
    pub message: Message,
    pub children: Vec<MessageNode>,
}

/// Arena forest of one thread's messages
#[derive(Debug, Clone, Default)]
pub struct MessageForest {
    nodes: Vec<TreeNode>,
    roots: Vec<NodeIndex>,
    index: HashMap<MessageId, NodeIndex>,
}

impl MessageForest {
    /// Build the forest from a flat message list
    ///
    /// Children keep the order they have in `messages`, so callers pass the
    /// list sorted by creation time. Runs in O(n).
    ///
    /// # Examples
    ///
    /// ```
    /// use chatbranch::tree::MessageForest;
    ///
    /// let forest = MessageForest::build(Vec::new());
    /// assert!(forest.is_empty());
    /// ```
    pub fn build(messages: Vec<Message>) -> Self {
        let mut forest = MessageForest {
            nodes: Vec::with_capacity(messages.len()),
            roots: Vec::new(),
            index: HashMap::with_capacity(messages.len()),
        };

        for message in messages {
            if forest.index.contains_key(&message.id) {
                tracing::warn!(
                    message_id = message.id,
                    "Duplicate message id in snapshot, skipping"
                );
                continue;
            }
            let idx = forest.nodes.len();
            forest.index.insert(message.id, idx);
            forest.nodes.push(TreeNode {
                message,
                parent: None,
                children: Vec::new(),
                reachable: false,
            });
        }

        for idx in 0..forest.nodes.len() {
            let message = &forest.nodes[idx].message;
            let parent = message
                .parent_message_id
                .filter(|parent_id| *parent_id != message.id)
                .and_then(|parent_id| forest.index.get(&parent_id).copied());

            match parent {
                Some(parent_idx) => {
                    forest.nodes[idx].parent = Some(parent_idx);
                    forest.nodes[parent_idx].children.push(idx);
                }
                None => {
                    if let Some(parent_id) = message.parent_message_id {
                        tracing::debug!(
                            message_id = message.id,
                            parent_id,
                            "Parent not in snapshot, treating message as root"
                        );
                    }
                    forest.roots.push(idx);
                }
            }
        }

        forest.mark_reachable();
        forest
    }

    fn mark_reachable(&mut self) {
        let mut stack: Vec<NodeIndex> = self.roots.clone();
        while let Some(idx) = stack.pop() {
            if self.nodes[idx].reachable {
                continue;
            }
            self.nodes[idx].reachable = true;
            stack.extend(self.nodes[idx].children.iter().copied());
        }

        let stranded = self.nodes.iter().filter(|n| !n.reachable).count();
        if stranded > 0 {
            tracing::warn!(
                count = stranded,
                "Messages on a parent cycle are not reachable from any root"
            );
        }
    }

    /// Number of indexed messages
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root nodes in input order
    pub fn roots(&self) -> &[NodeIndex] {
        &self.roots
    }

    pub fn node(&self, idx: NodeIndex) -> &TreeNode {
        &self.nodes[idx]
    }

    /// Flat id lookup, independent of tree shape
    pub fn get(&self, id: MessageId) -> Option<&TreeNode> {
        self.index.get(&id).map(|&idx| &self.nodes[idx])
    }

    pub fn index_of(&self, id: MessageId) -> Option<NodeIndex> {
        self.index.get(&id).copied()
    }

    /// Direct children of `id`, in creation order
    pub fn children_of(&self, id: MessageId) -> Vec<&Message> {
        self.get(id)
            .map(|node| {
                node.children
                    .iter()
                    .map(|&c| &self.nodes[c].message)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Root-to-node chain of arena indices, or `None` when the node is
    /// unknown or not reachable from a root
    pub fn ancestry(&self, idx: NodeIndex) -> Option<Vec<NodeIndex>> {
        if !self.nodes.get(idx)?.reachable {
            return None;
        }
        let mut chain = vec![idx];
        let mut current = idx;
        while let Some(parent) = self.nodes[current].parent {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        Some(chain)
    }

    /// Root-to-message path by id
    pub fn path_to(&self, id: MessageId) -> Option<Vec<&Message>> {
        let chain = self.ancestry(self.index_of(id)?)?;
        Some(chain.into_iter().map(|i| &self.nodes[i].message).collect())
    }

    /// Pre-order iteration over every reachable node, roots first, children
    /// in stored order. Yields `(index, depth)` with roots at depth 0.
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder {
            forest: self,
            stack: self.roots.iter().rev().map(|&r| (r, 0)).collect(),
        }
    }

    /// Nested copy of the reachable forest
    pub fn to_nested(&self) -> Vec<MessageNode> {
        self.fold_nested(|idx, children| MessageNode {
            message: self.nodes[idx].message.clone(),
            children,
        })
    }

    /// Assemble a nested value per reachable node, children before parents
    ///
    /// `make` receives a node's index and its already-built children in
    /// stored order. Works bottom-up over the reversed pre-order, so the call
    /// depth stays constant however deep the thread is.
    pub fn fold_nested<T, F>(&self, mut make: F) -> Vec<T>
    where
        F: FnMut(NodeIndex, Vec<T>) -> T,
    {
        let order: Vec<NodeIndex> = self.preorder().map(|(idx, _)| idx).collect();
        let mut built: Vec<Option<T>> = std::iter::repeat_with(|| None)
            .take(self.nodes.len())
            .collect();

        for &idx in order.iter().rev() {
            let children = self.nodes[idx]
                .children
                .iter()
                .filter_map(|&c| built[c].take())
                .collect();
            built[idx] = Some(make(idx, children));
        }

        self.roots
            .iter()
            .filter_map(|&r| built[r].take())
            .collect()
    }
}

// Dropping a long chain of owned children recursively would overflow the stack.
impl Drop for MessageNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Iterator returned by [`MessageForest::preorder`]
pub struct Preorder<'a> {
    forest: &'a MessageForest,
    stack: Vec<(NodeIndex, usize)>,
}

impl Iterator for Preorder<'_> {
    type Item = (NodeIndex, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let (idx, depth) = self.stack.pop()?;
        let children = &self.forest.nodes[idx].children;
        self.stack
            .extend(children.iter().rev().map(|&c| (c, depth + 1)));
        Some((idx, depth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::msg;
    use crate::storage::Role;

    #[test]
    fn test_build_links_children_in_input_order() {
        let forest = MessageForest::build(vec![
            msg(1, None, Role::User),
            msg(2, Some(1), Role::Assistant),
            msg(3, Some(1), Role::Assistant),
        ]);

        assert_eq!(forest.len(), 3);
        assert_eq!(forest.roots().len(), 1);
        let ids: Vec<_> = forest.children_of(1).iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_multiple_roots_are_kept() {
        let forest = MessageForest::build(vec![
            msg(1, None, Role::User),
            msg(2, None, Role::User),
        ]);
        assert_eq!(forest.roots().len(), 2);
    }

    #[test]
    fn test_orphan_becomes_root() {
        let forest = MessageForest::build(vec![
            msg(1, None, Role::User),
            msg(5, Some(99), Role::Assistant),
        ]);
        assert_eq!(forest.roots().len(), 2);
        assert!(forest.get(5).unwrap().reachable);
        assert_eq!(forest.path_to(5).unwrap().len(), 1);
    }

    #[test]
    fn test_child_listed_before_parent_still_attaches() {
        let forest = MessageForest::build(vec![
            msg(2, Some(1), Role::Assistant),
            msg(1, None, Role::User),
        ]);
        assert_eq!(forest.roots().len(), 1);
        let path: Vec<_> = forest.path_to(2).unwrap().iter().map(|m| m.id).collect();
        assert_eq!(path, vec![1, 2]);
    }

    #[test]
    fn test_self_parent_is_root() {
        let forest = MessageForest::build(vec![msg(4, Some(4), Role::User)]);
        assert_eq!(forest.roots().len(), 1);
        assert!(forest.get(4).unwrap().children.is_empty());
    }

    #[test]
    fn test_cycle_nodes_are_indexed_but_unreachable() {
        let forest = MessageForest::build(vec![
            msg(1, None, Role::User),
            msg(2, Some(3), Role::User),
            msg(3, Some(2), Role::Assistant),
        ]);
        assert_eq!(forest.len(), 3);
        assert!(forest.get(2).is_some());
        assert!(!forest.get(2).unwrap().reachable);
        assert!(forest.path_to(2).is_none());
        assert_eq!(forest.preorder().count(), 1);
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let mut dup = msg(1, None, Role::User);
        dup.content = "second".to_string();
        let forest = MessageForest::build(vec![msg(1, None, Role::User), dup]);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest.get(1).unwrap().message.content, "message 1");
    }

    #[test]
    fn test_preorder_visits_roots_then_children_in_order() {
        let forest = MessageForest::build(vec![
            msg(1, None, Role::User),
            msg(2, Some(1), Role::Assistant),
            msg(3, Some(2), Role::User),
            msg(4, Some(1), Role::Assistant),
            msg(5, None, Role::User),
        ]);
        let order: Vec<_> = forest
            .preorder()
            .map(|(i, d)| (forest.node(i).message.id, d))
            .collect();
        assert_eq!(order, vec![(1, 0), (2, 1), (3, 2), (4, 1), (5, 0)]);
    }

    #[test]
    fn test_to_nested_mirrors_arena() {
        let forest = MessageForest::build(vec![
            msg(1, None, Role::User),
            msg(2, Some(1), Role::Assistant),
        ]);
        let nested = forest.to_nested();
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].message.id, 1);
        assert_eq!(nested[0].children[0].message.id, 2);
        assert!(nested[0].children[0].children.is_empty());
    }

    #[test]
    fn test_to_nested_handles_very_deep_thread() {
        let depth = 10_000;
        let messages: Vec<Message> = (1..=depth)
            .map(|id| {
                let parent = if id == 1 { None } else { Some(id - 1) };
                let role = if id % 2 == 1 { Role::User } else { Role::Assistant };
                msg(id, parent, role)
            })
            .collect();
        let forest = MessageForest::build(messages);
        let nested = forest.to_nested();
        assert_eq!(nested.len(), 1);

        let mut levels = 1;
        let mut node = &nested[0];
        while let Some(child) = node.children.first() {
            assert_eq!(child.message.parent_message_id, Some(node.message.id));
            levels += 1;
            node = child;
        }
        assert_eq!(levels, depth);
        assert_eq!(node.message.id, depth);
    }
}
