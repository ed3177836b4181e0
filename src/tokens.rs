//! Cumulative token accounting along a display path
//!
//! Usage is looked up per assistant message, never derived from content.
//! User messages and assistant messages without stored usage count as zero.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::storage::{Message, MessageId, Role, TokenUsage};
use crate::tree::{MessageForest, NodeIndex};

/// Context window assumed when none is configured
pub const DEFAULT_MAX_TOKENS: u64 = 128_000;

/// Source of stored per-message usage
pub trait UsageLookup {
    fn usage_for(&self, message_id: MessageId) -> Option<TokenUsage>;
}

impl UsageLookup for HashMap<MessageId, TokenUsage> {
    fn usage_for(&self, message_id: MessageId) -> Option<TokenUsage> {
        self.get(&message_id).copied()
    }
}

impl<L: UsageLookup + ?Sized> UsageLookup for &L {
    fn usage_for(&self, message_id: MessageId) -> Option<TokenUsage> {
        (**self).usage_for(message_id)
    }
}

/// Summed usage for a path, measured against the context window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CumulativeUsage {
    pub total_tokens: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub max_tokens: u64,
    /// Rounded to two decimals; may exceed 100
    pub usage_percentage: f64,
    pub usage_display: String,
}

impl CumulativeUsage {
    fn from_totals(totals: TokenUsage, max_tokens: u64) -> Self {
        let usage_percentage = usage_percentage(totals.total_tokens, max_tokens);
        let usage_display = format!(
            "Tokens used: {}/{} - {}%",
            group_thousands(totals.total_tokens),
            group_thousands(max_tokens),
            usage_percentage
        );
        Self {
            total_tokens: totals.total_tokens,
            prompt_tokens: totals.prompt_tokens,
            completion_tokens: totals.completion_tokens,
            max_tokens,
            usage_percentage,
            usage_display,
        }
    }

    /// Tier under the default 50 / 75 thresholds
    pub fn tier(&self) -> UsageTier {
        UsageTier::classify(self.usage_percentage, &TierThresholds::default())
    }
}

/// Presentation tier for a usage percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageTier {
    Normal,
    Warning,
    Critical,
}

impl UsageTier {
    /// `> critical` is critical, `> warning` is warning, anything else normal
    pub fn classify(percentage: f64, thresholds: &TierThresholds) -> Self {
        if percentage > thresholds.critical {
            UsageTier::Critical
        } else if percentage > thresholds.warning {
            UsageTier::Warning
        } else {
            UsageTier::Normal
        }
    }
}

impl fmt::Display for UsageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsageTier::Normal => write!(f, "normal"),
            UsageTier::Warning => write!(f, "warning"),
            UsageTier::Critical => write!(f, "critical"),
        }
    }
}

/// Percentage boundaries for [`UsageTier`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierThresholds {
    pub warning: f64,
    pub critical: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            warning: 50.0,
            critical: 75.0,
        }
    }
}

/// A path message with the usage accumulated up to and including it
///
/// Only assistant messages carry `cumulative_tokens`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedMessage {
    #[serde(flatten)]
    pub message: Message,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cumulative_tokens: Option<CumulativeUsage>,
}

/// Nested tree node carrying the usage of its root-to-node path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenTreeNode {
    #[serde(flatten)]
    pub message: Message,
    pub cumulative_tokens: CumulativeUsage,
    pub children: Vec<TokenTreeNode>,
}

/// Sum stored usage of every assistant message on `path`
///
/// # Examples
///
/// ```
/// use chatbranch::storage::{MessageId, TokenUsage};
/// use chatbranch::tokens::cumulative_usage;
/// use std::collections::HashMap;
///
/// let lookup: HashMap<MessageId, TokenUsage> = HashMap::new();
/// let usage = cumulative_usage(&[], &lookup, 128_000);
/// assert_eq!(usage.total_tokens, 0);
/// assert_eq!(usage.usage_percentage, 0.0);
/// ```
pub fn cumulative_usage<L>(path: &[Message], lookup: &L, max_tokens: u64) -> CumulativeUsage
where
    L: UsageLookup + ?Sized,
{
    let mut totals = TokenUsage::default();
    for message in path {
        add_usage(&mut totals, message, lookup);
    }
    CumulativeUsage::from_totals(totals, max_tokens)
}

/// Annotate each assistant message on `path` with the running total
pub fn annotate_path<L>(path: &[Message], lookup: &L, max_tokens: u64) -> Vec<AnnotatedMessage>
where
    L: UsageLookup + ?Sized,
{
    let mut totals = TokenUsage::default();
    path.iter()
        .map(|message| {
            add_usage(&mut totals, message, lookup);
            let cumulative_tokens = (message.role == Role::Assistant)
                .then(|| CumulativeUsage::from_totals(totals, max_tokens));
            AnnotatedMessage {
                message: message.clone(),
                cumulative_tokens,
            }
        })
        .collect()
}

/// Nested forest where every node carries its root-to-node cumulative usage
///
/// One pre-order pass carrying running totals, rather than re-walking the
/// path for every node.
pub fn enrich_tree<L>(forest: &MessageForest, lookup: &L, max_tokens: u64) -> Vec<TokenTreeNode>
where
    L: UsageLookup + ?Sized,
{
    let mut totals_at: HashMap<NodeIndex, TokenUsage> = HashMap::with_capacity(forest.len());
    for (idx, _) in forest.preorder() {
        let node = forest.node(idx);
        let mut totals = node
            .parent
            .and_then(|p| totals_at.get(&p).copied())
            .unwrap_or_default();
        add_usage(&mut totals, &node.message, lookup);
        totals_at.insert(idx, totals);
    }

    forest.fold_nested(|idx, children| {
        let totals = totals_at.get(&idx).copied().unwrap_or_default();
        TokenTreeNode {
            message: forest.node(idx).message.clone(),
            cumulative_tokens: CumulativeUsage::from_totals(totals, max_tokens),
            children,
        }
    })
}

// Same iterative teardown as `MessageNode`.
impl Drop for TokenTreeNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

fn add_usage<L>(totals: &mut TokenUsage, message: &Message, lookup: &L)
where
    L: UsageLookup + ?Sized,
{
    if message.role != Role::Assistant {
        return;
    }
    if let Some(usage) = lookup.usage_for(message.id) {
        totals.total_tokens = totals.total_tokens.saturating_add(usage.total_tokens);
        totals.prompt_tokens = totals.prompt_tokens.saturating_add(usage.prompt_tokens);
        totals.completion_tokens = totals
            .completion_tokens
            .saturating_add(usage.completion_tokens);
    }
}

/// `round(total / max * 100, 2)`, zero when `max_tokens` is zero
pub fn usage_percentage(total_tokens: u64, max_tokens: u64) -> f64 {
    if max_tokens == 0 {
        return 0.0;
    }
    let raw = total_tokens as f64 / max_tokens as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}

/// `128000` -> `"128,000"`
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
