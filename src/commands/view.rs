//! Display path, tree and usage output

use crate::commands::{print_json, truncate};
use crate::config::TokenConfig;
use crate::error::{ChatBranchError, Result};
use crate::path::PathOrigin;
use crate::session::{ChatSession, ThreadView};
use crate::storage::{MessageId, MessageStore, Role, ThreadId};
use crate::tokens::{CumulativeUsage, TierThresholds, TokenTreeNode, UsageTier};
use colored::{ColoredString, Colorize};

/// Print the displayed branch of a thread
pub fn show_path(
    store: &MessageStore,
    tokens: &TokenConfig,
    thread_id: ThreadId,
    message_id: Option<MessageId>,
    json: bool,
) -> Result<()> {
    let view = load_view(store, tokens, thread_id, message_id)?;
    if json {
        return print_json(&view);
    }

    let thread = store.get_thread(thread_id)?;
    println!("{} {}", thread.name.bold(), format!("#{}", thread.id).cyan());
    if view.origin == PathOrigin::Detached {
        println!(
            "{}",
            "Current message is not reachable from a thread root; showing it alone.".yellow()
        );
    }
    if view.messages.is_empty() {
        println!("{}", "No messages yet.".yellow());
        return Ok(());
    }
    println!();
    for line in transcript_lines(&view) {
        println!("{}", line);
    }
    println!();
    println!("{}", usage_line(&view.usage, &tokens.thresholds()));
    Ok(())
}

/// Print the whole message tree of a thread
pub fn show_tree(
    store: &MessageStore,
    tokens: &TokenConfig,
    thread_id: ThreadId,
    json: bool,
) -> Result<()> {
    let tree = store.get_message_tree_with_tokens(thread_id, tokens.max_tokens)?;
    if json {
        return print_json(&tree);
    }
    if tree.is_empty() {
        println!("{}", "No messages yet.".yellow());
        return Ok(());
    }

    let mut lines = Vec::new();
    for root in &tree {
        tree_lines(root, 0, &mut lines);
    }
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

/// Print cumulative usage of the displayed branch
pub fn show_usage(
    store: &MessageStore,
    tokens: &TokenConfig,
    thread_id: ThreadId,
    message_id: Option<MessageId>,
) -> Result<()> {
    let view = load_view(store, tokens, thread_id, message_id)?;
    let usage = &view.usage;
    let thresholds = tokens.thresholds();
    println!("{}", usage_line(usage, &thresholds));
    println!(
        "  Tier:       {}",
        UsageTier::classify(usage.usage_percentage, &thresholds)
    );
    println!("  Prompt:     {}", usage.prompt_tokens);
    println!("  Completion: {}", usage.completion_tokens);
    println!("  Messages:   {}", view.messages.len());
    Ok(())
}

fn load_view(
    store: &MessageStore,
    tokens: &TokenConfig,
    thread_id: ThreadId,
    message_id: Option<MessageId>,
) -> Result<ThreadView> {
    let mut session = ChatSession::for_thread(thread_id);
    if let Some(id) = message_id {
        session.select_message(id);
    }
    tracing::debug!(thread_id, current = ?message_id, "Loading display path");
    session
        .load(store, tokens.max_tokens)?
        .ok_or_else(|| ChatBranchError::thread_not_found(thread_id).into())
}

fn role_label(role: Role) -> ColoredString {
    match role {
        Role::User => "user".blue().bold(),
        Role::Assistant => "assistant".green().bold(),
    }
}

fn transcript_lines(view: &ThreadView) -> Vec<String> {
    view.messages
        .iter()
        .map(|entry| {
            let m = &entry.message;
            let mut line = format!("[{}] {}: {}", m.id, role_label(m.role), m.content);
            if !m.is_context {
                line.push_str(&format!(" {}", "(excluded)".dimmed()));
            }
            if let Some(usage) = &entry.cumulative_tokens {
                line.push_str(&format!(" {}", format!("[{}]", usage.total_tokens).dimmed()));
            }
            line
        })
        .collect()
}

fn tree_lines(root: &TokenTreeNode, depth: usize, out: &mut Vec<String>) {
    let mut pending = vec![(root, depth)];
    while let Some((node, depth)) = pending.pop() {
        let m = &node.message;
        let mut line = format!(
            "{}[{}] {}: {}",
            "  ".repeat(depth),
            m.id,
            role_label(m.role),
            truncate(&m.content, 60)
        );
        if m.role == Role::Assistant {
            line.push_str(&format!(
                " {}",
                format!("({} tokens)", node.cumulative_tokens.total_tokens).dimmed()
            ));
        }
        out.push(line);
        pending.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
    }
}

fn usage_line(usage: &CumulativeUsage, thresholds: &TierThresholds) -> ColoredString {
    match UsageTier::classify(usage.usage_percentage, thresholds) {
        UsageTier::Normal => usage.usage_display.normal(),
        UsageTier::Warning => usage.usage_display.yellow(),
        UsageTier::Critical => usage.usage_display.red().bold(),
    }
}
