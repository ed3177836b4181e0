use crate::cli::MessageCommand;
use crate::error::Result;
use crate::storage::{MessageStore, NewMessage, TokenUsage};
use colored::Colorize;

/// Handle message commands
pub fn handle_message(store: &MessageStore, command: MessageCommand) -> Result<()> {
    match command {
        MessageCommand::Add {
            thread,
            content,
            role,
            parent,
            no_context,
            prompt_tokens,
            completion_tokens,
            total_tokens,
        } => {
            let mut new = NewMessage::new(thread, role, content);
            if let Some(parent) = parent {
                new = new.reply_to(parent);
            }
            if no_context {
                new = new.excluded();
            }
            if let (Some(prompt), Some(completion)) = (prompt_tokens, completion_tokens) {
                new = new.with_usage(TokenUsage::new(prompt, completion));
            } else if let Some(total) = total_tokens {
                new = new.with_usage(TokenUsage::with_total(total));
            }

            let id = store.add_message(new)?;
            println!("{}", format!("Added {} message {}", role, id).green());
        }
        MessageCommand::Edit { id, content } => {
            store.update_message(id, &content)?;
            println!("{}", format!("Updated message {}", id).green());
        }
        MessageCommand::Delete { id } => {
            if store.find_message(id)?.is_none() {
                println!("{}", format!("Message {} does not exist", id).yellow());
                return Ok(());
            }
            let descendants = store.delete_message(id)?;
            println!(
                "{}",
                format!("Deleted message {} and {} descendant(s)", id, descendants).green()
            );
        }
        MessageCommand::Context {
            id,
            include,
            exclude: _,
        } => {
            store.update_context_status(id, include)?;
            let state = if include { "included in" } else { "excluded from" };
            println!("{}", format!("Message {} {} context", id, state).green());
        }
        MessageCommand::Branch {
            parent,
            content,
            role,
        } => {
            let id = store.create_branch(parent, &content, role)?;
            println!(
                "{}",
                format!("Created branch message {} under {}", id, parent).green()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatBranchError;
    use crate::storage::Role;
    use crate::test_utils::{assert_error_contains, temp_store};

    fn add(
        thread: i64,
        role: Role,
        parent: Option<i64>,
        tokens: Option<(u64, u64)>,
    ) -> MessageCommand {
        MessageCommand::Add {
            thread,
            content: "hi".into(),
            role,
            parent,
            no_context: false,
            prompt_tokens: tokens.map(|t| t.0),
            completion_tokens: tokens.map(|t| t.1),
            total_tokens: None,
        }
    }

    #[test]
    fn test_add_assistant_with_usage() {
        let (_dir, store) = temp_store();
        let t = store.create_thread("t").unwrap();
        handle_message(&store, add(t, Role::User, None, None)).unwrap();
        let root = store.get_messages(t).unwrap()[0].id;
        handle_message(&store, add(t, Role::Assistant, Some(root), Some((30, 12)))).unwrap();

        let messages = store.get_messages(t).unwrap();
        assert_eq!(messages.len(), 2);
        let usage = store.get_token_usage(messages[1].id).unwrap().unwrap();
        assert_eq!(usage.total_tokens, 42);
    }

    #[test]
    fn test_add_assistant_with_total_only() {
        let (_dir, store) = temp_store();
        let t = store.create_thread("t").unwrap();
        let root = store.add_message(NewMessage::user(t, "q")).unwrap();
        let mut command = add(t, Role::Assistant, Some(root), None);
        if let MessageCommand::Add { total_tokens, .. } = &mut command {
            *total_tokens = Some(900);
        }
        handle_message(&store, command).unwrap();

        let reply = store.get_message_children(root).unwrap()[0].id;
        assert_eq!(
            store.get_token_usage(reply).unwrap(),
            Some(TokenUsage::with_total(900))
        );
    }

    #[test]
    fn test_add_rejects_unstorable_total() {
        let (_dir, store) = temp_store();
        let t = store.create_thread("t").unwrap();
        let mut command = add(t, Role::Assistant, None, None);
        if let MessageCommand::Add { total_tokens, .. } = &mut command {
            *total_tokens = Some(u64::MAX);
        }
        assert_error_contains(
            handle_message(&store, command),
            "exceeds the storable maximum",
        );
        assert!(store.get_messages(t).unwrap().is_empty());
    }

    #[test]
    fn test_context_exclude() {
        let (_dir, store) = temp_store();
        let t = store.create_thread("t").unwrap();
        let m = store.add_message(NewMessage::user(t, "x")).unwrap();
        handle_message(
            &store,
            MessageCommand::Context {
                id: m,
                include: false,
                exclude: true,
            },
        )
        .unwrap();
        assert!(!store.get_message(m).unwrap().is_context);
    }

    #[test]
    fn test_branch_into_missing_parent_is_not_found() {
        let (_dir, store) = temp_store();
        let err = handle_message(
            &store,
            MessageCommand::Branch {
                parent: 77,
                content: "alt".into(),
                role: Role::User,
            },
        )
        .unwrap_err();
        let typed = err.downcast_ref::<ChatBranchError>().unwrap();
        assert!(typed.is_not_found());
    }

    #[test]
    fn test_delete_missing_message_is_noop() {
        let (_dir, store) = temp_store();
        handle_message(&store, MessageCommand::Delete { id: 5 }).unwrap();
    }
}
