use crate::cli::ThreadCommand;
use crate::commands::{print_json, truncate};
use crate::error::Result;
use crate::storage::{MessageStore, Thread, DEFAULT_THREAD_NAME};
use colored::Colorize;
use prettytable::{format, Table};

/// Handle thread commands
pub fn handle_thread(store: &MessageStore, command: ThreadCommand) -> Result<()> {
    match command {
        ThreadCommand::New { name } => {
            let name = name.unwrap_or_else(|| DEFAULT_THREAD_NAME.to_string());
            let id = store.create_thread(&name)?;
            println!("{}", format!("Created thread {} ({})", id, name).green());
        }
        ThreadCommand::List { search, json } => {
            let threads = match search.as_deref() {
                Some(query) => store.search_threads(query)?,
                None => store.get_threads()?,
            };

            if json {
                return print_json(&threads);
            }
            if threads.is_empty() {
                println!("{}", "No threads found.".yellow());
                return Ok(());
            }

            println!("\nThreads:");
            thread_table(&threads).printstd();
            println!();
            println!(
                "Use {} to show a thread's current branch.",
                "chatbranch view <ID>".cyan()
            );
            println!();
        }
        ThreadCommand::Show { id } => {
            let thread = store.get_thread(id)?;
            let count = store.get_messages(id)?.len();
            println!("{} {}", "Thread".bold(), thread.id.to_string().cyan());
            println!("  Name:     {}", thread.name);
            println!("  Messages: {}", count);
            println!("  Created:  {}", thread.created_at.format("%Y-%m-%d %H:%M"));
            println!("  Updated:  {}", thread.updated_at.format("%Y-%m-%d %H:%M"));
            if !thread.thread_system_prompt.is_empty() {
                println!("  Prompt:   {}", truncate(&thread.thread_system_prompt, 60));
            }
        }
        ThreadCommand::Rename { id, name } => {
            store.update_thread_name(id, &name)?;
            println!("{}", format!("Renamed thread {} to {}", id, name).green());
        }
        ThreadCommand::Delete { ids } => {
            let removed = store.delete_threads(&ids)?;
            if removed == 0 {
                println!("{}", "No matching threads to delete.".yellow());
            } else {
                println!("{}", format!("Deleted {} thread(s)", removed).green());
            }
        }
        ThreadCommand::Prompt { id, set } => match set {
            Some(prompt) => {
                store.update_thread_system_prompt(id, &prompt)?;
                println!("{}", format!("Updated system prompt of thread {}", id).green());
            }
            None => {
                let prompt = store.get_thread_system_prompt(id)?;
                if prompt.is_empty() {
                    println!("{}", "No system prompt set.".yellow());
                } else {
                    println!("{}", prompt);
                }
            }
        },
    }

    Ok(())
}

fn thread_table(threads: &[Thread]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "ID".bold(),
        "Name".bold(),
        "Last Updated".bold()
    ]);

    for thread in threads {
        table.add_row(prettytable::row![
            thread.id.to_string().cyan(),
            truncate(&thread.name, 40),
            thread.updated_at.format("%Y-%m-%d %H:%M").to_string()
        ]);
    }
    table
}
