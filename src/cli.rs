//! Command-line interface definition for ChatBranch
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for threads, messages and path/usage inspection.

use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

use crate::storage::Role;

/// ChatBranch - branching chat history
///
/// Stores conversations as message trees and shows one branch at a time
/// together with its cumulative token usage.
#[derive(Parser, Debug, Clone)]
#[command(name = "chatbranch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Database file (overrides config and CHATBRANCH_DB_PATH)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for ChatBranch
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Manage threads
    Thread {
        #[command(subcommand)]
        command: ThreadCommand,
    },

    /// Manage messages
    Message {
        #[command(subcommand)]
        command: MessageCommand,
    },

    /// Show the displayed branch of a thread with cumulative token usage
    View {
        /// Thread to show
        thread: i64,

        /// Current message; the deepest branch is shown when omitted
        #[arg(short, long)]
        message: Option<i64>,

        /// Print JSON instead of a transcript
        #[arg(long)]
        json: bool,
    },

    /// Show the whole message tree of a thread
    Tree {
        /// Thread to show
        thread: i64,

        /// Print JSON instead of an indented tree
        #[arg(long)]
        json: bool,
    },

    /// Show cumulative token usage for the displayed branch
    Usage {
        /// Thread to inspect
        thread: i64,

        /// Current message; the deepest branch is used when omitted
        #[arg(short, long)]
        message: Option<i64>,
    },
}

/// Thread subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ThreadCommand {
    /// Create a thread
    New {
        /// Thread name
        name: Option<String>,
    },

    /// List threads, most recently updated first
    List {
        /// Only threads whose name contains this text (case-insensitive)
        #[arg(short, long)]
        search: Option<String>,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Show thread details
    Show { id: i64 },

    /// Rename a thread
    Rename { id: i64, name: String },

    /// Delete one or more threads and all their messages
    Delete {
        #[arg(required = true)]
        ids: Vec<i64>,
    },

    /// Show or set the thread system prompt
    Prompt {
        id: i64,

        /// New system prompt
        #[arg(long)]
        set: Option<String>,
    },
}

/// Message subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum MessageCommand {
    /// Add a message to a thread
    Add {
        thread: i64,
        content: String,

        #[arg(short, long, default_value = "user", value_parser = parse_role)]
        role: Role,

        /// Parent message; omitted starts a new root
        #[arg(short, long)]
        parent: Option<i64>,

        /// Exclude the message from the model context
        #[arg(long)]
        no_context: bool,

        /// Prompt tokens reported for an assistant message
        #[arg(long, requires = "completion_tokens")]
        prompt_tokens: Option<u64>,

        /// Completion tokens reported for an assistant message
        #[arg(long, requires = "prompt_tokens")]
        completion_tokens: Option<u64>,

        /// Total tokens for providers that do not split prompt and completion
        #[arg(long, conflicts_with_all = ["prompt_tokens", "completion_tokens"])]
        total_tokens: Option<u64>,
    },

    /// Replace a message's content
    Edit { id: i64, content: String },

    /// Delete a message and every reply beneath it
    Delete { id: i64 },

    /// Include or exclude a message from the model context
    #[command(group(ArgGroup::new("state").required(true).args(["include", "exclude"])))]
    Context {
        id: i64,

        #[arg(long)]
        include: bool,

        #[arg(long)]
        exclude: bool,
    },

    /// Add an alternative reply or edit under an existing message
    Branch {
        parent: i64,
        content: String,

        #[arg(short, long, default_value = "user", value_parser = parse_role)]
        role: Role,
    },
}

fn parse_role(value: &str) -> Result<Role, String> {
    value.parse::<Role>().map_err(|e| e.to_string())
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            db: None,
            verbose: false,
            command: Commands::Thread {
                command: ThreadCommand::List {
                    search: None,
                    json: false,
                },
            },
        }
    }
}
