//! ChatBranch - branching chat history CLI
//!
#![doc = "ChatBranch - branching chat history CLI"]
#![doc = "Main entry point for the chatbranch application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chatbranch::cli::{Cli, Commands};
use chatbranch::commands;
use chatbranch::config::Config;
use chatbranch::storage::MessageStore;

fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    let store = match &config.storage.db_path {
        Some(path) => MessageStore::new_with_path(path.clone())?,
        None => MessageStore::new()?,
    };
    tracing::debug!(db_path = %store.db_path().display(), "Message store ready");

    match cli.command {
        Commands::Thread { command } => {
            tracing::debug!("Starting thread command");
            commands::threads::handle_thread(&store, command)
        }
        Commands::Message { command } => {
            tracing::debug!("Starting message command");
            commands::messages::handle_message(&store, command)
        }
        Commands::View {
            thread,
            message,
            json,
        } => commands::view::show_path(&store, &config.tokens, thread, message, json),
        Commands::Tree { thread, json } => {
            commands::view::show_tree(&store, &config.tokens, thread, json)
        }
        Commands::Usage { thread, message } => {
            commands::view::show_usage(&store, &config.tokens, thread, message)
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        "chatbranch=debug"
    } else {
        "chatbranch=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
