//! modegate CLI — the main entry point.
//!
//! A thin host over the autonomy engine. Every invocation restores the
//! conversation from the session store, runs one callback, and persists.
//!
//! Commands:
//! - `mode`        — Get, set or clear the session mode
//! - `status`      — Metrics, pending approvals, history, background actions
//! - `check`       — Permission check for one action
//! - `background`  — Register a background action
//! - `done`        — Report that an action finished
//! - `message`     — Preprocess a user message (keyword overrides)
//! - `classify`    — Advisory task classification of free text
//! - `modes`       — List the three modes and their settings
//! - `config`      — Show, locate or validate the configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(
    name = "modegate",
    about = "modegate — autonomy modes and permission gating for agent actions",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Conversation to operate on
    #[arg(short, long, global = true, env = "MODEGATE_CONVERSATION", default_value = "default")]
    conversation: String,

    /// Config file (defaults to ~/.modegate/config.toml)
    #[arg(long, global = true, env = "MODEGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Get, set or clear the session mode
    Mode {
        #[command(subcommand)]
        action: ModeAction,
    },

    /// Show the conversation's autonomy status
    Status,

    /// Ask whether an action may run
    Check {
        /// Action name, e.g. `bash` or `read`
        action: String,

        /// Action arguments as JSON, e.g. '{"command": "ls"}'
        #[arg(short, long, default_value = "{}")]
        args: String,

        /// Call id (generated if omitted)
        #[arg(long)]
        call_id: Option<String>,
    },

    /// Register a background action before it runs
    Background {
        /// Action name
        action: String,

        /// Call id of the action
        call_id: String,
    },

    /// Report that an action finished
    Done {
        /// Call id of the finished action
        call_id: String,

        /// Action name, for logging
        #[arg(short, long, default_value = "")]
        action: String,

        /// The action ended with an error (or was rejected)
        #[arg(long)]
        error: bool,
    },

    /// Preprocess a user message
    Message {
        /// Message text
        text: String,
    },

    /// Classify free text by risk keywords (advisory)
    Classify {
        /// Text to classify
        text: String,
    },

    /// List all modes
    Modes,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ModeAction {
    /// Show the current mode
    Get,
    /// Set the session mode (permissive, balanced, restrictive)
    Set { mode: String },
    /// Clear the session mode and fall back to the default
    Clear,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Validate the config file
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let ctx = Context::new(cli.config, cli.conversation, cli.json);

    match cli.command {
        Commands::Mode { action } => match action {
            ModeAction::Get => commands::mode::get(&ctx).await?,
            ModeAction::Set { mode } => commands::mode::set(&ctx, &mode).await?,
            ModeAction::Clear => commands::mode::clear(&ctx).await?,
        },
        Commands::Status => commands::status::run(&ctx).await?,
        Commands::Check {
            action,
            args,
            call_id,
        } => commands::check::run(&ctx, &action, &args, call_id).await?,
        Commands::Background { action, call_id } => {
            commands::execute::background(&ctx, &action, &call_id).await?
        }
        Commands::Done {
            call_id,
            action,
            error,
        } => commands::execute::done(&ctx, &call_id, &action, error).await?,
        Commands::Message { text } => commands::message::preprocess(&ctx, &text).await?,
        Commands::Classify { text } => commands::message::classify(&ctx, &text)?,
        Commands::Modes => commands::modes::run(&ctx)?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(&ctx)?,
            ConfigAction::Path => commands::config_cmd::path(&ctx)?,
            ConfigAction::Validate => commands::config_cmd::validate(&ctx)?,
        },
    }

    Ok(())
}
