//! CLI module - Command-line interface for chatkeep
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// chatkeep - chat with OpenAI-compatible models, history kept locally
#[derive(Parser)]
#[command(name = "chatkeep")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Create a local account
    Register {
        email: String,
        /// Optional display name
        #[arg(long)]
        username: Option<String>,
        /// Password (read from stdin when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Sign in and remember the session
    Login {
        email: String,
        /// Password (read from stdin when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Forget the current session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Start a new conversation
    New {
        /// Conversation title
        title: Vec<String>,
    },

    /// List conversations, most recent first
    #[command(alias = "ls")]
    List,

    /// Print a conversation's messages
    Show {
        /// Conversation ID
        id: String,
    },

    /// Rename a conversation
    Rename {
        /// Conversation ID
        id: String,
        /// New title
        #[arg(required = true)]
        title: Vec<String>,
    },

    /// Delete a conversation and all its messages
    #[command(alias = "rm")]
    Delete {
        /// Conversation ID
        id: String,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },

    /// Send a message and print the reply
    Send {
        /// Conversation ID (defaults to the most recently updated one)
        #[arg(long, short)]
        conversation: Option<String>,
        /// File to reference from the message
        #[arg(long)]
        attach: Option<PathBuf>,
        /// Message text
        #[arg(required = true)]
        message: Vec<String>,
    },

    /// List models available to your API key
    Models,

    /// View or change generation settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Print the current settings
    Show,
    /// Change one setting
    Set {
        /// api_key, model, system_prompt, temperature, max_tokens, top_p,
        /// frequency_penalty or presence_penalty
        key: String,
        value: Vec<String>,
    },
}

pub use commands::*;
