//! CLI module for Skrive.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Skrive - Transcript to study notes
///
/// Turns long video transcripts into Markdown notes with any OpenAI-compatible
/// chat completion provider, adapting to the provider's token rate limit.
/// The name "Skrive" is Norwegian for "write."
#[derive(Parser, Debug)]
#[command(name = "skrive")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "SKRIVE_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate notes from a transcript file
    Notes {
        /// Transcript file path, or a video id/URL whose transcript is `{notes_dir}/{id}.txt`
        input: String,

        /// Provider profile from the config (e.g. groq, openai)
        #[arg(short, long)]
        provider: Option<String>,

        /// Output file (default: {notes_dir}/{id}_summary_{provider}.md)
        #[arg(short, long)]
        output: Option<String>,

        /// Publish the notes to Notion after writing them
        #[arg(long)]
        publish: bool,

        /// Remove the input from the work queue once everything succeeded
        #[arg(long)]
        dequeue: bool,
    },

    /// Publish an existing notes file to Notion
    Publish {
        /// Notes file path
        notes_file: String,

        /// Video ID (default: taken from the file name or contents)
        #[arg(long)]
        id: Option<String>,

        /// Page title (default: first heading in the notes)
        #[arg(long)]
        title: Option<String>,

        /// Channel name
        #[arg(long)]
        channel: Option<String>,

        /// Duration, e.g. 1:02:05
        #[arg(long)]
        duration: Option<String>,
    },

    /// Manage the work queue
    Queue {
        #[command(subcommand)]
        action: QueueAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum QueueAction {
    /// Show queued items
    List,

    /// Add a transcript path or video id to the queue
    Add {
        entry: String,
    },

    /// Remove an item from the queue
    Remove {
        entry: String,
    },

    /// Generate notes for queued items, removing each one that succeeds
    Run {
        /// Maximum number of items to process (default: all)
        #[arg(long)]
        limit: Option<usize>,

        /// Publish each item's notes to Notion
        #[arg(long)]
        publish: bool,

        /// Provider profile from the config
        #[arg(short, long)]
        provider: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
