//! Skrive - Transcript to study notes
//!
//! A CLI tool that turns long video transcripts into Markdown notes using any
//! OpenAI-compatible chat completion provider, even one with a small
//! tokens-per-minute limit.
//!
//! The name "Skrive" comes from the Norwegian word for "write."
//!
//! # Overview
//!
//! Skrive allows you to:
//! - Generate notes from transcripts of any length in as few requests as possible
//! - Recover automatically when a provider reports a lower limit than assumed
//! - Publish notes to a Notion database with video metadata
//! - Work through a plain-text queue of transcripts
//!
//! # Architecture
//!
//! - `config` - Configuration and prompt templates
//! - `chunking` - Token estimation, budgets and word-boundary chunking
//! - `completion` - Provider calls, rate-limit parsing and the adaptive retry controller
//! - `source` - Content ids and video metadata
//! - `publish` - Notion publishing
//! - `queue` - Work queue file
//! - `pipeline` - End-to-end coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use skrive::config::Settings;
//! use skrive::pipeline::{NotesOptions, NotesPipeline};
//! use skrive::source::YtDlpLookup;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let pipeline = NotesPipeline::new(settings, Arc::new(YtDlpLookup::new()))?;
//!
//!     let outcome = pipeline.run("dQw4w9WgXcQ.txt", &NotesOptions::default()).await?;
//!     println!("Wrote {} ({} chunks)", outcome.output_path.display(), outcome.chunk_count);
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod completion;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod publish;
pub mod queue;
pub mod source;

pub use error::{CompletionError, Result, SkriveError};
