//! Configuration module for Skrive.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{NotesPrompts, Prompts};
pub use settings::{
    CompletionSettings, GeneralSettings, NotionSettings, PromptSettings, ProviderSettings,
    Settings,
};
