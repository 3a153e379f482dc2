//! Publishing finished notes to a document store.

mod notion;

pub use notion::{markdown_to_blocks, NotionPublisher};

use crate::error::Result;
use async_trait::async_trait;

/// Everything a publisher needs to file one set of notes.
#[derive(Debug, Clone)]
pub struct PublishRequest<'a> {
    pub notes: &'a str,
    pub title: &'a str,
    pub content_id: &'a str,
    pub channel: &'a str,
    pub duration: &'a str,
    /// Provider key the notes were generated with.
    pub provider: &'a str,
    /// Prompt name the notes were generated with.
    pub prompt_name: &'a str,
}

/// A destination for merged notes.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish notes and return the URL of the created document.
    async fn publish(&self, request: &PublishRequest<'_>) -> Result<String>;
}

/// The text of the first `# ` heading in Markdown notes.
pub fn extract_title_from_notes(notes: &str) -> Option<String> {
    notes
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("# "))
        .map(|title| title.trim().trim_matches('*').trim().to_string())
        .filter(|title| !title.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_title_from_notes() {
        let notes = "Some preamble\n\n# **Ownership and Borrowing**\n\n## Moves\n";
        assert_eq!(extract_title_from_notes(notes), Some("Ownership and Borrowing".to_string()));
    }

    #[test]
    fn test_extract_title_ignores_subheadings() {
        assert_eq!(extract_title_from_notes("## Only a section\n- point"), None);
        assert_eq!(extract_title_from_notes("#   \nbody"), None);
        assert_eq!(extract_title_from_notes(""), None);
    }
}
