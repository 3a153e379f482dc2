//! Content identification and video metadata.
//!
//! Resolves which video a transcript or notes file belongs to, and looks up
//! the title, channel and duration used when publishing.

mod youtube;

pub use youtube::{extract_video_id, find_video_id_in_text, YtDlpLookup};

use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

/// Metadata about a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Content identifier (YouTube video id).
    pub id: String,
    pub title: String,
    pub channel: String,
    /// Duration in seconds (if known).
    pub duration_seconds: Option<u32>,
}

impl VideoMetadata {
    /// Placeholder metadata used when a lookup fails.
    pub fn unknown(id: &str) -> Self {
        Self {
            id: id.to_string(),
            title: "Unknown".to_string(),
            channel: "Unknown".to_string(),
            duration_seconds: None,
        }
    }

    /// Watch URL for the video.
    pub fn url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.id)
    }

    /// Duration as `H:MM:SS` or `M:SS`, or `Unknown`.
    pub fn format_duration(&self) -> String {
        match self.duration_seconds {
            Some(seconds) if seconds > 0 => format_duration(seconds),
            _ => "Unknown".to_string(),
        }
    }
}

/// Format seconds as `H:MM:SS`, or `M:SS` under an hour.
pub fn format_duration(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Looks up metadata for a content id.
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    async fn lookup(&self, id: &str) -> Result<VideoMetadata>;
}

fn file_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z0-9_-]{11})(?:_summary[A-Za-z0-9_-]*)?\.(?:md|txt|vtt|srt)$")
            .expect("Invalid regex")
    })
}

/// Extract a content id from a URL, a bare id, or a file path.
///
/// File names follow `{id}.txt` for transcripts and `{id}_summary_{provider}.md`
/// for notes.
pub fn extract_content_id(input: &str) -> Option<String> {
    let input = input.trim();
    if let Some(id) = extract_video_id(input) {
        return Some(id);
    }

    let file_name = Path::new(input).file_name()?.to_str()?;
    file_name_regex()
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_notes_file_name() {
        assert_eq!(
            extract_content_id("YouTubeNotes/OOO_x3Oh2nE_summary_cursor.md"),
            Some("OOO_x3Oh2nE".to_string())
        );
        assert_eq!(
            extract_content_id("notes/dQw4w9WgXcQ_summary_groq.md"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_extract_from_transcript_path() {
        assert_eq!(
            extract_content_id("YouTubeNotes/transcripts/OOO_x3Oh2nE.txt"),
            Some("OOO_x3Oh2nE".to_string())
        );
    }

    #[test]
    fn test_extract_from_url_and_bare_id() {
        assert_eq!(
            extract_content_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(extract_content_id(" dQw4w9WgXcQ "), Some("dQw4w9WgXcQ".to_string()));
    }

    #[test]
    fn test_extract_rejects_other_files() {
        assert_eq!(extract_content_id("notes/lecture-notes.md"), None);
        assert_eq!(extract_content_id("transcripts/short.txt"), None);
        assert_eq!(extract_content_id(""), None);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(59), "0:59");
        assert_eq!(format_duration(754), "12:34");
        assert_eq!(format_duration(3725), "1:02:05");
    }

    #[test]
    fn test_unknown_metadata() {
        let metadata = VideoMetadata::unknown("dQw4w9WgXcQ");
        assert_eq!(metadata.title, "Unknown");
        assert_eq!(metadata.format_duration(), "Unknown");
        assert_eq!(metadata.url(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }
}
