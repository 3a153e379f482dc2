//! YouTube id parsing and yt-dlp metadata lookup.

use super::{MetadataLookup, VideoMetadata};
use crate::error::{Result, SkriveError};
use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;
use url::Url;

fn video_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Matches various YouTube URL formats and bare video IDs
        Regex::new(
            r"(?x)
            (?:
                # Full YouTube URLs
                (?:https?://)?
                (?:www\.|m\.)?
                (?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/|youtube\.com/shorts/|youtube\.com/live/)
                ([a-zA-Z0-9_-]{11})
            )
            |
            # Bare video ID (11 characters)
            ^([a-zA-Z0-9_-]{11})$
        ",
        )
        .expect("Invalid regex")
    })
}

fn is_video_id(s: &str) -> bool {
    s.len() == 11
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Extract a video ID from a YouTube URL or bare ID.
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if let Some(caps) = video_id_regex().captures(input) {
        // Try group 1 (URL format) then group 2 (bare ID)
        if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
            return Some(m.as_str().to_string());
        }
    }

    // watch URLs with `v` after other query parameters
    let url = Url::parse(input).ok()?;
    let host = url.host_str()?;
    if !host.ends_with("youtube.com") {
        return None;
    }
    url.query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned())
        .filter(|id| is_video_id(id))
}

/// Find the first YouTube watch URL in a block of text.
pub fn find_video_id_in_text(text: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/)([A-Za-z0-9_-]{11})").expect("Invalid regex")
    });
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Metadata lookup backed by `yt-dlp --dump-json`.
#[derive(Debug, Default)]
pub struct YtDlpLookup;

impl YtDlpLookup {
    pub fn new() -> Self {
        Self
    }

    /// Parse the JSON document yt-dlp prints for a single video.
    fn parse_metadata(video_id: &str, json_str: &str) -> Result<VideoMetadata> {
        let json: serde_json::Value = serde_json::from_str(json_str).map_err(|e| {
            SkriveError::Source(format!("Failed to parse yt-dlp output: {}", e))
        })?;

        let title = json["title"].as_str().unwrap_or("Unknown").to_string();

        let channel = json["uploader"]
            .as_str()
            .or_else(|| json["channel"].as_str())
            .unwrap_or("Unknown")
            .to_string();

        let duration_seconds = json["duration"].as_f64().map(|d| d as u32);

        Ok(VideoMetadata {
            id: video_id.to_string(),
            title,
            channel,
            duration_seconds,
        })
    }
}

#[async_trait]
impl MetadataLookup for YtDlpLookup {
    async fn lookup(&self, id: &str) -> Result<VideoMetadata> {
        let url = format!("https://www.youtube.com/watch?v={}", id);
        debug!("Fetching metadata for {}", url);

        let output = tokio::process::Command::new("yt-dlp")
            .args(["--dump-json", "--no-download", "--no-warnings", &url])
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SkriveError::ToolNotFound("yt-dlp".to_string())
                } else {
                    SkriveError::Source(format!("Failed to run yt-dlp: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SkriveError::Source(format!(
                "Video {} not found or unavailable: {}",
                id,
                stderr.trim()
            )));
        }

        Self::parse_metadata(id, &String::from_utf8_lossy(&output.stdout))
    }
}
