//! Notion database publisher.

use super::{PublishRequest, Publisher};
use crate::config::NotionSettings;
use crate::error::{Result, SkriveError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, instrument};

const NOTION_API_BASE: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";
/// Notion rejects rich text items longer than this.
const MAX_RICH_TEXT_CHARS: usize = 2000;
/// Notion accepts at most this many children per request.
const MAX_BLOCKS_PER_REQUEST: usize = 100;

/// Publishes notes as pages in a Notion database.
pub struct NotionPublisher {
    settings: NotionSettings,
    api_base: String,
    client: reqwest::Client,
}

impl NotionPublisher {
    pub fn new(settings: NotionSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| SkriveError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            settings,
            api_base: NOTION_API_BASE.to_string(),
            client,
        })
    }

    /// Point the publisher at a different API base URL.
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    /// Check that credentials and a database id are configured.
    pub fn check_configured(&self) -> Result<()> {
        self.api_key()?;
        self.database_id()?;
        Ok(())
    }

    fn api_key(&self) -> Result<String> {
        std::env::var(&self.settings.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                SkriveError::Config(format!(
                    "Notion not configured. Set {}",
                    self.settings.api_key_env
                ))
            })
    }

    fn database_id(&self) -> Result<String> {
        self.settings.resolve_database_id().ok_or_else(|| {
            SkriveError::Config(format!(
                "Notion database not configured. Set notion.database_id or {}",
                self.settings.database_id_env
            ))
        })
    }

    /// Page properties for a publish request.
    fn build_properties(&self, request: &PublishRequest<'_>) -> Value {
        let mut properties = serde_json::Map::new();
        properties.insert(
            self.settings.title_property.clone(),
            json!({ "title": rich_text(request.title) }),
        );

        if self.settings.metadata_properties {
            properties.insert("Video ID".to_string(), json!({ "rich_text": rich_text(request.content_id) }));
            properties.insert("Channel".to_string(), json!({ "rich_text": rich_text(request.channel) }));
            properties.insert("Duration".to_string(), json!({ "rich_text": rich_text(request.duration) }));
            properties.insert(
                "URL".to_string(),
                json!({ "url": format!("https://www.youtube.com/watch?v={}", request.content_id) }),
            );
            properties.insert("Provider".to_string(), json!({ "select": { "name": request.provider } }));
            properties.insert("Prompt".to_string(), json!({ "select": { "name": request.prompt_name } }));
            properties.insert(
                "Date".to_string(),
                json!({ "date": { "start": chrono::Utc::now().format("%Y-%m-%d").to_string() } }),
            );
        }

        Value::Object(properties)
    }

    async fn send(&self, request: reqwest::RequestBuilder, api_key: &str) -> Result<Value> {
        let response = request
            .bearer_auth(api_key)
            .header("Notion-Version", NOTION_VERSION)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<NotionError>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(SkriveError::Publish(format!("Notion API error ({}): {}", status, message)));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl Publisher for NotionPublisher {
    #[instrument(skip_all, fields(content_id = %request.content_id))]
    async fn publish(&self, request: &PublishRequest<'_>) -> Result<String> {
        let api_key = self.api_key()?;
        let database_id = self.database_id()?;

        let blocks = markdown_to_blocks(request.notes);
        let mut batches = blocks.chunks(MAX_BLOCKS_PER_REQUEST);
        let first_batch = batches.next().unwrap_or(&[]);

        let body = json!({
            "parent": { "database_id": database_id },
            "properties": self.build_properties(request),
            "children": first_batch,
        });

        info!("Creating Notion page with {} blocks", blocks.len());
        let page = self
            .send(self.client.post(format!("{}/pages", self.api_base)).json(&body), &api_key)
            .await?;

        let page_id = page["id"]
            .as_str()
            .ok_or_else(|| SkriveError::Publish("Notion response has no page id".to_string()))?
            .to_string();

        for batch in batches {
            debug!("Appending {} blocks to {}", batch.len(), page_id);
            self.send(
                self.client
                    .patch(format!("{}/blocks/{}/children", self.api_base, page_id))
                    .json(&json!({ "children": batch })),
                &api_key,
            )
            .await?;
        }

        Ok(page["url"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| format!("https://www.notion.so/{}", page_id.replace('-', ""))))
    }
}

#[derive(Debug, Deserialize)]
struct NotionError {
    message: String,
}

/// Rich text array for `text`, split at Notion's item length limit.
fn rich_text(text: &str) -> Value {
    let chars: Vec<char> = text.chars().collect();
    let items: Vec<Value> = chars
        .chunks(MAX_RICH_TEXT_CHARS)
        .map(|piece| {
            let content: String = piece.iter().collect();
            json!({ "type": "text", "text": { "content": content } })
        })
        .collect();
    Value::Array(items)
}

fn text_block(kind: &str, text: &str) -> Value {
    json!({
        "object": "block",
        "type": kind,
        kind: { "rich_text": rich_text(text) },
    })
}

fn numbered_item(line: &str) -> Option<&str> {
    let (number, rest) = line.split_once(". ")?;
    if !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit()) {
        Some(rest)
    } else {
        None
    }
}

/// Convert Markdown notes into Notion blocks.
///
/// Handles headings, bullet and numbered items, dividers and fenced code;
/// everything else becomes a paragraph. Consecutive text lines are joined.
pub fn markdown_to_blocks(markdown: &str) -> Vec<Value> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut code: Option<Vec<&str>> = None;

    fn flush(blocks: &mut Vec<Value>, paragraph: &mut Vec<&str>) {
        if !paragraph.is_empty() {
            blocks.push(text_block("paragraph", &paragraph.join(" ")));
            paragraph.clear();
        }
    }

    for raw in markdown.lines() {
        if let Some(lines) = code.as_mut() {
            if raw.trim_start().starts_with("```") {
                blocks.push(json!({
                    "object": "block",
                    "type": "code",
                    "code": { "rich_text": rich_text(&lines.join("\n")), "language": "plain text" },
                }));
                code = None;
            } else {
                lines.push(raw);
            }
            continue;
        }

        let line = raw.trim();
        if line.starts_with("```") {
            flush(&mut blocks, &mut paragraph);
            code = Some(Vec::new());
            continue;
        }
        if line.is_empty() {
            flush(&mut blocks, &mut paragraph);
            continue;
        }

        let block = if let Some(text) = line.strip_prefix("### ") {
            Some(text_block("heading_3", text))
        } else if let Some(text) = line.strip_prefix("## ") {
            Some(text_block("heading_2", text))
        } else if let Some(text) = line.strip_prefix("# ") {
            Some(text_block("heading_1", text))
        } else if let Some(text) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
            Some(text_block("bulleted_list_item", text))
        } else if let Some(text) = numbered_item(line) {
            Some(text_block("numbered_list_item", text))
        } else if line == "---" || line == "***" {
            Some(json!({ "object": "block", "type": "divider", "divider": {} }))
        } else {
            None
        };

        match block {
            Some(block) => {
                flush(&mut blocks, &mut paragraph);
                blocks.push(block);
            }
            None => paragraph.push(line),
        }
    }

    // An unterminated fence still keeps its content.
    if let Some(lines) = code {
        blocks.push(text_block("paragraph", &lines.join("\n")));
    }
    flush(&mut blocks, &mut paragraph);

    blocks
}
