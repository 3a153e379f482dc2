//! Publish command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::{NotesPipeline, PublishOverrides};
use crate::publish::NotionPublisher;
use crate::source::YtDlpLookup;
use anyhow::Result;
use std::sync::Arc;

/// Run the publish command.
pub async fn run_publish(notes_file: &str, overrides: PublishOverrides, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Publish(&settings.notion)) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let publisher = Arc::new(NotionPublisher::new(settings.notion.clone())?);
    let pipeline = NotesPipeline::new(settings, Arc::new(YtDlpLookup::new()))?.with_publisher(publisher);

    let path = Settings::expand_path(notes_file);
    let spinner = Output::spinner("Publishing to Notion...");
    let result = pipeline.publish_file(&path, &overrides).await;
    spinner.finish_and_clear();

    match result {
        Ok(url) => Output::success(&format!("Published: {}", url)),
        Err(e) => {
            Output::error(&format!("Failed to publish: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
