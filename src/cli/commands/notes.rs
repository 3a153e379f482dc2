//! Notes command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::{NotesOptions, NotesOutcome, NotesPipeline};
use crate::publish::NotionPublisher;
use crate::source::YtDlpLookup;
use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Check credentials and build a pipeline for notes runs.
pub(super) fn prepare_pipeline(
    settings: Settings,
    provider: Option<&str>,
    publish: bool,
    cancel: CancellationToken,
) -> Result<NotesPipeline> {
    let (_, provider_settings) = settings.provider(provider)?;
    let mut checks = vec![preflight::check(Operation::Notes(provider_settings))];
    if publish {
        checks.push(preflight::check(Operation::Publish(&settings.notion)));
    }
    for check in checks {
        if let Err(e) = check {
            Output::error(&format!("{}", e));
            return Err(e.into());
        }
    }

    let notion = settings.notion.clone();
    let mut pipeline = NotesPipeline::new(settings, Arc::new(YtDlpLookup::new()))?
        .with_cancellation(cancel);
    if publish {
        pipeline = pipeline.with_publisher(Arc::new(NotionPublisher::new(notion)?));
    }
    Ok(pipeline)
}

/// Print a finished run.
pub(super) fn report(outcome: &NotesOutcome) {
    Output::success(&format!(
        "Notes for '{}' written to {}",
        outcome.metadata.title,
        outcome.output_path.display()
    ));
    Output::kv("Provider", &outcome.provider);
    Output::kv("Chunks", &outcome.chunk_count.to_string());
    if outcome.rechunks > 0 {
        Output::kv(
            "Re-chunked",
            &format!("{} times (limit {} TPM)", outcome.rechunks, outcome.final_limit),
        );
    }

    if let Some(url) = &outcome.published_url {
        Output::success(&format!("Published: {}", url));
    }
    if let Some(error) = &outcome.publish_error {
        Output::error(&format!("Publishing failed: {}", error));
    }
    if let Some(removal) = outcome.dequeued {
        if removal.removed {
            Output::info(&format!("Removed from queue ({} remaining)", removal.remaining));
        }
    }
}

/// Run the notes command.
pub async fn run_notes(
    input: &str,
    provider: Option<String>,
    output: Option<String>,
    publish: bool,
    dequeue: bool,
    settings: Settings,
    cancel: CancellationToken,
) -> Result<()> {
    let pipeline = prepare_pipeline(settings, provider.as_deref(), publish, cancel)?;

    let options = NotesOptions {
        provider,
        output: output.map(|o| Settings::expand_path(&o)),
        publish,
        dequeue,
    };

    Output::info(&format!("Processing: {}", input));
    let spinner = Output::spinner("Generating notes...");
    let result = pipeline.run(input, &options).await;
    spinner.finish_and_clear();

    match result {
        Ok(outcome) => {
            report(&outcome);
            if !outcome.is_complete() {
                return Err(anyhow::anyhow!("Notes were written but not published"));
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to generate notes: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
