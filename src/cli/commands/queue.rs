//! Queue command implementation.

use super::notes::{prepare_pipeline, report};
use crate::cli::{Output, QueueAction};
use crate::config::Settings;
use crate::error::{CompletionError, SkriveError};
use crate::pipeline::NotesOptions;
use crate::queue::WorkQueue;
use anyhow::Result;
use tokio_util::sync::CancellationToken;

/// Run the queue command.
pub async fn run_queue(action: &QueueAction, settings: Settings, cancel: CancellationToken) -> Result<()> {
    let queue = WorkQueue::new(settings.queue_file());

    match action {
        QueueAction::List => {
            let entries = queue.entries()?;
            if entries.is_empty() {
                Output::info(&format!("Queue is empty ({})", queue.path().display()));
                return Ok(());
            }
            Output::header(&format!("Queue ({} items)", entries.len()));
            for entry in &entries {
                Output::list_item(entry);
            }
        }

        QueueAction::Add { entry } => {
            queue.append(entry)?;
            Output::success(&format!("Queued {}", entry.trim()));
        }

        QueueAction::Remove { entry } => {
            let removal = queue.remove(entry)?;
            if removal.removed {
                Output::success(&format!("Removed {} ({} remaining)", entry.trim(), removal.remaining));
            } else {
                Output::warning(&format!("{} is not in the queue", entry.trim()));
            }
        }

        QueueAction::Run { limit, publish, provider } => {
            let mut entries = queue.entries()?;
            if let Some(limit) = limit {
                entries.truncate(*limit);
            }
            if entries.is_empty() {
                Output::info("Queue is empty");
                return Ok(());
            }

            let pipeline = prepare_pipeline(settings, provider.as_deref(), *publish, cancel)?;
            let options = NotesOptions {
                provider: provider.clone(),
                output: None,
                publish: *publish,
                dequeue: true,
            };

            let total = entries.len();
            let mut succeeded = 0;
            let mut failed = 0;

            for (i, entry) in entries.iter().enumerate() {
                Output::header(&format!("[{}/{}] {}", i + 1, total, entry));
                let spinner = Output::spinner("Generating notes...");
                let result = pipeline.run(entry, &options).await;
                spinner.finish_and_clear();

                match result {
                    Ok(outcome) => {
                        report(&outcome);
                        if outcome.is_complete() {
                            succeeded += 1;
                        } else {
                            failed += 1;
                        }
                    }
                    Err(SkriveError::Completion(CompletionError::Cancelled { completed })) => {
                        Output::warning(&format!(
                            "Cancelled after {} completed chunks; {} stays queued",
                            completed, entry
                        ));
                        failed += 1;
                        break;
                    }
                    Err(e) => {
                        Output::error(&format!("Failed: {}", e));
                        failed += 1;
                    }
                }
            }

            Output::header("Summary");
            Output::kv("Succeeded", &succeeded.to_string());
            Output::kv("Failed", &failed.to_string());
            Output::kv("Remaining in queue", &queue.entries()?.len().to_string());

            if failed > 0 {
                return Err(anyhow::anyhow!("{} queue items failed", failed));
            }
        }
    }

    Ok(())
}
