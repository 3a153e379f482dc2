//! Notes pipeline for Skrive.
//!
//! Coordinates the whole process from transcript file to published notes.

use crate::completion::{AdaptiveRetryController, CompletionInvoker, OpenAiCompatibleInvoker};
use crate::config::{Prompts, Settings};
use crate::error::{Result, SkriveError};
use crate::publish::{extract_title_from_notes, PublishRequest, Publisher};
use crate::queue::{Removal, WorkQueue};
use crate::source::{
    extract_content_id, extract_video_id, find_video_id_in_text, MetadataLookup, VideoMetadata,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Options for one notes run.
#[derive(Debug, Clone, Default)]
pub struct NotesOptions {
    /// Provider key; defaults to `completion.provider`.
    pub provider: Option<String>,
    /// Output file; defaults to `{notes_dir}/{id}_summary_{provider}.md`.
    pub output: Option<PathBuf>,
    pub publish: bool,
    /// Remove the input from the work queue once everything succeeded.
    pub dequeue: bool,
}

/// Values that replace what the pipeline would otherwise derive when publishing.
#[derive(Debug, Clone, Default)]
pub struct PublishOverrides {
    pub id: Option<String>,
    pub title: Option<String>,
    pub channel: Option<String>,
    pub duration: Option<String>,
}

/// Result of a notes run.
#[derive(Debug)]
pub struct NotesOutcome {
    pub metadata: VideoMetadata,
    pub provider: String,
    pub output_path: PathBuf,
    /// Requests that produced the notes.
    pub chunk_count: usize,
    pub rechunks: u32,
    /// TPM limit in effect when the run finished.
    pub final_limit: u64,
    pub published_url: Option<String>,
    /// Why publishing failed, if it was requested and did not succeed.
    pub publish_error: Option<String>,
    pub dequeued: Option<Removal>,
}

impl NotesOutcome {
    /// Whether every requested step succeeded.
    pub fn is_complete(&self) -> bool {
        self.publish_error.is_none()
    }
}

/// The notes pipeline.
pub struct NotesPipeline {
    settings: Settings,
    prompts: Prompts,
    lookup: Arc<dyn MetadataLookup>,
    publisher: Option<Arc<dyn Publisher>>,
    invoker: Option<Arc<dyn CompletionInvoker>>,
    cancel: CancellationToken,
}

impl NotesPipeline {
    pub fn new(settings: Settings, lookup: Arc<dyn MetadataLookup>) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        Ok(Self {
            settings,
            prompts,
            lookup,
            publisher: None,
            invoker: None,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Use `invoker` instead of the configured HTTP provider.
    pub fn with_invoker(mut self, invoker: Arc<dyn CompletionInvoker>) -> Self {
        self.invoker = Some(invoker);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn work_queue(&self) -> WorkQueue {
        WorkQueue::new(self.settings.queue_file())
    }

    /// Metadata for an id, falling back to `Unknown` values.
    async fn metadata_for(&self, id: Option<&str>, fallback_id: &str) -> VideoMetadata {
        let Some(id) = id else {
            return VideoMetadata::unknown(fallback_id);
        };
        match self.lookup.lookup(id).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Metadata lookup failed for {}: {}", id, e);
                VideoMetadata::unknown(id)
            }
        }
    }

    /// Locate the transcript for a path, URL or bare video id.
    ///
    /// Ids and URLs resolve to `{notes_dir}/{id}.txt`.
    pub fn resolve_transcript(&self, input: &str) -> Result<PathBuf> {
        let path = Settings::expand_path(input);
        if path.is_file() {
            return Ok(path);
        }

        if let Some(id) = extract_video_id(input) {
            let candidate = self.settings.notes_dir().join(format!("{}.txt", id));
            if candidate.is_file() {
                debug!("Resolved {} to {}", input.trim(), candidate.display());
                return Ok(candidate);
            }
            return Err(SkriveError::InvalidInput(format!(
                "No transcript for {}: expected {}",
                id,
                candidate.display()
            )));
        }

        Err(SkriveError::InvalidInput(format!(
            "Transcript file not found: {}",
            path.display()
        )))
    }

    /// Turn a transcript into notes.
    #[instrument(skip(self, options), fields(input = %input))]
    pub async fn run(&self, input: &str, options: &NotesOptions) -> Result<NotesOutcome> {
        let path = self.resolve_transcript(input)?;
        let transcript = std::fs::read_to_string(&path)?;

        let content_id = extract_content_id(input).or_else(|| find_video_id_in_text(&transcript));
        let fallback_id = file_stem(&path);
        let metadata = self.metadata_for(content_id.as_deref(), &fallback_id).await;
        info!("Generating notes for '{}' ({})", metadata.title, metadata.id);

        let (provider_key, provider) = self.settings.provider(options.provider.as_deref())?;
        let invoker: Arc<dyn CompletionInvoker> = match &self.invoker {
            Some(invoker) => invoker.clone(),
            None => Arc::new(OpenAiCompatibleInvoker::new(provider.provider_config())?),
        };
        let controller =
            AdaptiveRetryController::new(invoker, self.settings.controller_config(provider))
                .with_cancellation(self.cancel.clone());

        let system_prompt = self.prompts.notes_system(&metadata.title, &metadata.channel);
        let completion = controller.complete(&system_prompt, &transcript).await?;

        let output_path = match &options.output {
            Some(path) => path.clone(),
            None => self
                .settings
                .notes_dir()
                .join(format!("{}_summary_{}.md", metadata.id, provider_key)),
        };
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&output_path, &completion.text)?;
        info!(
            "Wrote {} ({} chunks, {} rechunks)",
            output_path.display(),
            completion.chunk_count(),
            completion.rechunks
        );

        let mut outcome = NotesOutcome {
            metadata,
            provider: provider_key.to_string(),
            output_path,
            chunk_count: completion.chunk_count(),
            rechunks: completion.rechunks,
            final_limit: completion.state.current_limit(),
            published_url: None,
            publish_error: None,
            dequeued: None,
        };

        if options.publish {
            let published = self
                .publish_text(&completion.text, &outcome.metadata, &outcome.provider)
                .await;
            match published {
                Ok(url) => outcome.published_url = Some(url),
                Err(e) => {
                    warn!("Publishing failed: {}", e);
                    outcome.publish_error = Some(e.to_string());
                }
            }
        }

        if options.dequeue && outcome.is_complete() {
            match self.work_queue().remove(input) {
                Ok(removal) => outcome.dequeued = Some(removal),
                Err(e) => warn!("Could not update work queue: {}", e),
            }
        }

        Ok(outcome)
    }

    async fn publish_text(&self, notes: &str, metadata: &VideoMetadata, provider: &str) -> Result<String> {
        let publisher = self
            .publisher
            .as_ref()
            .ok_or_else(|| SkriveError::Publish("No publisher configured".to_string()))?;

        let title = extract_title_from_notes(notes).unwrap_or_else(|| metadata.title.clone());
        let duration = metadata.format_duration();
        let request = PublishRequest {
            notes,
            title: &title,
            content_id: &metadata.id,
            channel: &metadata.channel,
            duration: &duration,
            provider,
            prompt_name: &self.prompts.notes.name,
        };

        publisher.publish(&request).await
    }

    /// Publish an existing notes file.
    #[instrument(skip(self, overrides), fields(path = %path.display()))]
    pub async fn publish_file(&self, path: &Path, overrides: &PublishOverrides) -> Result<String> {
        if !path.is_file() {
            return Err(SkriveError::InvalidInput(format!(
                "Notes file not found: {}",
                path.display()
            )));
        }
        let notes = std::fs::read_to_string(path)?;

        let path_str = path.to_string_lossy();
        let content_id = overrides
            .id
            .clone()
            .or_else(|| extract_content_id(&path_str))
            .or_else(|| find_video_id_in_text(&notes));
        let mut metadata = self.metadata_for(content_id.as_deref(), &file_stem(path)).await;

        if let Some(title) = &overrides.title {
            metadata.title = title.clone();
        }
        if let Some(channel) = &overrides.channel {
            metadata.channel = channel.clone();
        }

        let provider = provider_from_file_name(path).unwrap_or_else(|| "unknown".to_string());
        let publisher = self
            .publisher
            .as_ref()
            .ok_or_else(|| SkriveError::Publish("No publisher configured".to_string()))?;

        // Explicit titles win over the notes heading.
        let title = match &overrides.title {
            Some(title) => title.clone(),
            None => extract_title_from_notes(&notes).unwrap_or_else(|| metadata.title.clone()),
        };
        let duration = overrides
            .duration
            .clone()
            .unwrap_or_else(|| metadata.format_duration());

        let request = PublishRequest {
            notes: &notes,
            title: &title,
            content_id: &metadata.id,
            channel: &metadata.channel,
            duration: &duration,
            provider: &provider,
            prompt_name: &self.prompts.notes.name,
        };
        publisher.publish(&request).await
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "notes".to_string())
}

/// Provider key from a `{id}_summary_{provider}.md` file name.
fn provider_from_file_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let (_, provider) = stem.split_once("_summary_")?;
    (!provider.is_empty()).then(|| provider.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionOutcome;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct EchoInvoker {
        fatal: bool,
    }

    #[async_trait]
    impl CompletionInvoker for EchoInvoker {
        fn name(&self) -> &str {
            "echo"
        }

        async fn invoke(&self, _system_prompt: &str, user_text: &str) -> CompletionOutcome {
            if self.fatal {
                return CompletionOutcome::Fatal {
                    cause: "invalid api key".to_string(),
                };
            }
            CompletionOutcome::Success {
                content: format!("# Notes\n\n- {}", user_text),
                finish_reason: "stop".to_string(),
            }
        }
    }

    struct FixedLookup {
        fail: bool,
    }

    #[async_trait]
    impl MetadataLookup for FixedLookup {
        async fn lookup(&self, id: &str) -> Result<VideoMetadata> {
            if self.fail {
                return Err(SkriveError::ToolNotFound("yt-dlp".to_string()));
            }
            Ok(VideoMetadata {
                id: id.to_string(),
                title: "Ownership in Rust".to_string(),
                channel: "Crust of Rust".to_string(),
                duration_seconds: Some(3725),
            })
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        fail: bool,
        titles: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn publish(&self, request: &PublishRequest<'_>) -> Result<String> {
            if self.fail {
                return Err(SkriveError::Publish("Notion API error (400)".to_string()));
            }
            self.titles.lock().unwrap().push(request.title.to_string());
            Ok(format!("https://www.notion.so/{}", request.content_id))
        }
    }

    struct Fixture {
        dir: tempfile::TempDir,
        transcript: String,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let transcript = dir.path().join("dQw4w9WgXcQ.txt");
            std::fs::write(&transcript, "ownership moves values between bindings").unwrap();
            let transcript = transcript.to_string_lossy().into_owned();
            std::fs::write(dir.path().join("queue.txt"), format!("{}\nother.txt\n", transcript)).unwrap();
            Self { dir, transcript }
        }

        fn settings(&self) -> Settings {
            let mut settings = Settings::default();
            settings.general.notes_dir = self.dir.path().join("notes").to_string_lossy().into_owned();
            settings.general.queue_file = self.dir.path().join("queue.txt").to_string_lossy().into_owned();
            settings
        }

        fn queue(&self) -> Vec<String> {
            WorkQueue::new(self.dir.path().join("queue.txt")).entries().unwrap()
        }
    }

    fn pipeline(fixture: &Fixture, lookup_fails: bool, fatal: bool) -> NotesPipeline {
        NotesPipeline::new(fixture.settings(), Arc::new(FixedLookup { fail: lookup_fails }))
            .unwrap()
            .with_invoker(Arc::new(EchoInvoker { fatal }))
    }

    fn publish_and_dequeue() -> NotesOptions {
        NotesOptions {
            publish: true,
            dequeue: true,
            ..NotesOptions::default()
        }
    }

    #[tokio::test]
    async fn test_run_writes_notes_and_dequeues() {
        let fixture = Fixture::new();
        let publisher = Arc::new(RecordingPublisher::default());
        let pipeline = pipeline(&fixture, false, false).with_publisher(publisher.clone());

        let outcome = pipeline.run(&fixture.transcript, &publish_and_dequeue()).await.unwrap();

        assert_eq!(
            outcome.output_path,
            fixture.dir.path().join("notes").join("dQw4w9WgXcQ_summary_groq.md")
        );
        let notes = std::fs::read_to_string(&outcome.output_path).unwrap();
        assert!(notes.contains("ownership moves values"));
        assert_eq!(outcome.chunk_count, 1);
        assert_eq!(outcome.metadata.title, "Ownership in Rust");
        assert_eq!(outcome.published_url.as_deref(), Some("https://www.notion.so/dQw4w9WgXcQ"));
        assert_eq!(*publisher.titles.lock().unwrap(), vec!["Notes".to_string()]);
        assert_eq!(outcome.dequeued, Some(Removal { removed: true, remaining: 1 }));
        assert_eq!(fixture.queue(), vec!["other.txt"]);
    }

    #[tokio::test]
    async fn test_publish_failure_keeps_queue_entry() {
        let fixture = Fixture::new();
        let publisher = Arc::new(RecordingPublisher {
            fail: true,
            ..RecordingPublisher::default()
        });
        let pipeline = pipeline(&fixture, false, false).with_publisher(publisher);

        let outcome = pipeline.run(&fixture.transcript, &publish_and_dequeue()).await.unwrap();

        assert!(!outcome.is_complete());
        assert!(outcome.output_path.exists());
        assert!(outcome.dequeued.is_none());
        assert_eq!(fixture.queue().len(), 2);
    }

    #[tokio::test]
    async fn test_completion_failure_writes_nothing() {
        let fixture = Fixture::new();
        let pipeline = pipeline(&fixture, false, true);

        let err = pipeline.run(&fixture.transcript, &publish_and_dequeue()).await.unwrap_err();

        assert!(matches!(err, SkriveError::Completion(_)));
        assert!(!fixture.dir.path().join("notes").exists());
        assert_eq!(fixture.queue().len(), 2);
    }

    #[tokio::test]
    async fn test_lookup_failure_uses_unknown_metadata() {
        let fixture = Fixture::new();
        let pipeline = pipeline(&fixture, true, false);

        let outcome = pipeline.run(&fixture.transcript, &NotesOptions::default()).await.unwrap();

        assert_eq!(outcome.metadata, VideoMetadata::unknown("dQw4w9WgXcQ"));
        assert!(outcome.published_url.is_none());
        assert_eq!(fixture.queue().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_transcript() {
        let fixture = Fixture::new();
        let pipeline = pipeline(&fixture, false, false);

        let missing = fixture.dir.path().join("missing.txt");
        let err = pipeline
            .run(&missing.to_string_lossy(), &NotesOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, SkriveError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_queued_id_resolves_to_transcript_in_notes_dir() {
        let fixture = Fixture::new();
        let notes_dir = fixture.dir.path().join("notes");
        std::fs::create_dir_all(&notes_dir).unwrap();
        std::fs::write(notes_dir.join("OOO_x3Oh2nE.txt"), "lifetimes tie borrows to scopes").unwrap();
        WorkQueue::new(fixture.dir.path().join("queue.txt")).append("OOO_x3Oh2nE").unwrap();
        let pipeline = pipeline(&fixture, false, false);

        let options = NotesOptions {
            dequeue: true,
            ..NotesOptions::default()
        };
        let outcome = pipeline.run("OOO_x3Oh2nE", &options).await.unwrap();

        assert_eq!(outcome.metadata.id, "OOO_x3Oh2nE");
        assert_eq!(outcome.output_path, notes_dir.join("OOO_x3Oh2nE_summary_groq.md"));
        let notes = std::fs::read_to_string(&outcome.output_path).unwrap();
        assert!(notes.contains("lifetimes tie borrows"));
        assert_eq!(outcome.dequeued, Some(Removal { removed: true, remaining: 2 }));
        assert_eq!(fixture.queue(), vec![fixture.transcript.clone(), "other.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_queued_id_without_transcript_names_expected_path() {
        let fixture = Fixture::new();
        let pipeline = pipeline(&fixture, false, false);

        let err = pipeline
            .run("https://youtu.be/OOO_x3Oh2nE", &NotesOptions::default())
            .await
            .unwrap_err();

        match err {
            SkriveError::InvalidInput(message) => {
                assert!(message.contains("OOO_x3Oh2nE.txt"), "{}", message);
            }
            other => panic!("expected invalid input, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_publish_file_applies_overrides() {
        let fixture = Fixture::new();
        let notes_path = fixture.dir.path().join("OOO_x3Oh2nE_summary_openai.md");
        std::fs::write(&notes_path, "# Lifetimes\n\n- borrow checker").unwrap();
        let publisher = Arc::new(RecordingPublisher::default());
        let pipeline = pipeline(&fixture, false, false).with_publisher(publisher.clone());

        let overrides = PublishOverrides {
            title: Some("Custom Title".to_string()),
            ..PublishOverrides::default()
        };
        let url = pipeline.publish_file(&notes_path, &overrides).await.unwrap();

        assert_eq!(url, "https://www.notion.so/OOO_x3Oh2nE");
        assert_eq!(*publisher.titles.lock().unwrap(), vec!["Custom Title".to_string()]);
    }

    #[test]
    fn test_provider_from_file_name() {
        assert_eq!(
            provider_from_file_name(Path::new("notes/OOO_x3Oh2nE_summary_cursor.md")),
            Some("cursor".to_string())
        );
        assert_eq!(provider_from_file_name(Path::new("notes/OOO_x3Oh2nE.md")), None);
    }
}
