//! Prompt templates for Skrive.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub notes: NotesPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for turning a transcript into study notes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotesPrompts {
    /// Prompt name recorded alongside published notes.
    pub name: String,
    pub system: String,
}

impl Default for NotesPrompts {
    fn default() -> Self {
        Self {
            name: "youtube-summary".to_string(),
            system: r###"You are an expert note taker. You turn video transcripts into clear, well-structured study notes in Markdown.

Video Title: {{title}}
Channel: {{channel}}

Guidelines:
- Start with a single "# " heading that names the topic of the video
- Organize the notes with "## " section headings that follow the video's structure
- Use bullet points for key ideas, definitions, and examples
- Preserve concrete facts: numbers, names, formulas, and step-by-step procedures
- Skip filler: greetings, sponsor reads, subscription requests, and sign-offs
- Never invent content that is not in the transcript

Long transcripts arrive in consecutive parts. The first words of a part repeat
the last words of the previous part for context; do not write notes for those
repeated words twice. When a part starts mid-topic, continue the notes without
a new "# " heading."###
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let notes_path = custom_path.join("notes.toml");
            if notes_path.exists() {
                let content = std::fs::read_to_string(&notes_path)?;
                prompts.notes = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }

    /// The notes system prompt for a video.
    pub fn notes_system(&self, title: &str, channel: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("title".to_string(), title.to_string());
        vars.insert("channel".to_string(), channel.to_string());
        self.render_with_custom(&self.notes.system, &vars)
    }
}
