use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::message::MessageRole;
use crate::constants::{ASSISTANT_GREETING, TRANSCRIPT_TITLE_PREVIEW_CHARS};
use crate::utils::RouterError;

/// One displayed chat line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Local>,
}

/// The full record of a chat as the user saw it
///
/// Unlike [`HistoryBuffer`](super::HistoryBuffer) this never drops anything;
/// it exists for display and persistence, not for prompting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub id: String,
    pub title: String,
    pub entries: Vec<TranscriptEntry>,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
}

impl Transcript {
    /// Start a transcript seeded with the assistant greeting
    pub fn new() -> Self {
        let now = Local::now();
        Self {
            id: now.format("%Y%m%d_%H%M%S_%3f").to_string(),
            title: format!("Session {}", now.format("%Y-%m-%d %H:%M")),
            entries: vec![TranscriptEntry {
                role: MessageRole::Assistant,
                content: ASSISTANT_GREETING.to_string(),
                timestamp: now,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    pub fn push(&mut self, role: MessageRole, content: impl Into<String>) {
        let now = Local::now();
        self.entries.push(TranscriptEntry {
            role,
            content: content.into(),
            timestamp: now,
        });
        self.updated_at = now;
        self.update_title();
    }

    /// Title from the first user message
    fn update_title(&mut self) {
        if let Some(first) = self.entries.iter().find(|e| e.role == MessageRole::User) {
            let preview: String = first.content.chars().take(TRANSCRIPT_TITLE_PREVIEW_CHARS).collect();
            self.title = if preview.len() < first.content.len() {
                format!("{}...", preview)
            } else {
                preview
            };
        }
    }

    /// Whether the user has said anything yet
    pub fn has_user_entries(&self) -> bool {
        self.entries.iter().any(|e| e.role == MessageRole::User)
    }

    /// Get a summary for display
    pub fn summary(&self) -> String {
        format!(
            "{} | {} messages | {}",
            self.updated_at.format("%Y-%m-%d %H:%M"),
            self.entries.len(),
            self.title
        )
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

/// Stores transcripts as JSON files under `<project>/.taskroute/transcripts`
pub struct TranscriptStore {
    dir: PathBuf,
}

impl TranscriptStore {
    pub fn new(project_dir: impl AsRef<Path>) -> Result<Self, RouterError> {
        let dir = project_dir.as_ref().join(".taskroute").join("transcripts");
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    pub fn save(&self, transcript: &Transcript) -> Result<(), RouterError> {
        let json = serde_json::to_string_pretty(transcript)?;
        fs::write(self.path_for(&transcript.id), json)?;
        Ok(())
    }

    pub fn load(&self, id: &str) -> Result<Transcript, RouterError> {
        let json = fs::read_to_string(self.path_for(id))?;
        Ok(serde_json::from_str(&json)?)
    }

    /// All readable transcripts, most recently updated first
    pub fn list(&self) -> Result<Vec<Transcript>, RouterError> {
        let mut transcripts = Vec::new();

        for entry in fs::read_dir(&self.dir)?.flatten() {
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                if let Ok(json) = fs::read_to_string(&path) {
                    if let Ok(transcript) = serde_json::from_str::<Transcript>(&json) {
                        transcripts.push(transcript);
                    }
                }
            }
        }

        transcripts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(transcripts)
    }

    pub fn delete(&self, id: &str) -> Result<(), RouterError> {
        let path = self.path_for(id);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
