// Results viewer context: a pure consumer driven by one inbound message.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::bus::{Action, Bus, Envelope, Target, TranscriptResult};

use super::format::{format_transcription, save_filename};

/// Base document URL the viewer registers under.
pub const VIEWER_DOCUMENT_URL: &str = "viewer.html";

/// The filled form: transcript fields rendered for the user, with the
/// original popup's defaulting rules applied.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedTranscript {
    pub title: String,
    pub time: String,
    pub location: String,
    pub participants: String,
    pub description: String,
    pub transcription: String,
}

impl RenderedTranscript {
    pub fn from_result(result: &TranscriptResult, paragraph_budget: usize) -> Self {
        let metadata = &result.metadata;

        let participants = metadata
            .participants
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let now = chrono::Local::now().format("%m/%d/%Y %H:%M:%S").to_string();

        Self {
            title: metadata.title.clone().unwrap_or_else(|| "Meeting".to_string()),
            time: metadata.time.clone().unwrap_or(now),
            location: metadata.location.clone().unwrap_or_default(),
            participants,
            description: metadata.description.clone().unwrap_or_default(),
            transcription: format_transcription(&result.transcription, paragraph_budget),
        }
    }

    /// Human-formatted block used by both copy-to-clipboard and
    /// save-to-file.
    pub fn formatted_text(&self) -> String {
        format!(
            "Title: {}\nTime: {}\nLocation: {}\nParticipants: {}\nDescription: {}\n==============================\n\n{}",
            self.title, self.time, self.location, self.participants, self.description, self.transcription
        )
    }

    pub fn save_filename(&self) -> String {
        save_filename(&self.title, &self.time)
    }

    /// Write the formatted block to `dir` under the sanitized filename.
    pub fn save_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(self.save_filename());
        std::fs::write(&path, self.formatted_text())
            .with_context(|| format!("Failed to write transcript to {:?}", path))?;
        info!("Transcript saved to {:?}", path);
        Ok(path)
    }
}

/// Where the viewer renders. The actual form UI and clipboard are
/// external collaborators behind this seam.
pub trait RenderSink: Send + Sync {
    fn render(&self, transcript: RenderedTranscript);
}

/// Register a results viewer on the bus and run it. Registration
/// completes before this returns.
pub async fn spawn_viewer(
    bus: Bus,
    sink: Arc<dyn RenderSink>,
    paragraph_budget: usize,
) -> JoinHandle<()> {
    let inbox = bus.register(Target::Viewer, VIEWER_DOCUMENT_URL).await;
    tokio::spawn(run(inbox, sink, paragraph_budget))
}

async fn run(
    mut inbox: mpsc::UnboundedReceiver<Envelope>,
    sink: Arc<dyn RenderSink>,
    paragraph_budget: usize,
) {
    info!("Results viewer opened");
    while let Some(envelope) = inbox.recv().await {
        if let Err(e) = handle_envelope(envelope, &sink, paragraph_budget) {
            error!("Viewer contract violation: {:#}", e);
        }
    }
    info!("Results viewer closed");
}

fn handle_envelope(
    envelope: Envelope,
    sink: &Arc<dyn RenderSink>,
    paragraph_budget: usize,
) -> Result<()> {
    if envelope.target != Target::Viewer {
        bail!("envelope for {:?} delivered to viewer", envelope.target);
    }

    match envelope.action {
        Action::UpdateViewer(result) => {
            sink.render(RenderedTranscript::from_result(&result, paragraph_budget));
            Ok(())
        }
        other => bail!("unrecognized action for viewer: {}", other.name()),
    }
}
