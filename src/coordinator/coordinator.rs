// Session coordinator context.
//
// Owns the single source of truth for "is a session active" — and trusts
// it only as far as it deserves: the coordinator may be evicted and
// recreated between gestures, so every start/stop decision re-derives
// state from the live context registry and the capture worker's URL
// fragment signal.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::bus::{Action, Bus, Envelope, SaveRecording, Target, TranscriptResult};
use crate::capture::RECORDING_FRAGMENT;
use crate::tabs::{LoadStatus, TabCapture, TabEvent, TabId};

use super::session::{Session, SessionStatus};
use super::transcribe::Transcriber;

/// Base document URL the coordinator registers under.
pub const COORDINATOR_DOCUMENT_URL: &str = "background.html";

/// Capability to create the auxiliary contexts. Implementations must
/// finish bus registration before returning, so an envelope sent right
/// after creation cannot be dropped.
#[async_trait]
pub trait ContextHost: Send + Sync {
    /// Create the capture worker context if none exists.
    async fn ensure_capture_worker(&self) -> Result<()>;

    /// Open a fresh results viewer context.
    async fn open_viewer(&self) -> Result<()>;
}

/// User-visible recording indicator. Side-effect only; reflects the
/// last-known status.
pub trait Indicator: Send + Sync {
    fn set_recording(&self, recording: bool);
}

/// Indicator that just logs, for headless runs.
pub struct LogIndicator;

impl Indicator for LogIndicator {
    fn set_recording(&self, recording: bool) {
        info!(
            "Indicator: {}",
            if recording { "recording" } else { "not recording" }
        );
    }
}

pub struct Coordinator {
    bus: Bus,
    tabs: Arc<dyn TabCapture>,
    host: Arc<dyn ContextHost>,
    transcriber: Arc<dyn Transcriber>,
    indicator: Arc<dyn Indicator>,
    settle_delay: Duration,
    session: Session,
}

/// Register the coordinator on the bus and run it over the given tab
/// event stream.
pub async fn spawn_coordinator(
    bus: Bus,
    tabs: Arc<dyn TabCapture>,
    host: Arc<dyn ContextHost>,
    transcriber: Arc<dyn Transcriber>,
    indicator: Arc<dyn Indicator>,
    settle_delay: Duration,
    tab_events: mpsc::UnboundedReceiver<TabEvent>,
) -> JoinHandle<()> {
    let inbox = bus.register(Target::Coordinator, COORDINATOR_DOCUMENT_URL).await;
    let coordinator = Coordinator {
        bus,
        tabs,
        host,
        transcriber,
        indicator,
        settle_delay,
        session: Session::new(),
    };
    tokio::spawn(coordinator.run(inbox, tab_events))
}

impl Coordinator {
    async fn run(
        mut self,
        mut inbox: mpsc::UnboundedReceiver<Envelope>,
        mut tab_events: mpsc::UnboundedReceiver<TabEvent>,
    ) {
        info!("Coordinator started");
        loop {
            tokio::select! {
                event = tab_events.recv() => match event {
                    Some(event) => self.handle_tab_event(event).await,
                    None => break,
                },
                envelope = inbox.recv() => match envelope {
                    Some(envelope) => {
                        if let Err(e) = self.handle_envelope(envelope).await {
                            error!("Coordinator contract violation: {:#}", e);
                        }
                    }
                    None => break,
                },
            }
        }
        info!("Coordinator ended");
    }

    async fn handle_tab_event(&mut self, event: TabEvent) {
        match event {
            TabEvent::ActionClicked { tab } => {
                if let Err(e) = self.on_action_clicked(tab).await {
                    error!("Failed to handle action click: {:#}", e);
                }
            }
            // Safety net: a monitored tab that finished navigating or was
            // closed must not keep a runaway capture alive.
            TabEvent::Updated { tab, status } => {
                if self.session.is_active()
                    && self.session.target_tab == Some(tab)
                    && status == LoadStatus::Complete
                {
                    info!("Monitored {} navigated; forcing stop", tab);
                    self.stop_recording().await;
                }
            }
            TabEvent::Removed { tab } => {
                if self.session.is_active() && self.session.target_tab == Some(tab) {
                    info!("Monitored {} closed; forcing stop", tab);
                    self.stop_recording().await;
                }
            }
        }
    }

    /// Start-vs-stop decision on a user gesture, derived from the live
    /// context set rather than local state.
    async fn on_action_clicked(&mut self, tab: TabId) -> Result<()> {
        let contexts = self.bus.contexts().await;
        let capture_context = contexts.iter().find(|c| c.target == Target::Capture);

        let recording = match capture_context {
            Some(info) => info.document_url.ends_with(RECORDING_FRAGMENT),
            None => {
                self.host
                    .ensure_capture_worker()
                    .await
                    .context("Failed to create capture worker context")?;
                false
            }
        };

        debug!("Gesture on {}: worker recording={}", tab, recording);

        if recording {
            self.stop_recording().await;
        } else {
            self.start_recording(tab).await?;
        }

        Ok(())
    }

    async fn start_recording(&mut self, tab: TabId) -> Result<()> {
        self.session.status = SessionStatus::Starting;
        self.session.target_tab = Some(tab);

        let handle = self
            .tabs
            .media_stream_id(tab)
            .await
            .context("Failed to acquire capture handle")?;

        self.bus
            .send(Envelope::new(Target::Capture, Action::StartRecording(handle)))
            .await;

        // Optimistic: the worker's own start is fire-and-forget.
        self.session.status = SessionStatus::Recording;
        self.indicator.set_recording(true);
        info!("Recording start requested for {}", tab);
        Ok(())
    }

    /// Fire-and-forget stop; the worker owns its teardown. Safe to call
    /// with no session active.
    async fn stop_recording(&mut self) {
        self.session.status = SessionStatus::Stopping;
        self.bus
            .send(Envelope::new(Target::Capture, Action::StopRecording))
            .await;
        self.session.reset();
        self.indicator.set_recording(false);
        info!("Recording stop requested");
    }

    async fn handle_envelope(&mut self, envelope: Envelope) -> Result<()> {
        if envelope.target != Target::Coordinator {
            bail!("envelope for {:?} delivered to coordinator", envelope.target);
        }

        match envelope.action {
            Action::SaveRecording(save) => {
                self.handle_save_recording(save);
                Ok(())
            }
            Action::StopRecording => {
                self.stop_recording().await;
                Ok(())
            }
            other => bail!("unrecognized action for coordinator: {}", other.name()),
        }
    }

    /// Artifact handoff: the worker has relinquished the bytes, and from
    /// here the coordinator is their sole owner. Upload and viewer
    /// delivery run off the event loop.
    fn handle_save_recording(&self, save: SaveRecording) {
        info!(
            "Received artifact {} ({} bytes)",
            save.filename,
            save.artifact.bytes.len()
        );

        let bus = self.bus.clone();
        let host = self.host.clone();
        let transcriber = self.transcriber.clone();
        let settle_delay = self.settle_delay;

        tokio::spawn(async move {
            let transcription = match transcriber.transcribe(&save.artifact).await {
                Ok(text) => text,
                Err(e) => {
                    // Terminal for this session: the artifact is dropped.
                    error!("Transcription failed, discarding artifact: {:#}", e);
                    return;
                }
            };

            if let Err(e) = host.open_viewer().await {
                error!("Failed to open results viewer: {:#}", e);
                return;
            }

            // Give the viewer time to finish initializing and register
            // its listener before delivering the result.
            tokio::time::sleep(settle_delay).await;

            bus.send(Envelope::new(
                Target::Viewer,
                Action::UpdateViewer(TranscriptResult {
                    transcription,
                    metadata: save.artifact.metadata,
                }),
            ))
            .await;
        });
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        if self.session.is_active() {
            warn!("Coordinator dropped with an active session");
        }
    }
}
