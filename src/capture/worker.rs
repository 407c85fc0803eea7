// Capture worker context.
//
// The only component that touches media resources. Runs a single event
// loop over its bus mailbox plus an internal channel for the results of
// its own async work (stream acquisition, recorder finalization), so all
// state transitions happen in one place.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::bus::{
    Action, Artifact, Bus, CallMetadata, CaptureHandle, Envelope, SaveRecording, Target,
};

use super::devices::{AudioFrame, AudioStream, MediaDevices};
use super::graph::CaptureGraph;
use super::recorder::Recorder;

/// Base document URL the worker registers under.
pub const CAPTURE_DOCUMENT_URL: &str = "capture.html";
/// Fragment appended to the document URL while a capture is live. This is
/// the out-of-band signal the coordinator probes instead of trusting its
/// own memory.
pub const RECORDING_FRAGMENT: &str = "#recording";

enum Phase {
    Idle,
    /// Stream acquisition in flight. The flag cancels it: an acquisition
    /// that completes after cancellation tears down whatever it opened.
    Starting { cancel: Arc<AtomicBool> },
    Recording { graph: CaptureGraph },
}

enum WorkerEvent {
    GraphReady {
        tab: AudioStream,
        mic: AudioStream,
        cancel: Arc<AtomicBool>,
    },
    GraphFailed(anyhow::Error),
    ArtifactReady(Vec<u8>),
}

/// Register a capture worker on the bus and run it. Registration
/// completes before this returns, so envelopes sent afterwards cannot be
/// lost to the startup race.
pub async fn spawn_capture_worker(
    bus: Bus,
    devices: Arc<dyn MediaDevices>,
    monitor: Option<mpsc::UnboundedSender<AudioFrame>>,
) -> JoinHandle<()> {
    let inbox = bus.register(Target::Capture, CAPTURE_DOCUMENT_URL).await;
    let worker = CaptureWorker {
        bus,
        devices,
        monitor,
        phase: Phase::Idle,
        metadata: None,
    };
    tokio::spawn(worker.run(inbox))
}

struct CaptureWorker {
    bus: Bus,
    devices: Arc<dyn MediaDevices>,
    monitor: Option<mpsc::UnboundedSender<AudioFrame>>,
    phase: Phase,
    metadata: Option<CallMetadata>,
}

impl CaptureWorker {
    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<Envelope>) {
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();

        info!("Capture worker started");
        loop {
            tokio::select! {
                envelope = inbox.recv() => match envelope {
                    Some(envelope) => {
                        if let Err(e) = self.handle_envelope(envelope, &event_tx).await {
                            // Contract violations surface loudly but do not
                            // take the worker down.
                            error!("Capture worker contract violation: {:#}", e);
                        }
                    }
                    None => break,
                },
                Some(event) = event_rx.recv() => self.handle_event(event, &event_tx).await,
            }
        }

        info!("Capture worker ended");
    }

    async fn handle_envelope(
        &mut self,
        envelope: Envelope,
        events: &mpsc::UnboundedSender<WorkerEvent>,
    ) -> Result<()> {
        if envelope.target != Target::Capture {
            // The router should never misdeliver; treat it as a bug.
            bail!("envelope for {:?} delivered to capture worker", envelope.target);
        }

        match envelope.action {
            Action::StartRecording(handle) => self.start_recording(handle, events),
            Action::StopRecording => {
                self.stop_recording().await;
                Ok(())
            }
            Action::MicMuteChange(muted) => {
                self.mic_mute_change(muted);
                Ok(())
            }
            Action::CallMetadata(metadata) => {
                debug!("Stored call metadata snapshot");
                self.metadata = Some(metadata);
                Ok(())
            }
            other => bail!("unrecognized action for capture worker: {}", other.name()),
        }
    }

    /// Begin a capture. Not idempotent: a start while one is already in
    /// progress is a programming-contract violation.
    fn start_recording(
        &mut self,
        handle: CaptureHandle,
        events: &mpsc::UnboundedSender<WorkerEvent>,
    ) -> Result<()> {
        if !matches!(self.phase, Phase::Idle) {
            bail!("start-recording received while a capture is already in progress");
        }

        let cancel = Arc::new(AtomicBool::new(false));
        self.phase = Phase::Starting {
            cancel: cancel.clone(),
        };

        // Acquisition can take arbitrary wall-clock time (permission
        // prompts); it runs off the event loop and reports back.
        let devices = self.devices.clone();
        let events = events.clone();
        tokio::spawn(async move {
            let result = async {
                let tab = devices.open_tab_audio(handle).await?;
                let mic = devices.open_microphone().await?;
                Ok::<_, anyhow::Error>((tab, mic))
            }
            .await;

            match result {
                Ok((tab, mic)) => {
                    if cancel.load(Ordering::SeqCst) {
                        // Stop won the race; release the streams instead of
                        // orphaning them.
                        info!("Acquisition cancelled by stop; releasing streams");
                        tab.stop_all_tracks();
                        mic.stop_all_tracks();
                    } else {
                        let _ = events.send(WorkerEvent::GraphReady { tab, mic, cancel });
                    }
                }
                Err(e) => {
                    if cancel.load(Ordering::SeqCst) {
                        // The attempt was already abandoned by a stop; a
                        // failure report would clobber any newer session.
                        debug!("Cancelled acquisition failed: {:#}", e);
                    } else {
                        let _ = events.send(WorkerEvent::GraphFailed(e));
                    }
                }
            }
        });

        Ok(())
    }

    /// End the capture. Idempotent: stop with nothing in flight is a
    /// logged no-op, and stop during acquisition cancels it.
    async fn stop_recording(&mut self) {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Recording { graph } => {
                graph.stop();
                self.bus.set_fragment(Target::Capture, "").await;
                info!("Recording stopped");
            }
            Phase::Starting { cancel } => {
                cancel.store(true, Ordering::SeqCst);
                self.bus.set_fragment(Target::Capture, "").await;
                info!("Recording stopped during stream acquisition");
            }
            Phase::Idle => {
                debug!("stop-recording with no active capture; ignoring");
            }
        }
    }

    /// Toggle microphone tracks. A no-op, not an error, when no
    /// microphone stream is currently held.
    fn mic_mute_change(&self, muted: bool) {
        match &self.phase {
            Phase::Recording { graph } => graph.set_mic_muted(muted),
            _ => debug!("Microphone stream not captured yet; ignoring mute change"),
        }
    }

    async fn handle_event(
        &mut self,
        event: WorkerEvent,
        events: &mpsc::UnboundedSender<WorkerEvent>,
    ) {
        match event {
            WorkerEvent::GraphReady { tab, mic, cancel } => {
                // A stop may have landed between the acquisition task's
                // cancellation check and this event.
                let still_starting = matches!(&self.phase, Phase::Starting { .. });
                if !still_starting || cancel.load(Ordering::SeqCst) {
                    warn!("Streams arrived after stop; releasing");
                    tab.stop_all_tracks();
                    mic.stop_all_tracks();
                    return;
                }

                let (graph, mut chunk_rx) = CaptureGraph::start(tab, mic, self.monitor.clone());

                // Recorder accumulates until the chunk channel closes,
                // then finalizes on its own, mirroring an asynchronous
                // recorder-stopped callback.
                let events = events.clone();
                tokio::spawn(async move {
                    let mut recorder = Recorder::new();
                    while let Some(chunk) = chunk_rx.recv().await {
                        recorder.push_chunk(chunk);
                    }
                    let bytes = recorder.finalize();
                    let _ = events.send(WorkerEvent::ArtifactReady(bytes));
                });

                self.phase = Phase::Recording { graph };
                self.bus
                    .set_fragment(Target::Capture, RECORDING_FRAGMENT)
                    .await;
                info!("Recording started");
            }
            WorkerEvent::GraphFailed(e) => {
                // Resource acquisition failure: no fallback, session
                // resets so a later start can succeed.
                error!("Stream acquisition failed: {:#}", e);
                self.phase = Phase::Idle;
                self.bus.set_fragment(Target::Capture, "").await;
            }
            WorkerEvent::ArtifactReady(bytes) => self.save_recording(bytes).await,
        }
    }

    /// Package the finalized bytes with the latest metadata snapshot and
    /// hand ownership to the coordinator. Resets local state so the
    /// worker is clean for a future session.
    async fn save_recording(&mut self, bytes: Vec<u8>) {
        let metadata = self.metadata.take().unwrap_or_default();
        let filename = format!("recording-{}.webm", Utc::now().timestamp_millis());

        info!(
            "Finalized artifact: {} bytes, filename {}",
            bytes.len(),
            filename
        );

        self.bus
            .send(Envelope::new(
                Target::Coordinator,
                Action::SaveRecording(SaveRecording {
                    artifact: Artifact { bytes, metadata },
                    filename,
                }),
            ))
            .await;
    }
}
