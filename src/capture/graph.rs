// Mixing graph owned by the capture worker.
//
// Wiring mirrors the session it records: the tab stream is forwarded to a
// local playback monitor so the user keeps hearing the call, and both the
// tab and microphone streams feed a combined destination whose mixed
// frames are emitted as ordered PCM chunks for the recorder.

use std::collections::VecDeque;

use tokio::sync::mpsc;
use tracing::{debug, info};

use super::devices::{AudioFrame, AudioStream, AudioTrack};
use super::mixer::{mix_samples, samples_to_pcm};

/// Live mixing graph for one capture session.
///
/// Exists iff the owning session is in Starting/Recording/Stopping; built
/// from the two source streams and torn down by stopping every track.
pub struct CaptureGraph {
    tab_tracks: Vec<AudioTrack>,
    mic_tracks: Vec<AudioTrack>,
    combined_track: AudioTrack,
}

impl CaptureGraph {
    /// Wire the two source streams into a combined destination and start
    /// the pump task. Returns the graph handle and the ordered chunk
    /// stream the recorder consumes; the chunk channel closes once both
    /// sources have ended, which is what triggers finalization.
    pub fn start(
        tab: AudioStream,
        mic: AudioStream,
        monitor: Option<mpsc::UnboundedSender<AudioFrame>>,
    ) -> (Self, mpsc::Receiver<Vec<u8>>) {
        let (tab_tracks, tab_rx) = tab.into_parts();
        let (mic_tracks, mic_rx) = mic.into_parts();
        let combined_track = AudioTrack::new();

        let (chunk_tx, chunk_rx) = mpsc::channel(64);

        let graph = Self {
            tab_tracks,
            mic_tracks: mic_tracks.clone(),
            combined_track: combined_track.clone(),
        };

        tokio::spawn(pump(
            tab_rx,
            mic_rx,
            mic_tracks,
            combined_track,
            monitor,
            chunk_tx,
        ));

        info!("Capture graph started");
        (graph, chunk_rx)
    }

    /// Stop every track on both source streams and on the combined
    /// stream. The pump drains and closes the chunk channel on its own.
    pub fn stop(&self) {
        for track in &self.tab_tracks {
            track.stop();
        }
        for track in &self.mic_tracks {
            track.stop();
        }
        self.combined_track.stop();
        info!("Capture graph stopped");
    }

    /// Toggle the enabled flag on every microphone track.
    pub fn set_mic_muted(&self, muted: bool) {
        for track in &self.mic_tracks {
            track.set_enabled(!muted);
        }
        debug!("Microphone tracks enabled={}", !muted);
    }
}

async fn pump(
    mut tab_rx: mpsc::Receiver<AudioFrame>,
    mut mic_rx: mpsc::Receiver<AudioFrame>,
    mic_tracks: Vec<AudioTrack>,
    combined_track: AudioTrack,
    mut monitor: Option<mpsc::UnboundedSender<AudioFrame>>,
    chunk_tx: mpsc::Sender<Vec<u8>>,
) {
    let mut tab_buf: VecDeque<AudioFrame> = VecDeque::new();
    let mut mic_buf: VecDeque<AudioFrame> = VecDeque::new();
    let mut tab_open = true;
    let mut mic_open = true;

    loop {
        tokio::select! {
            frame = tab_rx.recv(), if tab_open => match frame {
                Some(frame) => {
                    if let Some(tx) = &monitor {
                        // Local playback tap; a gone listener is not an error.
                        if tx.send(frame.clone()).is_err() {
                            monitor = None;
                        }
                    }
                    tab_buf.push_back(frame);
                }
                None => tab_open = false,
            },
            frame = mic_rx.recv(), if mic_open => match frame {
                Some(frame) => mic_buf.push_back(frame),
                None => mic_open = false,
            },
            else => break,
        }

        if !combined_track.is_live() {
            break;
        }

        if !emit_ready(
            &mut tab_buf,
            &mut mic_buf,
            tab_open,
            mic_open,
            &mic_tracks,
            &chunk_tx,
        )
        .await
        {
            return;
        }
    }

    // Sources are done; flush whatever is still buffered.
    emit_ready(&mut tab_buf, &mut mic_buf, false, false, &mic_tracks, &chunk_tx).await;
    debug!("Capture graph pump ended");
}

/// Emit mixed chunks for every frame pair currently available. Once a
/// source has ended, its side of the pair is silence. Returns false when
/// the chunk receiver is gone.
async fn emit_ready(
    tab_buf: &mut VecDeque<AudioFrame>,
    mic_buf: &mut VecDeque<AudioFrame>,
    tab_open: bool,
    mic_open: bool,
    mic_tracks: &[AudioTrack],
    chunk_tx: &mpsc::Sender<Vec<u8>>,
) -> bool {
    loop {
        let ready = (!tab_buf.is_empty() && !mic_buf.is_empty())
            || (!tab_buf.is_empty() && !mic_open)
            || (!mic_buf.is_empty() && !tab_open);
        if !ready {
            return true;
        }

        let tab_samples = tab_buf.pop_front().map(|f| f.samples).unwrap_or_default();
        let mut mic_samples = mic_buf.pop_front().map(|f| f.samples).unwrap_or_default();

        // A disabled microphone track stays live but contributes silence.
        if !mic_tracks.iter().all(|t| t.is_enabled()) {
            mic_samples = vec![0; mic_samples.len()];
        }

        let mixed = mix_samples(&tab_samples, &mic_samples);
        if chunk_tx.send(samples_to_pcm(&mixed)).await.is_err() {
            return false;
        }
    }
}
