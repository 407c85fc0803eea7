use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::bus::CaptureHandle;

/// Audio stream source type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamSource {
    /// Audio captured from the target tab
    Tab,
    /// Microphone input
    Microphone,
}

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
    pub source: StreamSource,
}

/// One track of a live stream.
///
/// `stop()` permanently ends the producer; `set_enabled(false)` keeps the
/// track live but silences it (frames are zeroed downstream while the
/// flag is off). Clones share the same underlying flags.
#[derive(Debug, Clone)]
pub struct AudioTrack {
    enabled: Arc<AtomicBool>,
    live: Arc<AtomicBool>,
}

impl AudioTrack {
    pub fn new() -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(true)),
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

impl Default for AudioTrack {
    fn default() -> Self {
        Self::new()
    }
}

/// A live audio stream: a source tag, its tracks, and the frame channel
/// its producer feeds. The producer is expected to observe the track
/// flags and close the channel once every track has been stopped.
pub struct AudioStream {
    pub source: StreamSource,
    tracks: Vec<AudioTrack>,
    frames: mpsc::Receiver<AudioFrame>,
}

impl AudioStream {
    pub fn new(source: StreamSource, tracks: Vec<AudioTrack>, frames: mpsc::Receiver<AudioFrame>) -> Self {
        Self {
            source,
            tracks,
            frames,
        }
    }

    pub fn tracks(&self) -> &[AudioTrack] {
        &self.tracks
    }

    pub fn stop_all_tracks(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }

    /// Split into the track handles and the frame receiver, so the mixing
    /// graph can own the receiver while teardown keeps the tracks.
    pub fn into_parts(self) -> (Vec<AudioTrack>, mpsc::Receiver<AudioFrame>) {
        (self.tracks, self.frames)
    }
}

/// Media acquisition seam. The capture worker is the only component that
/// calls this; everything else sees streams only through envelopes.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Redeem a single-use capture handle for the tab's audio stream.
    async fn open_tab_audio(&self, handle: CaptureHandle) -> Result<AudioStream>;

    /// Acquire a fresh microphone stream.
    async fn open_microphone(&self) -> Result<AudioStream>;
}

/// Built-in device implementation that generates deterministic tone
/// frames, for development and integration testing. Accepts any handle.
pub struct SyntheticDevices {
    sample_rate: u32,
    frame_samples: usize,
    frame_interval: Duration,
    opened: std::sync::Mutex<Vec<AudioTrack>>,
}

impl SyntheticDevices {
    pub fn new(sample_rate: u32, frame_samples: usize) -> Self {
        Self {
            sample_rate,
            frame_samples,
            frame_interval: Duration::from_millis(10),
            opened: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Number of tracks this factory has opened that are still live.
    /// Lets callers verify that teardown reached every stream.
    pub fn live_track_count(&self) -> usize {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.is_live())
            .count()
    }

    fn spawn_stream(&self, source: StreamSource, amplitude: i16) -> AudioStream {
        let track = AudioTrack::new();
        self.opened.lock().unwrap().push(track.clone());

        let (tx, rx) = mpsc::channel(64);
        let sample_rate = self.sample_rate;
        let frame_samples = self.frame_samples;
        let interval = self.frame_interval;
        let producer_track = track.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            while producer_track.is_live() {
                ticker.tick().await;
                let frame = AudioFrame {
                    samples: vec![amplitude; frame_samples],
                    sample_rate,
                    channels: 1,
                    source,
                };
                if tx.send(frame).await.is_err() {
                    break;
                }
            }
            debug!("Synthetic {:?} producer ended", source);
        });

        AudioStream::new(source, vec![track], rx)
    }
}

#[async_trait]
impl MediaDevices for SyntheticDevices {
    async fn open_tab_audio(&self, handle: CaptureHandle) -> Result<AudioStream> {
        debug!("Opening synthetic tab stream for {}", handle.stream_id);
        Ok(self.spawn_stream(StreamSource::Tab, 1000))
    }

    async fn open_microphone(&self) -> Result<AudioStream> {
        Ok(self.spawn_stream(StreamSource::Microphone, 500))
    }
}
