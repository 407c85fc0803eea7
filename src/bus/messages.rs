use serde::{Deserialize, Serialize};

/// Current envelope wire version. Receivers drop envelopes from a
/// different protocol generation instead of guessing at their layout.
pub const PROTOCOL_VERSION: u16 = 1;

/// Addressable execution contexts.
///
/// At most one context per target is live at any time; the bus registry
/// keys on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    Coordinator,
    Capture,
    Viewer,
}

/// The single cross-context message unit.
///
/// Delivery is fire-and-forget: at-most-once, no acknowledgment, and a
/// send to a target with no live context is silently dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub version: u16,
    pub target: Target,
    #[serde(flatten)]
    pub action: Action,
}

impl Envelope {
    pub fn new(target: Target, action: Action) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            target,
            action,
        }
    }
}

/// Every action exchanged between contexts.
///
/// A correctly-targeted action the receiver does not handle is a contract
/// violation, not something to ignore.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "kebab-case")]
pub enum Action {
    /// Coordinator -> capture worker: begin a capture with this handle.
    StartRecording(CaptureHandle),
    /// Coordinator -> capture worker (or external -> coordinator): end the
    /// active capture. Idempotent when nothing is recording.
    StopRecording,
    /// External -> capture worker: toggle microphone tracks.
    MicMuteChange(bool),
    /// External -> capture worker: latest meeting metadata snapshot.
    CallMetadata(CallMetadata),
    /// Capture worker -> coordinator: finalized artifact handoff. The
    /// sender relinquishes the bytes; the receiver owns their disposal.
    SaveRecording(SaveRecording),
    /// Coordinator -> viewer: render this transcription result.
    UpdateViewer(TranscriptResult),
}

impl Action {
    /// Wire name, for logs and contract-violation errors.
    pub fn name(&self) -> &'static str {
        match self {
            Action::StartRecording(_) => "start-recording",
            Action::StopRecording => "stop-recording",
            Action::MicMuteChange(_) => "mic-mute-change",
            Action::CallMetadata(_) => "call-metadata",
            Action::SaveRecording(_) => "save-recording",
            Action::UpdateViewer(_) => "update-viewer",
        }
    }
}

/// Opaque, single-use token granting access to one tab's audio stream.
///
/// Consumed by value at acquisition time, so a handle cannot be redeemed
/// twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureHandle {
    pub stream_id: String,
}

/// Structured meeting description, supplied externally and merely relayed
/// through to the rendered transcript.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
}

/// Finalized encoded recording plus the metadata it belongs to. Produced
/// at most once per session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub metadata: CallMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveRecording {
    pub artifact: Artifact,
    pub filename: String,
}

/// Transcription text paired with the metadata it corresponds to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptResult {
    pub transcription: String,
    pub metadata: CallMetadata,
}
