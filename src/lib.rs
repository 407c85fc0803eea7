pub mod bus;
pub mod capture;
pub mod config;
pub mod coordinator;
pub mod host;
pub mod tabs;
pub mod viewer;

pub use bus::{
    Action, Artifact, Bus, CallMetadata, CaptureHandle, ContextInfo, Envelope, Participant,
    SaveRecording, Target, TranscriptResult,
};
pub use capture::{
    spawn_capture_worker, AudioFrame, AudioStream, AudioTrack, MediaDevices, Recorder,
    StreamSource, SyntheticDevices, RECORDING_FRAGMENT,
};
pub use config::Config;
pub use coordinator::{
    spawn_coordinator, ContextHost, HttpTranscriber, Indicator, LogIndicator, Session,
    SessionStatus, Transcriber,
};
pub use host::DefaultHost;
pub use tabs::{LoadStatus, LocalTabCapture, TabCapture, TabEvent, TabId};
pub use viewer::{spawn_viewer, RenderSink, RenderedTranscript};
