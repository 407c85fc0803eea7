//! Session coordination
//!
//! The coordinator is the process-wide entry point: it turns user
//! gestures and tab lifecycle signals into start/stop decisions, monitors
//! the captured tab, and handles the artifact handoff to the
//! transcription collaborator and the results viewer.

mod coordinator;
mod session;
mod transcribe;

pub use coordinator::{
    spawn_coordinator, ContextHost, Indicator, LogIndicator, COORDINATOR_DOCUMENT_URL,
};
pub use session::{Session, SessionStatus};
pub use transcribe::{HttpTranscriber, Transcriber};
