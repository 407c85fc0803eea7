//! Cross-context message bus
//!
//! The only communication mechanism between the coordinator, the capture
//! worker, and the results viewer. One envelope type, routed by target,
//! fire-and-forget, with a context registry that doubles as the source of
//! ground truth about which contexts exist.

pub mod messages;
pub mod router;

pub use messages::{
    Action, Artifact, CallMetadata, CaptureHandle, Envelope, Participant, SaveRecording, Target,
    TranscriptResult, PROTOCOL_VERSION,
};
pub use router::{Bus, ContextInfo};
