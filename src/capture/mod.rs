//! Media capture pipeline
//!
//! Everything that touches streams lives here: the device acquisition
//! seam, the mixing graph, the ordered chunk recorder, and the capture
//! worker context that drives them per session.

pub mod devices;
pub mod graph;
pub mod mixer;
pub mod recorder;
pub mod worker;

pub use devices::{AudioFrame, AudioStream, AudioTrack, MediaDevices, StreamSource, SyntheticDevices};
pub use graph::CaptureGraph;
pub use recorder::Recorder;
pub use worker::{spawn_capture_worker, CAPTURE_DOCUMENT_URL, RECORDING_FRAGMENT};
