//! Results viewer
//!
//! Transient context spawned after a transcription arrives. Renders the
//! result into a form model and provides the copy/save presentation
//! transforms (paragraph segmentation, filename sanitization).

mod format;
mod viewer;

pub use format::{format_transcription, save_filename, PARAGRAPH_BUDGET};
pub use viewer::{spawn_viewer, RenderSink, RenderedTranscript, VIEWER_DOCUMENT_URL};
