//! Tab lifecycle signals and the capture-handle capability
//!
//! These are consumed interfaces: the host environment feeds `TabEvent`s
//! into the coordinator and implements `TabCapture` to mint single-use
//! stream handles for a tab.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::bus::CaptureHandle;

/// Identity of a browser tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TabId(pub u32);

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tab-{}", self.0)
    }
}

/// Load state reported by a tab-updated signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Loading,
    Complete,
}

/// External events the coordinator reacts to.
#[derive(Debug, Clone)]
pub enum TabEvent {
    /// User activated the action icon while this tab was focused.
    ActionClicked { tab: TabId },
    /// A tab changed load state (navigation).
    Updated { tab: TabId, status: LoadStatus },
    /// A tab was closed.
    Removed { tab: TabId },
}

/// Capability to obtain a single-use capture handle for a tab's audio.
#[async_trait]
pub trait TabCapture: Send + Sync {
    async fn media_stream_id(&self, tab: TabId) -> Result<CaptureHandle>;
}

/// Handle provider for environments without a real tab-capture API: mints
/// opaque ids that the synthetic media devices accept.
pub struct LocalTabCapture;

#[async_trait]
impl TabCapture for LocalTabCapture {
    async fn media_stream_id(&self, tab: TabId) -> Result<CaptureHandle> {
        Ok(CaptureHandle {
            stream_id: format!("{}-{}", tab, uuid::Uuid::new_v4()),
        })
    }
}
