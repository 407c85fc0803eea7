use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use super::messages::{Envelope, Target, PROTOCOL_VERSION};

/// Snapshot of one live context, as seen from outside.
///
/// The `document_url` is the cheap out-of-band signal: the capture worker
/// appends `#recording` to its URL while a capture is live, so other
/// contexts can infer its state without a request/response round trip.
#[derive(Debug, Clone)]
pub struct ContextInfo {
    pub target: Target,
    pub document_url: String,
}

struct ContextEntry {
    sender: mpsc::UnboundedSender<Envelope>,
    base_url: String,
    fragment: String,
}

/// In-process message bus and context registry.
///
/// Each context registers exactly once (per target) and receives its
/// mailbox; `send` routes by the envelope's target and drops the message
/// when no matching context is live. There is no delivery guarantee
/// beyond "delivered if the target currently exists and is listening".
#[derive(Clone)]
pub struct Bus {
    contexts: Arc<RwLock<HashMap<Target, ContextEntry>>>,
}

impl Bus {
    pub fn new() -> Self {
        Self {
            contexts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a context and obtain its mailbox. Replaces any previous
    /// registration for the same target; the old mailbox closes.
    pub async fn register(&self, target: Target, base_url: &str) -> mpsc::UnboundedReceiver<Envelope> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut contexts = self.contexts.write().await;
        if contexts.contains_key(&target) {
            warn!("Replacing existing {:?} context registration", target);
        }
        contexts.insert(
            target,
            ContextEntry {
                sender: tx,
                base_url: base_url.to_string(),
                fragment: String::new(),
            },
        );
        debug!("Registered context {:?} at {}", target, base_url);
        rx
    }

    /// Remove a context from the live set. Sends to it are dropped from
    /// then on.
    pub async fn unregister(&self, target: Target) {
        let mut contexts = self.contexts.write().await;
        if contexts.remove(&target).is_some() {
            debug!("Unregistered context {:?}", target);
        }
    }

    /// Set the URL fragment of a live context ("" clears it). No-op if the
    /// context is gone.
    pub async fn set_fragment(&self, target: Target, fragment: &str) {
        let mut contexts = self.contexts.write().await;
        if let Some(entry) = contexts.get_mut(&target) {
            entry.fragment = fragment.to_string();
        }
    }

    /// Snapshot of the currently live contexts and their URLs.
    pub async fn contexts(&self) -> Vec<ContextInfo> {
        let contexts = self.contexts.read().await;
        contexts
            .iter()
            .map(|(target, entry)| ContextInfo {
                target: *target,
                document_url: format!("{}{}", entry.base_url, entry.fragment),
            })
            .collect()
    }

    /// Fire-and-forget dispatch by target. A send to a nonexistent context
    /// is silently dropped; callers must not assume acknowledgment.
    pub async fn send(&self, envelope: Envelope) {
        if envelope.version != PROTOCOL_VERSION {
            warn!(
                "Dropping envelope with protocol version {} (expected {})",
                envelope.version, PROTOCOL_VERSION
            );
            return;
        }

        let contexts = self.contexts.read().await;
        match contexts.get(&envelope.target) {
            Some(entry) => {
                let target = envelope.target;
                let action = envelope.action.name();
                if entry.sender.send(envelope).is_err() {
                    // Receiver hung up without unregistering; same as absent.
                    debug!("Context {:?} mailbox closed, dropping {}", target, action);
                }
            }
            None => {
                debug!(
                    "No live {:?} context, dropping {}",
                    envelope.target,
                    envelope.action.name()
                );
            }
        }
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::messages::Action;

    #[tokio::test]
    async fn test_send_routes_by_target() {
        let bus = Bus::new();
        let mut capture_rx = bus.register(Target::Capture, "capture.html").await;
        let mut coord_rx = bus.register(Target::Coordinator, "background.html").await;

        bus.send(Envelope::new(Target::Capture, Action::StopRecording))
            .await;

        let env = capture_rx.recv().await.unwrap();
        assert_eq!(env.target, Target::Capture);
        assert!(coord_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_to_absent_context_is_dropped() {
        let bus = Bus::new();
        // No registration at all; must not panic or error.
        bus.send(Envelope::new(Target::Viewer, Action::StopRecording))
            .await;
    }

    #[tokio::test]
    async fn test_fragment_round_trip() {
        let bus = Bus::new();
        let _rx = bus.register(Target::Capture, "capture.html").await;

        bus.set_fragment(Target::Capture, "#recording").await;
        let contexts = bus.contexts().await;
        let capture = contexts
            .iter()
            .find(|c| c.target == Target::Capture)
            .unwrap();
        assert!(capture.document_url.ends_with("#recording"));

        bus.set_fragment(Target::Capture, "").await;
        let contexts = bus.contexts().await;
        let capture = contexts
            .iter()
            .find(|c| c.target == Target::Capture)
            .unwrap();
        assert_eq!(capture.document_url, "capture.html");
    }

    #[tokio::test]
    async fn test_reregistration_replaces_mailbox() {
        let bus = Bus::new();
        let mut old_rx = bus.register(Target::Viewer, "viewer.html").await;
        let mut new_rx = bus.register(Target::Viewer, "viewer.html").await;

        bus.send(Envelope::new(Target::Viewer, Action::StopRecording))
            .await;

        assert!(new_rx.recv().await.is_some());
        assert!(old_rx.recv().await.is_none());
    }
}
