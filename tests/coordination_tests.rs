// Integration tests for the cross-context session protocol: gesture
// toggling, forced stops, idempotence, and the artifact-to-viewer flow.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tabscribe::{
    spawn_coordinator, Action, Artifact, Bus, CallMetadata, DefaultHost, Envelope, Indicator,
    LoadStatus, LocalTabCapture, Participant, RenderSink, RenderedTranscript, SyntheticDevices,
    TabEvent, TabId, Target, Transcriber, RECORDING_FRAGMENT,
};
use tokio::sync::mpsc;

struct FakeTranscriber {
    uploads: Mutex<Vec<Artifact>>,
    fail: bool,
}

impl FakeTranscriber {
    fn new(fail: bool) -> Self {
        Self {
            uploads: Mutex::new(Vec::new()),
            fail,
        }
    }

    fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, artifact: &Artifact) -> Result<String> {
        self.uploads.lock().unwrap().push(artifact.clone());
        if self.fail {
            anyhow::bail!("service unreachable");
        }
        Ok("This is the transcription.".to_string())
    }
}

struct TestIndicator {
    states: Mutex<Vec<bool>>,
}

impl TestIndicator {
    fn new() -> Self {
        Self {
            states: Mutex::new(Vec::new()),
        }
    }

    fn last(&self) -> Option<bool> {
        self.states.lock().unwrap().last().copied()
    }
}

impl Indicator for TestIndicator {
    fn set_recording(&self, recording: bool) {
        self.states.lock().unwrap().push(recording);
    }
}

struct CollectSink {
    tx: mpsc::UnboundedSender<RenderedTranscript>,
}

impl RenderSink for CollectSink {
    fn render(&self, transcript: RenderedTranscript) {
        let _ = self.tx.send(transcript);
    }
}

struct Harness {
    bus: Bus,
    tab_tx: mpsc::UnboundedSender<TabEvent>,
    devices: Arc<SyntheticDevices>,
    transcriber: Arc<FakeTranscriber>,
    indicator: Arc<TestIndicator>,
    rendered_rx: mpsc::UnboundedReceiver<RenderedTranscript>,
}

async fn start_system(fail_uploads: bool) -> Harness {
    let bus = Bus::new();
    let devices = Arc::new(SyntheticDevices::new(16000, 160));
    let (rendered_tx, rendered_rx) = mpsc::unbounded_channel();
    let host = Arc::new(DefaultHost::new(
        bus.clone(),
        devices.clone(),
        Arc::new(CollectSink { tx: rendered_tx }),
        120,
    ));
    let transcriber = Arc::new(FakeTranscriber::new(fail_uploads));
    let indicator = Arc::new(TestIndicator::new());

    let (tab_tx, tab_rx) = mpsc::unbounded_channel();
    spawn_coordinator(
        bus.clone(),
        Arc::new(LocalTabCapture),
        host,
        transcriber.clone(),
        indicator.clone(),
        Duration::from_millis(10),
        tab_rx,
    )
    .await;

    Harness {
        bus,
        tab_tx,
        devices,
        transcriber,
        indicator,
        rendered_rx,
    }
}

async fn worker_is_recording(bus: &Bus) -> bool {
    bus.contexts()
        .await
        .iter()
        .any(|c| c.target == Target::Capture && c.document_url.ends_with(RECORDING_FRAGMENT))
}

async fn wait_for_recording(bus: &Bus, expected: bool) {
    for _ in 0..300 {
        if worker_is_recording(bus).await == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("worker never reached recording={}", expected);
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..300 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition never became true");
}

#[tokio::test]
async fn test_gesture_toggles_recording_and_delivers_transcript() {
    let mut h = start_system(false).await;
    let tab = TabId(7);

    // First gesture: no worker context exists, so one is created and
    // recording starts.
    h.tab_tx.send(TabEvent::ActionClicked { tab }).unwrap();
    wait_for_recording(&h.bus, true).await;
    assert_eq!(h.indicator.last(), Some(true));

    // Let a few frames accumulate.
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Second gesture: the fragment says recording, so this stops.
    h.tab_tx.send(TabEvent::ActionClicked { tab }).unwrap();
    wait_for_recording(&h.bus, false).await;
    assert_eq!(h.indicator.last(), Some(false));

    // Finalize -> upload -> viewer.
    let rendered = tokio::time::timeout(Duration::from_secs(5), h.rendered_rx.recv())
        .await
        .expect("viewer never rendered")
        .unwrap();
    assert_eq!(rendered.title, "Meeting");
    assert_eq!(rendered.transcription, "This is the transcription..");

    let uploads = h.transcriber.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert!(!uploads[0].bytes.is_empty());

    // Every acquired stream was torn down.
    assert_eq!(h.devices.live_track_count(), 0);
}

#[tokio::test]
async fn test_tab_removal_forces_stop() {
    let h = start_system(false).await;
    let tab = TabId(3);

    h.tab_tx.send(TabEvent::ActionClicked { tab }).unwrap();
    wait_for_recording(&h.bus, true).await;

    h.tab_tx.send(TabEvent::Removed { tab }).unwrap();
    wait_for_recording(&h.bus, false).await;
    assert_eq!(h.indicator.last(), Some(false));

    let devices = h.devices.clone();
    wait_until(move || devices.live_track_count() == 0).await;
}

#[tokio::test]
async fn test_navigation_complete_forces_stop() {
    let h = start_system(false).await;
    let tab = TabId(4);

    h.tab_tx.send(TabEvent::ActionClicked { tab }).unwrap();
    wait_for_recording(&h.bus, true).await;

    h.tab_tx
        .send(TabEvent::Updated {
            tab,
            status: LoadStatus::Complete,
        })
        .unwrap();
    wait_for_recording(&h.bus, false).await;
    assert_eq!(h.indicator.last(), Some(false));
}

#[tokio::test]
async fn test_unrelated_tab_events_do_not_stop() {
    let h = start_system(false).await;
    let tab = TabId(5);

    h.tab_tx.send(TabEvent::ActionClicked { tab }).unwrap();
    wait_for_recording(&h.bus, true).await;

    // A different tab navigating/closing must not end the session.
    h.tab_tx
        .send(TabEvent::Updated {
            tab: TabId(99),
            status: LoadStatus::Complete,
        })
        .unwrap();
    h.tab_tx.send(TabEvent::Removed { tab: TabId(99) }).unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(worker_is_recording(&h.bus).await);
    assert_eq!(h.indicator.last(), Some(true));
}

#[tokio::test]
async fn test_tab_events_with_no_session_are_noops() {
    let h = start_system(false).await;
    let tab = TabId(6);

    h.tab_tx.send(TabEvent::Removed { tab }).unwrap();
    h.tab_tx
        .send(TabEvent::Updated {
            tab,
            status: LoadStatus::Complete,
        })
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    // No indicator change and no capture context was ever created.
    assert_eq!(h.indicator.last(), None);
    assert!(!h
        .bus
        .contexts()
        .await
        .iter()
        .any(|c| c.target == Target::Capture));
}

#[tokio::test]
async fn test_racing_stops_are_idempotent() {
    let h = start_system(false).await;
    let tab = TabId(8);

    h.tab_tx.send(TabEvent::ActionClicked { tab }).unwrap();
    wait_for_recording(&h.bus, true).await;

    // A user stop relayed through the bus racing a tab-removal stop.
    h.bus
        .send(Envelope::new(Target::Coordinator, Action::StopRecording))
        .await;
    h.tab_tx.send(TabEvent::Removed { tab }).unwrap();

    wait_for_recording(&h.bus, false).await;
    assert_eq!(h.indicator.last(), Some(false));

    let devices = h.devices.clone();
    wait_until(move || devices.live_track_count() == 0).await;

    // Exactly one artifact despite two stop paths.
    let transcriber = h.transcriber.clone();
    wait_until(move || transcriber.upload_count() == 1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.transcriber.upload_count(), 1);
}

#[tokio::test]
async fn test_metadata_passes_through_to_viewer() {
    let mut h = start_system(false).await;
    let tab = TabId(9);

    h.tab_tx.send(TabEvent::ActionClicked { tab }).unwrap();
    wait_for_recording(&h.bus, true).await;

    h.bus
        .send(Envelope::new(
            Target::Capture,
            Action::CallMetadata(CallMetadata {
                participants: vec![
                    Participant {
                        name: "Al".to_string(),
                    },
                    Participant {
                        name: "Bo".to_string(),
                    },
                ],
                ..Default::default()
            }),
        ))
        .await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    h.tab_tx.send(TabEvent::ActionClicked { tab }).unwrap();

    let rendered = tokio::time::timeout(Duration::from_secs(5), h.rendered_rx.recv())
        .await
        .expect("viewer never rendered")
        .unwrap();
    assert_eq!(rendered.participants, "Al, Bo");
    // Title was omitted from the metadata.
    assert_eq!(rendered.title, "Meeting");
}

#[tokio::test]
async fn test_start_while_recording_is_rejected() {
    let h = start_system(false).await;
    let tab = TabId(10);

    h.tab_tx.send(TabEvent::ActionClicked { tab }).unwrap();
    wait_for_recording(&h.bus, true).await;

    // A direct start envelope while recording is a contract violation;
    // the worker must reject it and keep the existing capture.
    h.bus
        .send(Envelope::new(
            Target::Capture,
            Action::StartRecording(tabscribe::CaptureHandle {
                stream_id: "rogue".to_string(),
            }),
        ))
        .await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(worker_is_recording(&h.bus).await);

    // And the session still stops cleanly afterwards.
    h.tab_tx.send(TabEvent::ActionClicked { tab }).unwrap();
    wait_for_recording(&h.bus, false).await;
}

#[tokio::test]
async fn test_upload_failure_drops_artifact_silently() {
    let mut h = start_system(true).await;
    let tab = TabId(11);

    h.tab_tx.send(TabEvent::ActionClicked { tab }).unwrap();
    wait_for_recording(&h.bus, true).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    h.tab_tx.send(TabEvent::ActionClicked { tab }).unwrap();
    wait_for_recording(&h.bus, false).await;

    let transcriber = h.transcriber.clone();
    wait_until(move || transcriber.upload_count() >= 1).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    // No viewer was opened and no result rendered.
    assert!(h.rendered_rx.try_recv().is_err());
    assert!(!h
        .bus
        .contexts()
        .await
        .iter()
        .any(|c| c.target == Target::Viewer));

    // The system is still usable for a fresh session.
    h.tab_tx.send(TabEvent::ActionClicked { tab }).unwrap();
    wait_for_recording(&h.bus, true).await;
}
