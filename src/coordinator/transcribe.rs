// Transcription collaborator boundary.
//
// The service is a black box: multipart POST in, JSON with a
// `transcription` field out. Retry lives here at the boundary, never in
// the session state machine.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::bus::Artifact;

/// Wire filename for the uploaded recording, fixed by the service contract.
const UPLOAD_FILENAME: &str = "audio.webm";

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Upload the artifact and return the transcription text.
    async fn transcribe(&self, artifact: &Artifact) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    transcription: String,
}

/// HTTP client for the transcription service, with bounded retry and
/// linear backoff.
pub struct HttpTranscriber {
    client: reqwest::Client,
    endpoint: String,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl HttpTranscriber {
    pub fn new(endpoint: String, max_attempts: u32, retry_backoff: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            max_attempts: max_attempts.max(1),
            retry_backoff,
        }
    }

    async fn attempt(&self, artifact: &Artifact) -> Result<String> {
        let audio_part = reqwest::multipart::Part::bytes(artifact.bytes.clone())
            .file_name(UPLOAD_FILENAME)
            .mime_str("audio/webm")
            .context("Failed to build audio part")?;

        let metadata_json = serde_json::to_string(&artifact.metadata)
            .context("Failed to encode call metadata")?;

        let form = reqwest::multipart::Form::new()
            .part("audioFile", audio_part)
            .text("callMetadata", metadata_json);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .context("Transcription request failed")?
            .error_for_status()
            .context("Transcription service returned an error status")?;

        let body: TranscribeResponse = response
            .json()
            .await
            .context("Failed to parse transcription response")?;

        Ok(body.transcription)
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, artifact: &Artifact) -> Result<String> {
        let mut last_err = None;

        for attempt in 1..=self.max_attempts {
            match self.attempt(artifact).await {
                Ok(text) => {
                    info!(
                        "Transcription succeeded on attempt {} ({} bytes uploaded)",
                        attempt,
                        artifact.bytes.len()
                    );
                    return Ok(text);
                }
                Err(e) => {
                    warn!(
                        "Transcription attempt {}/{} failed: {:#}",
                        attempt, self.max_attempts, e
                    );
                    last_err = Some(e);
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_backoff * attempt).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("no transcription attempts made")))
    }
}
