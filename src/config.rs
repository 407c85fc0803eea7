use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub transcription: TranscriptionConfig,
    pub audio: AudioConfig,
    pub viewer: ViewerConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptionConfig {
    /// Transcription collaborator endpoint
    pub endpoint: String,
    /// Bounded retry at the upload boundary
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// Samples per synthetic frame
    pub frame_samples: usize,
}

#[derive(Debug, Deserialize)]
pub struct ViewerConfig {
    /// Delay before delivering the result so the viewer can finish
    /// initializing and register its listener
    pub settle_delay_ms: u64,
    pub paragraph_budget: usize,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "tabscribe".to_string(),
            },
            transcription: TranscriptionConfig {
                endpoint: "http://127.0.0.1:8995/transcribe".to_string(),
                max_attempts: 3,
                retry_backoff_ms: 500,
            },
            audio: AudioConfig {
                sample_rate: 16000,
                frame_samples: 1600,
            },
            viewer: ViewerConfig {
                settle_delay_ms: 1000,
                paragraph_budget: 120,
            },
        }
    }
}
