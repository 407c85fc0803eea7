use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tabscribe::{
    spawn_coordinator, Config, DefaultHost, HttpTranscriber, LoadStatus, LocalTabCapture,
    LogIndicator, RenderSink, RenderedTranscript, SyntheticDevices, TabEvent, TabId,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "tabscribe", about = "Tab audio recording and transcription coordinator")]
struct Args {
    /// Config file (without extension)
    #[arg(long, default_value = "config/tabscribe")]
    config: String,

    /// Override the transcription endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Tab id the demo gestures act on
    #[arg(long, default_value_t = 1)]
    tab: u32,
}

/// Prints rendered transcripts to stdout in place of the popup form.
struct StdoutSink;

impl RenderSink for StdoutSink {
    fn render(&self, transcript: RenderedTranscript) {
        println!("\n{}\n", transcript.formatted_text());
        info!("Save filename would be {}", transcript.save_filename());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let mut cfg = if std::path::Path::new(&format!("{}.toml", args.config)).exists() {
        Config::load(&args.config)?
    } else {
        Config::default()
    };
    if let Some(endpoint) = args.endpoint {
        cfg.transcription.endpoint = endpoint;
    }

    info!("{} v0.1.0", cfg.service.name);
    info!("Transcription endpoint: {}", cfg.transcription.endpoint);

    let bus = tabscribe::Bus::new();
    let devices = Arc::new(SyntheticDevices::new(
        cfg.audio.sample_rate,
        cfg.audio.frame_samples,
    ));
    let host = Arc::new(DefaultHost::new(
        bus.clone(),
        devices,
        Arc::new(StdoutSink),
        cfg.viewer.paragraph_budget,
    ));
    let transcriber = Arc::new(HttpTranscriber::new(
        cfg.transcription.endpoint.clone(),
        cfg.transcription.max_attempts,
        Duration::from_millis(cfg.transcription.retry_backoff_ms),
    ));

    let (tab_tx, tab_rx) = mpsc::unbounded_channel();
    spawn_coordinator(
        bus,
        Arc::new(LocalTabCapture),
        host,
        transcriber,
        Arc::new(LogIndicator),
        Duration::from_millis(cfg.viewer.settle_delay_ms),
        tab_rx,
    )
    .await;

    let tab = TabId(args.tab);
    info!("Commands: toggle | navigate | close | quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "toggle" => tab_tx.send(TabEvent::ActionClicked { tab })?,
            "navigate" => tab_tx.send(TabEvent::Updated {
                tab,
                status: LoadStatus::Complete,
            })?,
            "close" => tab_tx.send(TabEvent::Removed { tab })?,
            "quit" => break,
            "" => {}
            other => info!("Unknown command: {}", other),
        }
    }

    Ok(())
}
