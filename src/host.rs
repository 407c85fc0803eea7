//! Context hosting
//!
//! Stands in for the environment that creates execution contexts: the
//! coordinator asks it to materialize the capture worker and the results
//! viewer, and registration is complete before either call returns.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::bus::{Bus, Target};
use crate::capture::{spawn_capture_worker, MediaDevices};
use crate::coordinator::ContextHost;
use crate::viewer::{spawn_viewer, RenderSink};

pub struct DefaultHost {
    bus: Bus,
    devices: Arc<dyn MediaDevices>,
    sink: Arc<dyn RenderSink>,
    paragraph_budget: usize,
}

impl DefaultHost {
    pub fn new(
        bus: Bus,
        devices: Arc<dyn MediaDevices>,
        sink: Arc<dyn RenderSink>,
        paragraph_budget: usize,
    ) -> Self {
        Self {
            bus,
            devices,
            sink,
            paragraph_budget,
        }
    }
}

#[async_trait]
impl ContextHost for DefaultHost {
    async fn ensure_capture_worker(&self) -> Result<()> {
        let exists = self
            .bus
            .contexts()
            .await
            .iter()
            .any(|c| c.target == Target::Capture);
        if exists {
            debug!("Capture worker context already exists");
            return Ok(());
        }

        spawn_capture_worker(self.bus.clone(), self.devices.clone(), None).await;
        Ok(())
    }

    async fn open_viewer(&self) -> Result<()> {
        spawn_viewer(self.bus.clone(), self.sink.clone(), self.paragraph_budget).await;
        Ok(())
    }
}
