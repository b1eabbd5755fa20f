#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use wren_telemetry::error::{Result, TelemetryError};
use wren_telemetry::services::posthog::{AnalyticsClient, CaptureEvent};
use wren_telemetry::telemetry::TelemetryProperties;
use wren_telemetry::{Telemetry, TelemetryConfig, TelemetryEvent, WrenService};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_test_writer()
        .try_init();
}

/// Collects formatted log lines for assertions on warnings.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Runs `f` with a subscriber that writes WARN and above into this buffer.
    pub fn capture<R>(&self, f: impl FnOnce() -> R) -> R {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// One `send_event` call as seen by a fake sink.
#[derive(Debug, Clone, PartialEq)]
pub struct SentEvent {
    pub event: TelemetryEvent,
    pub properties: TelemetryProperties,
    pub service: WrenService,
    pub action_success: bool,
}

#[derive(Default)]
pub struct RecordingTelemetry {
    pub sent: Mutex<Vec<SentEvent>>,
}

impl RecordingTelemetry {
    pub fn events(&self) -> Vec<SentEvent> {
        self.sent.lock().unwrap().clone()
    }
}

impl Telemetry for RecordingTelemetry {
    fn send_event(
        &self,
        event: TelemetryEvent,
        properties: TelemetryProperties,
        service: WrenService,
        action_success: bool,
    ) {
        self.sent.lock().unwrap().push(SentEvent {
            event,
            properties,
            service,
            action_success,
        });
    }
}

/// Analytics client that keeps captured events in memory.
#[derive(Clone, Default)]
pub struct RecordingClient {
    pub captured: Arc<Mutex<Vec<CaptureEvent>>>,
    pub shutdown_calls: Arc<Mutex<u32>>,
    pub fail_with_status: Option<u16>,
    pub delay: Option<Duration>,
}

impl RecordingClient {
    pub fn failing(status: u16) -> Self {
        Self {
            fail_with_status: Some(status),
            ..Self::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<CaptureEvent> {
        self.captured.lock().unwrap().clone()
    }

    pub fn shutdowns(&self) -> u32 {
        *self.shutdown_calls.lock().unwrap()
    }
}

impl AnalyticsClient for RecordingClient {
    async fn capture(&self, event: CaptureEvent) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(status) = self.fail_with_status {
            return Err(TelemetryError::Rejected {
                status,
                body: "rejected".to_string(),
            });
        }
        self.captured.lock().unwrap().push(event);
        Ok(())
    }

    fn shutdown(&self) {
        *self.shutdown_calls.lock().unwrap() += 1;
    }
}

pub fn enabled_config() -> TelemetryConfig {
    TelemetryConfig {
        telemetry_enabled: true,
        posthog_api_key: Some("phc_test_key".to_string()),
        wren_ui_version: Some("0.20.1".to_string()),
        wren_engine_version: Some("0.13.2".to_string()),
        wren_ai_version: Some("0.15.3".to_string()),
        generation_model: Some("gpt-4o-mini".to_string()),
        ..TelemetryConfig::default()
    }
}
