use reqwest::Client;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, TelemetryError};
use crate::telemetry::TelemetryProperties;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One fully enriched event, ready for the collector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureEvent {
    pub distinct_id: String,
    pub event: String,
    pub properties: TelemetryProperties,
}

/// The opaque event sink behind the telemetry layer.
pub trait AnalyticsClient: Send + Sync + 'static {
    fn capture(&self, event: CaptureEvent) -> impl Future<Output = Result<()>> + Send;

    /// Stops accepting events. Later captures fail with `ClientStopped`.
    fn shutdown(&self);
}

#[derive(Serialize)]
struct CaptureRequest<'a> {
    api_key: &'a str,
    event: &'a str,
    distinct_id: &'a str,
    properties: &'a TelemetryProperties,
}

#[derive(Clone)]
pub struct PostHogClient {
    client: Client,
    capture_url: String,
    api_key: String,
    stopped: CancellationToken,
}

impl PostHogClient {
    pub fn new(api_key: &str, host: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            capture_url: format!("{}/capture/", host.trim_end_matches('/')),
            api_key: api_key.to_string(),
            stopped: CancellationToken::new(),
        }
    }

    pub fn capture_url(&self) -> &str {
        &self.capture_url
    }
}

impl AnalyticsClient for PostHogClient {
    async fn capture(&self, event: CaptureEvent) -> Result<()> {
        if self.stopped.is_cancelled() {
            return Err(TelemetryError::ClientStopped);
        }

        let body = CaptureRequest {
            api_key: &self.api_key,
            event: &event.event,
            distinct_id: &event.distinct_id,
            properties: &event.properties,
        };

        let response = tokio::select! {
            _ = self.stopped.cancelled() => return Err(TelemetryError::ClientStopped),
            sent = self.client.post(&self.capture_url).json(&body).send() => sent?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TelemetryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }

    fn shutdown(&self) {
        self.stopped.cancel();
    }
}
