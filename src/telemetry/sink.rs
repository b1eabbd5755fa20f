use serde_json::Value;
use std::sync::Arc;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::event::{outcome_event_name, TelemetryEvent, WrenService};
use super::system_info::collect_system_info;
use super::{TelemetryProperties, WREN_SERVICE_KEY};
use crate::config::TelemetryConfig;
use crate::error::TelemetryError;
use crate::services::posthog::{AnalyticsClient, CaptureEvent, PostHogClient};

/// The `sendEvent` contract every context exposes.
///
/// Implementations must not block and must not panic; delivery is best-effort.
pub trait Telemetry: Send + Sync {
    fn send_event(
        &self,
        event: TelemetryEvent,
        properties: TelemetryProperties,
        service: WrenService,
        action_success: bool,
    );
}

struct Enabled<C> {
    user_id: String,
    client: Arc<C>,
    config: Arc<TelemetryConfig>,
}

/// Process-wide sink backed by an analytics client.
///
/// Enabled only when the flag is on and an API key is configured. The
/// decision is made once, at construction.
pub struct PostHogTelemetry<C = PostHogClient> {
    state: Option<Enabled<C>>,
    tracker: TaskTracker,
}

impl PostHogTelemetry<PostHogClient> {
    pub fn new(config: &TelemetryConfig) -> Self {
        Self::build(config, |api_key| PostHogClient::new(api_key, &config.posthog_host))
    }
}

impl<C: AnalyticsClient> PostHogTelemetry<C> {
    /// Same gating as [`PostHogTelemetry::new`], with a caller-supplied client.
    pub fn with_client(config: &TelemetryConfig, client: C) -> Self {
        Self::build(config, move |_| client)
    }

    pub fn disabled() -> Self {
        Self {
            state: None,
            tracker: TaskTracker::new(),
        }
    }

    fn build(config: &TelemetryConfig, make_client: impl FnOnce(&str) -> C) -> Self {
        if !config.telemetry_enabled {
            debug!("Telemetry disabled");
            return Self::disabled();
        }

        let Some(api_key) = config.api_key() else {
            warn!("Telemetry enabled but no PostHog API key configured; telemetry disabled");
            return Self::disabled();
        };

        let user_id = config
            .user_uuid
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        info!(user_id = %user_id, host = %config.posthog_host, "Telemetry enabled");

        Self {
            state: Some(Enabled {
                user_id,
                client: Arc::new(make_client(api_key)),
                config: Arc::new(config.clone()),
            }),
            tracker: TaskTracker::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.state.is_some()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.state.as_ref().map(|s| s.user_id.as_str())
    }

    /// Waits for in-flight events (bounded by the flush timeout), then shuts
    /// the client down. No-op when disabled.
    pub async fn stop(&self) {
        let Some(enabled) = &self.state else {
            return;
        };

        self.tracker.close();
        if tokio::time::timeout(enabled.config.flush_timeout, self.tracker.wait())
            .await
            .is_err()
        {
            warn!(pending = self.tracker.len(), "Timed out flushing telemetry events");
        }
        enabled.client.shutdown();
        info!("Telemetry stopped");
    }
}

impl<C: AnalyticsClient> Telemetry for PostHogTelemetry<C> {
    fn send_event(
        &self,
        event: TelemetryEvent,
        properties: TelemetryProperties,
        service: WrenService,
        action_success: bool,
    ) {
        let Some(enabled) = &self.state else {
            return;
        };
        if self.tracker.is_closed() {
            debug!(event = %event, "Telemetry stopped; dropping event");
            return;
        }

        let name = outcome_event_name(event, action_success);
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(event = %name, "No async runtime available; dropping telemetry event");
            return;
        };

        let distinct_id = enabled.user_id.clone();
        let config = Arc::clone(&enabled.config);
        let client = Arc::clone(&enabled.client);
        self.tracker.spawn_on(
            async move {
                let mut merged = collect_system_info(&config);
                merged.extend(properties);
                merged.insert(WREN_SERVICE_KEY.to_string(), Value::String(service.as_str().to_string()));

                let capture = CaptureEvent {
                    distinct_id,
                    event: name.clone(),
                    properties: merged,
                };
                match client.capture(capture).await {
                    Ok(()) => debug!(event = %name, "Telemetry event sent"),
                    Err(TelemetryError::ClientStopped) => {
                        debug!(event = %name, "Telemetry client stopped; event dropped")
                    }
                    Err(e) => error!(event = %name, error = %e, "Failed to send telemetry event"),
                }
            },
            &handle,
        );
    }
}
