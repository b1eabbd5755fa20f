use serde::Deserialize;
use std::time::Duration;

use crate::error::{Result, TelemetryError};

pub const DEFAULT_POSTHOG_HOST: &str = "https://app.posthog.com";
const DEFAULT_FLUSH_TIMEOUT_MS: u64 = 5_000;

/// Settings the sink and the system info collector read at construction.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    #[serde(alias = "userUUID")]
    pub user_uuid: Option<String>,
    #[serde(alias = "telemetryEnabled")]
    pub telemetry_enabled: bool,
    #[serde(alias = "wrenAIVersion")]
    pub wren_ai_version: Option<String>,
    #[serde(alias = "wrenEngineVersion")]
    pub wren_engine_version: Option<String>,
    #[serde(alias = "wrenUIVersion")]
    pub wren_ui_version: Option<String>,
    #[serde(alias = "generationModel")]
    pub generation_model: Option<String>,
    #[serde(alias = "posthogApiKey")]
    pub posthog_api_key: Option<String>,
    #[serde(alias = "posthogHost")]
    pub posthog_host: String,
    /// Upper bound on how long `stop()` waits for in-flight sends.
    #[serde(deserialize_with = "millis::deserialize", alias = "flushTimeoutMs")]
    pub flush_timeout: Duration,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            user_uuid: None,
            telemetry_enabled: false,
            wren_ai_version: None,
            wren_engine_version: None,
            wren_ui_version: None,
            generation_model: None,
            posthog_api_key: None,
            posthog_host: DEFAULT_POSTHOG_HOST.to_string(),
            flush_timeout: Duration::from_millis(DEFAULT_FLUSH_TIMEOUT_MS),
        }
    }
}

impl TelemetryConfig {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let telemetry_enabled = match get("TELEMETRY_ENABLED") {
            Some(raw) => parse_flag("TELEMETRY_ENABLED", &raw)?,
            None => false,
        };

        Ok(Self {
            user_uuid: get("USER_UUID"),
            telemetry_enabled,
            wren_ai_version: get("WREN_AI_SERVICE_VERSION"),
            wren_engine_version: get("WREN_ENGINE_VERSION"),
            wren_ui_version: get("WREN_UI_VERSION"),
            generation_model: get("GENERATION_MODEL"),
            posthog_api_key: get("POSTHOG_API_KEY"),
            posthog_host: get("POSTHOG_HOST").unwrap_or_else(|| DEFAULT_POSTHOG_HOST.to_string()),
            ..Self::default()
        })
    }

    /// The API key, if one is set and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.posthog_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(TelemetryError::InvalidConfig {
            key,
            value: raw.to_string(),
        }),
    }
}

mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
