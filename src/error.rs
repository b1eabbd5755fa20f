use thiserror::Error;
use crate::telemetry::event::WrenService;

/// Failures inside the telemetry subsystem itself.
///
/// These never reach the caller of a wrapped operation. The sink logs and
/// drops them.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("analytics request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("analytics collector rejected event with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("failed to encode event: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid value {value:?} for {key}")]
    InvalidConfig { key: &'static str, value: String },

    #[error("analytics client has been stopped")]
    ClientStopped,
}

pub type Result<T> = std::result::Result<T, TelemetryError>;

/// A domain failure carrying GraphQL-style extensions.
///
/// `service` names the subsystem the failure is attributed to in telemetry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ServiceError {
    pub message: String,
    pub code: Option<String>,
    pub service: Option<WrenService>,
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            service: None,
        }
    }

    pub fn with_service(mut self, service: WrenService) -> Self {
        self.service = Some(service);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}
