pub mod config;
pub mod error;
pub mod services;
pub mod telemetry;

// Re-export the surface most callers need
pub use config::TelemetryConfig;
pub use error::{ServiceError, TelemetryError};
pub use telemetry::{
    track_resolver, with_telemetry, Context, PostHogTelemetry, ReportableError, Telemetry,
    TelemetryContext, TelemetryEvent, TrackTelemetry, WrenService,
};
