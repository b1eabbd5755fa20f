//! Outcome telemetry for application operations.
//!
//! # ISOLATION INVARIANT
//! Telemetry is a side-channel. A wrapped operation's result or error is
//! returned exactly as produced, and failures inside the telemetry layer are
//! logged and dropped. They **NEVER** reach the caller.
//!
//! # EMISSION INVARIANT
//! Each wrapped invocation emits exactly one event, after the operation has
//! settled: `<event>_success` or `<event>_failed`.

pub mod event;
pub mod sink;
pub mod system_info;
pub mod wrapper;

use serde_json::{Map, Value};

/// Open key/value mapping attached to an event.
pub type TelemetryProperties = Map<String, Value>;

/// Attribution key, always merged last.
pub const WREN_SERVICE_KEY: &str = "wren_service";
/// Holds operation data that cannot be spread into the top level.
pub const DATA_KEY: &str = "data";
/// Failure message key on `_failed` events.
pub const ERROR_KEY: &str = "error";

pub use event::{outcome_event_name, TelemetryEvent, WrenService};
pub use sink::{PostHogTelemetry, Telemetry};
pub use system_info::collect_system_info;
pub use wrapper::{
    caller_properties, resolver_data, track_resolver, with_telemetry, Context, ReportableError,
    TelemetryContext, TrackTelemetry,
};
