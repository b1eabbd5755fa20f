use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::warn;

use super::event::{TelemetryEvent, WrenService};
use super::sink::Telemetry;
use super::system_info::SYSTEM_INFO_KEYS;
use super::{TelemetryProperties, DATA_KEY, ERROR_KEY, WREN_SERVICE_KEY};
use crate::error::ServiceError;

/// Anything that carries the process-wide telemetry sink.
pub trait TelemetryContext {
    fn telemetry(&self) -> &dyn Telemetry;
}

/// Stock request context holding the shared sink.
#[derive(Clone)]
pub struct Context {
    pub telemetry: Arc<dyn Telemetry>,
}

impl Context {
    pub fn new(telemetry: Arc<dyn Telemetry>) -> Self {
        Self { telemetry }
    }
}

impl TelemetryContext for Context {
    fn telemetry(&self) -> &dyn Telemetry {
        self.telemetry.as_ref()
    }
}

/// An operation failure that can be reported on a `_failed` event.
///
/// The message is the `Display` output. `service` attributes the failure to
/// a subsystem; `None` is reported as `UNKNOWN`.
pub trait ReportableError: fmt::Display {
    fn service(&self) -> Option<WrenService> {
        None
    }
}

impl ReportableError for ServiceError {
    fn service(&self) -> Option<WrenService> {
        self.service
    }
}

impl ReportableError for anyhow::Error {
    fn service(&self) -> Option<WrenService> {
        self.chain()
            .find_map(|cause| cause.downcast_ref::<ServiceError>())
            .and_then(|e| e.service)
    }
}

impl ReportableError for Box<dyn std::error::Error + Send + Sync> {
    fn service(&self) -> Option<WrenService> {
        self.downcast_ref::<ServiceError>().and_then(|e| e.service)
    }
}

impl ReportableError for std::io::Error {}

impl ReportableError for String {}

/// Turns operation data into event properties.
///
/// Objects contribute their fields, `null` contributes nothing. Any other
/// value, or an object using a key the event itself owns (`data`, `error`,
/// `wren_service`, a system info key), lands whole under `data`.
pub fn caller_properties(data: Value) -> TelemetryProperties {
    match data {
        Value::Null => TelemetryProperties::new(),
        Value::Object(map) if !map.keys().any(|k| is_reserved_key(k)) => map,
        other => {
            let mut props = TelemetryProperties::new();
            props.insert(DATA_KEY.to_string(), other);
            props
        }
    }
}

fn is_reserved_key(key: &str) -> bool {
    [DATA_KEY, ERROR_KEY, WREN_SERVICE_KEY]
        .iter()
        .chain(SYSTEM_INFO_KEYS)
        .any(|reserved| *reserved == key)
}

/// Runs `operation` and emits exactly one outcome event once it settles.
///
/// The result or error is handed back untouched.
pub async fn with_telemetry<C, F, Fut, T, E>(
    event: TelemetryEvent,
    data: Value,
    ctx: &C,
    operation: F,
) -> Result<T, E>
where
    C: TelemetryContext + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: ReportableError,
{
    match operation().await {
        Ok(result) => {
            ctx.telemetry()
                .send_event(event, caller_properties(data), WrenService::Unknown, true);
            Ok(result)
        }
        Err(err) => {
            let mut properties = caller_properties(data);
            properties.insert(ERROR_KEY.to_string(), Value::String(err.to_string()));
            ctx.telemetry().send_event(
                event,
                properties,
                err.service().unwrap_or_default(),
                false,
            );
            Err(err)
        }
    }
}

/// `future.track(event, data, &ctx)` sugar over [`with_telemetry`].
pub trait TrackTelemetry<T, E>: Future<Output = Result<T, E>> + Sized {
    fn track<C>(
        self,
        event: TelemetryEvent,
        data: Value,
        ctx: &C,
    ) -> impl Future<Output = Result<T, E>>
    where
        C: TelemetryContext + ?Sized,
        E: ReportableError;
}

impl<F, T, E> TrackTelemetry<T, E> for F
where
    F: Future<Output = Result<T, E>>,
{
    fn track<C>(
        self,
        event: TelemetryEvent,
        data: Value,
        ctx: &C,
    ) -> impl Future<Output = Result<T, E>>
    where
        C: TelemetryContext + ?Sized,
        E: ReportableError,
    {
        with_telemetry(event, data, ctx, move || self)
    }
}

/// Resolver-shaped surface: `args` is the resolver's argument object and
/// `ctx` its trailing context. Emits the same properties as
/// [`with_telemetry`] given `resolver_data(args)`.
pub async fn track_resolver<A, C, F, Fut, T, E>(
    event: TelemetryEvent,
    args: &A,
    ctx: &C,
    operation: F,
) -> Result<T, E>
where
    A: Serialize + ?Sized,
    C: TelemetryContext + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: ReportableError,
{
    with_telemetry(event, resolver_data(args), ctx, operation).await
}

/// The `data` field of a resolver argument object, or the whole object when
/// it has none.
pub fn resolver_data<A: Serialize + ?Sized>(args: &A) -> Value {
    match serde_json::to_value(args) {
        Ok(Value::Object(mut map)) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Failed to serialize resolver arguments for telemetry");
            Value::Null
        }
    }
}
