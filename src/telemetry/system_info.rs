use serde::Serialize;
use serde_json::{json, Value};

use super::TelemetryProperties;
use crate::config::TelemetryConfig;

pub const WREN_UI_VERSION: &str = "wren-ui-version";
pub const WREN_ENGINE_VERSION: &str = "wren-engine-version";
pub const WREN_AI_SERVICE_VERSION: &str = "wren-ai-service-version";
pub const GENERATION_MODEL: &str = "generation-model";
pub const RUNTIME_VERSION: &str = "runtime-version";
pub const RUNTIME_PLATFORM: &str = "runtime-platform";
pub const RUNTIME_ARCH: &str = "runtime-arch";
pub const MEMORY_USAGE: &str = "memory-usage";
pub const CPU_USAGE: &str = "cpu-usage";

pub const SYSTEM_INFO_KEYS: &[&str] = &[
    WREN_UI_VERSION,
    WREN_ENGINE_VERSION,
    WREN_AI_SERVICE_VERSION,
    GENERATION_MODEL,
    RUNTIME_VERSION,
    RUNTIME_PLATFORM,
    RUNTIME_ARCH,
    MEMORY_USAGE,
    CPU_USAGE,
];

#[cfg(target_os = "linux")]
const FALLBACK_PAGE_SIZE: u64 = 4096;
#[cfg(target_os = "linux")]
const FALLBACK_CLOCK_TICKS: u64 = 100;

/// Kernel page size in bytes; `statm` counts in these.
#[cfg(target_os = "linux")]
pub fn page_size() -> u64 {
    // SAFETY: sysconf has no preconditions.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as u64
    } else {
        FALLBACK_PAGE_SIZE
    }
}

/// USER_HZ; `stat` reports CPU times in these ticks.
#[cfg(target_os = "linux")]
pub fn clock_ticks_per_sec() -> u64 {
    // SAFETY: sysconf has no preconditions.
    let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ticks > 0 {
        ticks as u64
    } else {
        FALLBACK_CLOCK_TICKS
    }
}

/// Resident and virtual size of this process, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryUsage {
    pub rss: Option<u64>,
    #[serde(rename = "virtual")]
    pub virtual_size: Option<u64>,
}

/// CPU time consumed since process start, in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CpuUsage {
    pub user: Option<u64>,
    pub system: Option<u64>,
}

/// Snapshot of environment metadata attached to every event.
///
/// Every key in [`SYSTEM_INFO_KEYS`] is present; unset configuration values
/// become `null` so downstream schemas stay stable.
pub fn collect_system_info(config: &TelemetryConfig) -> TelemetryProperties {
    let mut info = TelemetryProperties::new();
    info.insert(WREN_UI_VERSION.into(), optional(&config.wren_ui_version));
    info.insert(WREN_ENGINE_VERSION.into(), optional(&config.wren_engine_version));
    info.insert(WREN_AI_SERVICE_VERSION.into(), optional(&config.wren_ai_version));
    info.insert(GENERATION_MODEL.into(), optional(&config.generation_model));
    info.insert(
        RUNTIME_VERSION.into(),
        json!(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"))),
    );
    info.insert(RUNTIME_PLATFORM.into(), json!(std::env::consts::OS));
    info.insert(RUNTIME_ARCH.into(), json!(std::env::consts::ARCH));
    info.insert(MEMORY_USAGE.into(), to_value(memory_usage()));
    info.insert(CPU_USAGE.into(), to_value(cpu_usage()));
    info
}

fn optional(value: &Option<String>) -> Value {
    value.as_ref().map_or(Value::Null, |v| Value::String(v.clone()))
}

fn to_value<T: Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

pub fn memory_usage() -> MemoryUsage {
    #[cfg(target_os = "linux")]
    {
        // /proc/self/statm: total and resident size, in pages
        let Ok(content) = std::fs::read_to_string("/proc/self/statm") else {
            return MemoryUsage::default();
        };
        let mut parts = content.split_whitespace().map(|s| s.parse::<u64>().ok());
        let virtual_pages = parts.next().flatten();
        let rss_pages = parts.next().flatten();
        let page = page_size();
        MemoryUsage {
            rss: rss_pages.map(|p| p * page),
            virtual_size: virtual_pages.map(|p| p * page),
        }
    }
    #[cfg(not(target_os = "linux"))]
    {
        MemoryUsage::default()
    }
}

pub fn cpu_usage() -> CpuUsage {
    #[cfg(target_os = "linux")]
    {
        let Ok(content) = std::fs::read_to_string("/proc/self/stat") else {
            return CpuUsage::default();
        };
        // comm may contain spaces, so fields are counted from the closing paren.
        // utime and stime are fields 14 and 15, i.e. 11 and 12 after it.
        let Some(rest) = content.rfind(')').map(|i| &content[i + 1..]) else {
            return CpuUsage::default();
        };
        let fields: Vec<&str> = rest.split_whitespace().collect();
        let hz = clock_ticks_per_sec();
        let ticks_to_micros = |idx: usize| {
            fields
                .get(idx)
                .and_then(|s| s.parse::<u64>().ok())
                .map(|t| t * 1_000_000 / hz)
        };
        CpuUsage {
            user: ticks_to_micros(11),
            system: ticks_to_micros(12),
        }
    }
    #[cfg(not(target_os = "linux"))]
    {
        CpuUsage::default()
    }
}
