pub mod client;

pub use client::{AnalyticsClient, CaptureEvent, PostHogClient};
