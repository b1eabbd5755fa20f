pub mod posthog;
