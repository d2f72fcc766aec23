//! Structured logging helpers, ported from the teacher's `tracing` setup.
//!
//! This crate never installs a subscriber itself — only binaries that
//! embed it should call [`init_tracing`]. Library code just emits
//! `tracing` events through the spans each core component opens via
//! `#[instrument]`.

use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::fmt;

/// Initialize a global `tracing` subscriber for a binary that embeds this
/// crate. `json` selects structured JSON output (production) vs. a
/// pretty human-readable format (local development).
pub fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let base = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_span_events(fmt::format::FmtSpan::CLOSE);

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(base.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(base.pretty())
            .init();
    }
}

/// Run a synchronous closure, logging a `warn!` if it takes longer than
/// `max`. Adapted from the teacher's `warn_if_slow` (which wraps a
/// `Future`) to a plain closure, since this crate has no async boundary
/// (§5: "no operation awaits I/O").
pub fn warn_if_slow<F, T>(label: &'static str, max: Duration, f: F) -> T
where
    F: FnOnce() -> T,
{
    let start = std::time::Instant::now();
    let out = f();
    let elapsed = start.elapsed();
    if elapsed > max {
        tracing::warn!(
            target: "performance",
            label = label,
            elapsed_us = elapsed.as_micros() as u64,
            "slow operation detected"
        );
    }
    out
}
