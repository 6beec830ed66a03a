//! Metrics collection and registry.

use crate::session::SessionStats;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Prometheus metrics registry for capture sessions.
pub struct MetricsRegistry {
    registry: Registry,

    // Device metrics
    device_opens: IntCounter,
    device_releases: IntCounter,
    devices_open: IntGauge,
    preview_starts: IntCounter,

    // Capture metrics
    captures_started: IntCounter,
    captures_completed: IntCounter,
    captures_failed: IntCounter,
    captures_ignored: IntCounter,
}

impl MetricsRegistry {
    /// Creates a new registry with all session metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let device_opens = IntCounter::new(
            "camera_session_device_opens_total",
            "Total camera handles opened",
        )?;
        let device_releases = IntCounter::new(
            "camera_session_device_releases_total",
            "Total camera handles released",
        )?;
        let devices_open = IntGauge::new(
            "camera_session_devices_open",
            "Camera handles currently held",
        )?;
        let preview_starts = IntCounter::new(
            "camera_session_preview_starts_total",
            "Total successful preview starts, including resumes after capture",
        )?;

        let captures_started = IntCounter::new(
            "camera_session_captures_started_total",
            "Total capture attempts accepted",
        )?;
        let captures_completed = IntCounter::new(
            "camera_session_captures_completed_total",
            "Total captures that produced a finished image",
        )?;
        let captures_failed = IntCounter::new(
            "camera_session_captures_failed_total",
            "Total captures that ended without an image",
        )?;
        let captures_ignored = IntCounter::new(
            "camera_session_captures_ignored_total",
            "Total capture requests ignored (closed or already capturing)",
        )?;

        registry.register(Box::new(device_opens.clone()))?;
        registry.register(Box::new(device_releases.clone()))?;
        registry.register(Box::new(devices_open.clone()))?;
        registry.register(Box::new(preview_starts.clone()))?;
        registry.register(Box::new(captures_started.clone()))?;
        registry.register(Box::new(captures_completed.clone()))?;
        registry.register(Box::new(captures_failed.clone()))?;
        registry.register(Box::new(captures_ignored.clone()))?;

        Ok(Self {
            registry,
            device_opens,
            device_releases,
            devices_open,
            preview_starts,
            captures_started,
            captures_completed,
            captures_failed,
            captures_ignored,
        })
    }

    /// Brings all metrics up to a session snapshot.
    ///
    /// Counters only ever move forward, so they are advanced by the difference.
    pub fn update(&self, stats: &SessionStats) {
        advance(&self.device_opens, stats.device_opens);
        advance(&self.device_releases, stats.device_releases);
        advance(&self.preview_starts, stats.preview_starts);
        advance(&self.captures_started, stats.captures_started);
        advance(&self.captures_completed, stats.captures_completed);
        advance(&self.captures_failed, stats.captures_failed);
        advance(&self.captures_ignored, stats.captures_ignored);

        let open = stats.device_opens.saturating_sub(stats.device_releases);
        self.devices_open.set(open as i64);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn advance(counter: &IntCounter, total: u64) {
    let current = counter.get();
    if total > current {
        counter.inc_by(total - current);
    }
}
