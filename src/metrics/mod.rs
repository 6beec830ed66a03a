//! Prometheus metrics for capture sessions.
//!
//! # Metrics Exposed
//!
//! ## Device Metrics
//! - `camera_session_device_opens_total` - Camera handles opened
//! - `camera_session_device_releases_total` - Camera handles released
//! - `camera_session_devices_open` - Handles currently held
//! - `camera_session_preview_starts_total` - Preview starts and resumes
//!
//! ## Capture Metrics
//! - `camera_session_captures_started_total` - Accepted capture requests
//! - `camera_session_captures_completed_total` - Captures that produced an image
//! - `camera_session_captures_failed_total` - Captures that ended without one
//! - `camera_session_captures_ignored_total` - Requests ignored by the single-flight gate
//!
//! # Example
//!
//! ```
//! use camera_session::metrics::MetricsRegistry;
//! use camera_session::session::SessionStats;
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//! registry.update(&SessionStats::default());
//! assert!(registry.encode().unwrap().contains("camera_session_devices_open"));
//! ```

mod collector;

pub use collector::{MetricsError, MetricsRegistry};
