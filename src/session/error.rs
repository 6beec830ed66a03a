//! Session error taxonomy.

use super::config::ConfigError;
use crate::device::DeviceError;
use crate::geometry::Facing;
use crate::postprocess::FinishError;
use thiserror::Error;

/// Errors surfaced by [`CameraSession`](super::CameraSession).
///
/// Open and attach failures are returned synchronously. Capture failures are
/// delivered through the capture callback; teardown failures never surface.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no {facing} camera found")]
    DeviceNotFound { facing: Facing },
    #[error("failed to open camera: {0}")]
    DeviceOpenFailed(#[source] DeviceError),
    #[error("no supported size matches the requested aspect ratios")]
    UnsupportedConfiguration,
    #[error("capture ignored: no camera previewing or a capture is already in flight")]
    CaptureIgnored,
    #[error("capture post-processing failed: {0}")]
    PostProcessFailed(#[source] FinishError),
    #[error("capture failed: {0}")]
    CaptureFailed(#[source] DeviceError),
    #[error("autofocus did not converge")]
    FocusFailed,
    #[error("session closed before the capture completed")]
    SessionClosed,
    #[error("camera switching is not allowed right now")]
    SwitchNotAllowed,
    #[error("invalid session options: {0}")]
    Config(#[from] ConfigError),
}
