//! Camera selection and per-open settings.

use super::config::SessionOptions;
use super::error::SessionError;
use crate::device::{CameraInfo, Capabilities, DeviceParameters, FlashMode, FocusMode};
use crate::geometry::{
    compute_orientation, negotiate_any, AspectMode, Facing, Rotation, Size, SizeCandidate,
};

/// The camera a session is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraIdentity {
    pub index: u32,
    pub facing: Facing,
    pub sensor_orientation: Rotation,
    /// Number of cameras the device reported.
    pub camera_count: usize,
}

impl CameraIdentity {
    /// First camera with the wanted facing, in reported order.
    pub fn find(cameras: &[CameraInfo], facing: Facing) -> Option<Self> {
        let found = cameras.iter().find(|info| info.facing == facing)?;
        tracing::debug!(index = found.index, %facing, "Found camera");
        Some(Self {
            index: found.index,
            facing,
            sensor_orientation: found.orientation,
            camera_count: cameras.len(),
        })
    }
}

/// Settings resolved for one camera open.
///
/// Never mutated; a change of facing, ratio or screen rotation produces a
/// new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraSettings {
    pub identity: CameraIdentity,
    /// `Auto` when the device lists it, otherwise left at the driver default.
    pub flash_mode: Option<FlashMode>,
    /// `Auto` when the device lists it, otherwise left at the driver default.
    pub focus_mode: Option<FocusMode>,
    /// The ratio that produced `sizes`.
    pub aspect: AspectMode,
    pub sizes: SizeCandidate,
    pub display_rotation: Rotation,
    pub picture_rotation: Rotation,
    pub mirror: bool,
}

impl CameraSettings {
    /// Negotiates settings from what an open device reported.
    pub fn resolve(
        identity: CameraIdentity,
        capabilities: &Capabilities,
        options: &SessionOptions,
        display: Rotation,
    ) -> Result<Self, SessionError> {
        let flash_mode = capabilities
            .flash_modes
            .contains(&FlashMode::Auto)
            .then_some(FlashMode::Auto);
        let focus_mode = capabilities
            .focus_modes
            .contains(&FocusMode::Auto)
            .then_some(FocusMode::Auto);

        let (aspect, sizes) = negotiate_any(
            &capabilities.preview_sizes,
            &capabilities.picture_sizes,
            &options.aspect_ratios,
            &options.size_policy,
        )
        .ok_or_else(|| {
            tracing::error!(
                ratios = ?options.aspect_ratios,
                previews = capabilities.preview_sizes.len(),
                pictures = capabilities.picture_sizes.len(),
                "No size matches any requested aspect ratio"
            );
            SessionError::UnsupportedConfiguration
        })?;

        let orientation = compute_orientation(identity.sensor_orientation, display, identity.facing);

        let settings = Self {
            identity,
            flash_mode,
            focus_mode,
            aspect,
            sizes,
            display_rotation: orientation.display,
            picture_rotation: orientation.picture,
            mirror: orientation.mirror,
        };
        tracing::debug!(?settings, "Resolved camera settings");
        Ok(settings)
    }

    /// Same camera and sizes, reoriented for a new screen rotation.
    pub fn reoriented(&self, display: Rotation) -> Self {
        let orientation =
            compute_orientation(self.identity.sensor_orientation, display, self.identity.facing);
        Self {
            display_rotation: orientation.display,
            picture_rotation: orientation.picture,
            mirror: orientation.mirror,
            ..*self
        }
    }

    /// Parameter block pushed to the device.
    pub fn parameters(&self) -> DeviceParameters {
        DeviceParameters {
            flash_mode: self.flash_mode,
            focus_mode: self.focus_mode,
            preview_size: self.sizes.preview,
            picture_size: self.sizes.picture,
            rotation: self.picture_rotation,
        }
    }

    /// True when a focus request should precede capture.
    pub fn can_auto_focus(&self) -> bool {
        self.focus_mode.is_some_and(FocusMode::supports_focus_request)
    }

    /// Preview size as it appears on screen: transposed when the preview is
    /// turned a quarter.
    pub fn displayed_preview(&self) -> Size {
        if self.display_rotation.is_transposing() {
            self.sizes.preview.transposed()
        } else {
            self.sizes.preview
        }
    }
}
