//! Camera device capability interface.
//!
//! The session core never talks to a driver directly. A platform binding
//! implements [`CameraBackend`] (enumeration and open) and [`CameraDevice`]
//! (one open handle), and the session drives those primitives.

use crate::geometry::{Facing, Rotation, Size};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invoked by the driver, on its own thread, when autofocus settles.
pub type FocusCallback = Box<dyn FnOnce(bool) + Send + 'static>;

/// Invoked by the driver, on its own thread, with the encoded still.
pub type PictureCallback = Box<dyn FnOnce(Vec<u8>) + Send + 'static>;

/// Errors reported by a camera driver.
#[derive(Debug, Clone, Error)]
pub enum DeviceError {
    #[error("camera {0} is unavailable")]
    Unavailable(u32),
    #[error("camera is busy")]
    Busy,
    #[error("camera disconnected")]
    Disconnected,
    #[error("driver rejected request: {0}")]
    Rejected(String),
}

/// What the platform reports about one camera before opening it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraInfo {
    /// Index in device-reported order.
    pub index: u32,
    pub facing: Facing,
    /// Fixed mount angle of the sensor.
    pub orientation: Rotation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlashMode {
    Off,
    Auto,
    On,
    RedEye,
    Torch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FocusMode {
    Auto,
    Infinity,
    Macro,
    Fixed,
    Edof,
    ContinuousPicture,
    ContinuousVideo,
}

impl FocusMode {
    /// Only the one-shot auto mode accepts an explicit focus request.
    #[inline]
    pub fn supports_focus_request(self) -> bool {
        self == FocusMode::Auto
    }
}

/// Modes and sizes an open device supports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub flash_modes: Vec<FlashMode>,
    pub focus_modes: Vec<FocusMode>,
    pub preview_sizes: Vec<Size>,
    pub picture_sizes: Vec<Size>,
}

/// The parameter block pushed to a device before preview starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceParameters {
    pub flash_mode: Option<FlashMode>,
    pub focus_mode: Option<FocusMode>,
    pub preview_size: Size,
    pub picture_size: Size,
    /// Rotation the driver should record for stills.
    pub rotation: Rotation,
}

/// Enumerates and opens cameras.
pub trait CameraBackend {
    type Device: CameraDevice;

    /// Lists cameras in device-reported index order.
    fn cameras(&self) -> Result<Vec<CameraInfo>, DeviceError>;

    /// Opens the camera at `index`.
    fn open(&self, index: u32) -> Result<Self::Device, DeviceError>;

    /// Current rotation of the screen the preview is shown on.
    fn display_rotation(&self) -> Rotation;
}

/// One open camera handle.
///
/// Callbacks passed to [`auto_focus`](CameraDevice::auto_focus) and
/// [`take_picture`](CameraDevice::take_picture) may run on any thread and
/// must not assume they are on the caller's.
pub trait CameraDevice {
    /// Platform surface the preview renders into.
    type Surface: Clone;

    fn capabilities(&self) -> Result<Capabilities, DeviceError>;

    fn set_parameters(&mut self, params: &DeviceParameters) -> Result<(), DeviceError>;

    fn set_display_orientation(&mut self, rotation: Rotation) -> Result<(), DeviceError>;

    /// Binds or, with `None`, unbinds the preview surface.
    fn set_preview_surface(&mut self, surface: Option<&Self::Surface>) -> Result<(), DeviceError>;

    fn start_preview(&mut self) -> Result<(), DeviceError>;

    fn stop_preview(&mut self) -> Result<(), DeviceError>;

    fn auto_focus(&mut self, done: FocusCallback) -> Result<(), DeviceError>;

    /// Captures one still. The driver stops the preview while doing so.
    fn take_picture(&mut self, done: PictureCallback) -> Result<(), DeviceError>;

    fn release(&mut self) -> Result<(), DeviceError>;
}
