//! Camera device abstraction.
//!
//! Platform camera stacks are consumed through a small capability
//! interface. A mock backend is included for tests and the demo binary.

mod backend;
mod mock;

pub use backend::{
    CameraBackend, CameraDevice, CameraInfo, Capabilities, DeviceError, DeviceParameters,
    FlashMode, FocusCallback, FocusMode, PictureCallback,
};
pub use mock::{MockBackend, MockCounters, MockDevice, MockFaults, MockProbe, MockSurface};
