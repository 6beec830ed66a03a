//! In-process camera backend.
//!
//! Behaves like a small phone camera stack: a back and a front camera,
//! phone-like size lists, JPEG stills tagged with the requested rotation.
//! Every primitive is counted and can be made to fail, which is what the
//! session tests are built on.

use super::backend::{
    CameraBackend, CameraDevice, CameraInfo, Capabilities, DeviceError, DeviceParameters,
    FlashMode, FocusCallback, FocusMode, PictureCallback,
};
use crate::geometry::{Facing, Rotation, Size};
use crate::postprocess::with_orientation;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, Rgb, RgbImage};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Surface handle used with the mock backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockSurface {
    pub id: u32,
}

/// Failure injection and callback behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockFaults {
    pub fail_open: bool,
    pub fail_capabilities: bool,
    pub fail_set_parameters: bool,
    pub fail_start_preview: bool,
    pub fail_stop_preview: bool,
    pub fail_release: bool,
    pub fail_auto_focus: bool,
    pub fail_take_picture: bool,
    /// Value reported to autofocus callbacks.
    pub focus_success: bool,
    /// Keep focus callbacks until [`MockProbe::fire_focus`].
    pub hold_focus: bool,
    /// Keep picture callbacks until [`MockProbe::fire_picture`].
    pub hold_picture: bool,
    /// Deliver bytes that are not an image.
    pub corrupt_picture: bool,
}

impl Default for MockFaults {
    fn default() -> Self {
        Self {
            fail_open: false,
            fail_capabilities: false,
            fail_set_parameters: false,
            fail_start_preview: false,
            fail_stop_preview: false,
            fail_release: false,
            fail_auto_focus: false,
            fail_take_picture: false,
            focus_success: true,
            hold_focus: false,
            hold_picture: false,
            corrupt_picture: false,
        }
    }
}

/// Call counters, snapshot by [`MockProbe::counters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockCounters {
    pub opens: u32,
    pub releases: u32,
    pub preview_starts: u32,
    pub preview_stops: u32,
    pub focus_requests: u32,
    pub picture_requests: u32,
    /// Handles opened and not yet released.
    pub open_handles: u32,
    /// Highest `open_handles` ever reached.
    pub max_open_handles: u32,
}

#[derive(Default)]
struct MockState {
    faults: MockFaults,
    counters: MockCounters,
    display_rotation: Rotation,
    parameters: Vec<DeviceParameters>,
    display_orientations: Vec<Rotation>,
    bound_surface: Option<MockSurface>,
    held_focus: Option<FocusCallback>,
    held_picture: Option<(PictureCallback, Vec<u8>)>,
}

/// Shared view into the mock's state, for tests and the demo.
#[derive(Clone, Default)]
pub struct MockProbe {
    state: Arc<Mutex<MockState>>,
}

impl MockProbe {
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn counters(&self) -> MockCounters {
        self.state().counters
    }

    pub fn faults(&self) -> MockFaults {
        self.state().faults
    }

    pub fn set_faults(&self, faults: MockFaults) {
        self.state().faults = faults;
    }

    pub fn update_faults(&self, update: impl FnOnce(&mut MockFaults)) {
        update(&mut self.state().faults);
    }

    pub fn set_display_rotation(&self, rotation: Rotation) {
        self.state().display_rotation = rotation;
    }

    /// Parameter blocks pushed so far, oldest first.
    pub fn parameters(&self) -> Vec<DeviceParameters> {
        self.state().parameters.clone()
    }

    pub fn display_orientations(&self) -> Vec<Rotation> {
        self.state().display_orientations.clone()
    }

    pub fn bound_surface(&self) -> Option<MockSurface> {
        self.state().bound_surface
    }

    /// Completes a held autofocus request. Returns false if none was held.
    pub fn fire_focus(&self, success: bool) -> bool {
        // Taken out first so the callback never runs under the lock.
        let held = self.state().held_focus.take();
        match held {
            Some(done) => {
                done(success);
                true
            }
            None => false,
        }
    }

    /// Completes a held picture request. Returns false if none was held.
    pub fn fire_picture(&self) -> bool {
        let held = self.state().held_picture.take();
        match held {
            Some((done, data)) => {
                done(data);
                true
            }
            None => false,
        }
    }
}

/// Camera backend backed by [`MockDevice`]s.
#[derive(Clone)]
pub struct MockBackend {
    cameras: Vec<CameraInfo>,
    capabilities: Capabilities,
    probe: MockProbe,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// A back camera mounted at 90° and a front camera at 270°.
    pub fn new() -> Self {
        Self {
            cameras: vec![
                CameraInfo {
                    index: 0,
                    facing: Facing::Back,
                    orientation: Rotation::Deg90,
                },
                CameraInfo {
                    index: 1,
                    facing: Facing::Front,
                    orientation: Rotation::Deg270,
                },
            ],
            capabilities: Self::phone_capabilities(),
            probe: MockProbe::default(),
        }
    }

    pub fn with_cameras(mut self, cameras: Vec<CameraInfo>) -> Self {
        self.cameras = cameras;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn probe(&self) -> MockProbe {
        self.probe.clone()
    }

    fn phone_capabilities() -> Capabilities {
        let sizes = |list: &[(u32, u32)]| -> Vec<Size> {
            list.iter().map(|&(w, h)| Size::new(w, h)).collect()
        };
        Capabilities {
            flash_modes: vec![FlashMode::Off, FlashMode::Auto, FlashMode::On, FlashMode::Torch],
            focus_modes: vec![FocusMode::Auto, FocusMode::ContinuousPicture, FocusMode::Infinity],
            preview_sizes: sizes(&[
                (1920, 1080),
                (1440, 1080),
                (1280, 720),
                (960, 720),
                (720, 720),
                (640, 480),
            ]),
            picture_sizes: sizes(&[
                (3264, 2448),
                (2592, 1944),
                (2048, 1536),
                (1920, 1080),
                (1600, 1200),
                (1440, 1440),
                (1280, 720),
            ]),
        }
    }
}

impl CameraBackend for MockBackend {
    type Device = MockDevice;

    fn cameras(&self) -> Result<Vec<CameraInfo>, DeviceError> {
        Ok(self.cameras.clone())
    }

    fn open(&self, index: u32) -> Result<MockDevice, DeviceError> {
        let mut state = self.probe.state();
        if state.faults.fail_open || !self.cameras.iter().any(|c| c.index == index) {
            return Err(DeviceError::Unavailable(index));
        }
        let counters = &mut state.counters;
        counters.opens += 1;
        counters.open_handles += 1;
        counters.max_open_handles = counters.max_open_handles.max(counters.open_handles);
        tracing::debug!(index, "MockBackend opened camera");

        Ok(MockDevice {
            index,
            capabilities: self.capabilities.clone(),
            parameters: None,
            released: false,
            probe: self.probe.clone(),
        })
    }

    fn display_rotation(&self) -> Rotation {
        self.probe.state().display_rotation
    }
}

/// One open mock camera.
pub struct MockDevice {
    index: u32,
    capabilities: Capabilities,
    parameters: Option<DeviceParameters>,
    released: bool,
    probe: MockProbe,
}

impl MockDevice {
    fn check_open(&self) -> Result<(), DeviceError> {
        if self.released {
            Err(DeviceError::Disconnected)
        } else {
            Ok(())
        }
    }

    /// JPEG at the configured picture size, tagged with the configured rotation.
    /// The left half is red, the right half blue.
    fn render_still(&self) -> Result<Vec<u8>, DeviceError> {
        let (size, rotation) = self
            .parameters
            .map(|p| (p.picture_size, p.rotation))
            .unwrap_or((Size::new(64, 48), Rotation::Deg0));

        let half = size.width / 2;
        let frame = RgbImage::from_fn(size.width, size.height, |x, _| {
            if x < half {
                Rgb([220, 30, 30])
            } else {
                Rgb([30, 30, 220])
            }
        });

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, 90)
            .encode(
                frame.as_raw(),
                frame.width(),
                frame.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| DeviceError::Rejected(e.to_string()))?;

        Ok(with_orientation(&jpeg, rotation))
    }
}

impl CameraDevice for MockDevice {
    type Surface = MockSurface;

    fn capabilities(&self) -> Result<Capabilities, DeviceError> {
        self.check_open()?;
        if self.probe.faults().fail_capabilities {
            return Err(DeviceError::Rejected("parameters unavailable".into()));
        }
        Ok(self.capabilities.clone())
    }

    fn set_parameters(&mut self, params: &DeviceParameters) -> Result<(), DeviceError> {
        self.check_open()?;
        let mut state = self.probe.state();
        if state.faults.fail_set_parameters {
            return Err(DeviceError::Rejected("setParameters failed".into()));
        }
        state.parameters.push(*params);
        self.parameters = Some(*params);
        Ok(())
    }

    fn set_display_orientation(&mut self, rotation: Rotation) -> Result<(), DeviceError> {
        self.check_open()?;
        self.probe.state().display_orientations.push(rotation);
        Ok(())
    }

    fn set_preview_surface(&mut self, surface: Option<&MockSurface>) -> Result<(), DeviceError> {
        self.check_open()?;
        self.probe.state().bound_surface = surface.copied();
        Ok(())
    }

    fn start_preview(&mut self) -> Result<(), DeviceError> {
        self.check_open()?;
        let mut state = self.probe.state();
        state.counters.preview_starts += 1;
        if state.faults.fail_start_preview {
            return Err(DeviceError::Busy);
        }
        Ok(())
    }

    fn stop_preview(&mut self) -> Result<(), DeviceError> {
        self.check_open()?;
        let mut state = self.probe.state();
        state.counters.preview_stops += 1;
        if state.faults.fail_stop_preview {
            return Err(DeviceError::Busy);
        }
        Ok(())
    }

    fn auto_focus(&mut self, done: FocusCallback) -> Result<(), DeviceError> {
        self.check_open()?;
        let mut state = self.probe.state();
        state.counters.focus_requests += 1;
        if state.faults.fail_auto_focus {
            return Err(DeviceError::Rejected("autoFocus failed".into()));
        }
        if state.faults.hold_focus {
            state.held_focus = Some(done);
            return Ok(());
        }
        let success = state.faults.focus_success;
        drop(state);
        done(success);
        Ok(())
    }

    fn take_picture(&mut self, done: PictureCallback) -> Result<(), DeviceError> {
        self.check_open()?;
        let faults = {
            let mut state = self.probe.state();
            state.counters.picture_requests += 1;
            state.faults
        };
        if faults.fail_take_picture {
            return Err(DeviceError::Rejected("takePicture failed".into()));
        }

        let data = if faults.corrupt_picture {
            b"\xFF\xD8 truncated".to_vec()
        } else {
            self.render_still()?
        };

        if faults.hold_picture {
            self.probe.state().held_picture = Some((done, data));
        } else {
            done(data);
        }
        Ok(())
    }

    fn release(&mut self) -> Result<(), DeviceError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        let mut state = self.probe.state();
        state.counters.releases += 1;
        state.counters.open_handles = state.counters.open_handles.saturating_sub(1);
        state.bound_surface = None;
        tracing::debug!(index = self.index, "MockDevice released");
        if state.faults.fail_release {
            return Err(DeviceError::Disconnected);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::postprocess::read_rotation;

    #[test]
    fn test_mock_device_lifecycle() {
        let backend = MockBackend::new();
        let probe = backend.probe();

        let mut device = backend.open(0).unwrap();
        assert_eq!(probe.counters().open_handles, 1);

        device.start_preview().unwrap();
        device.stop_preview().unwrap();
        device.release().unwrap();
        device.release().unwrap();

        let _second = backend.open(1).unwrap();
        let counters = probe.counters();
        assert_eq!(counters.releases, 1);
        assert_eq!(counters.open_handles, 1);
        assert_eq!(counters.max_open_handles, 1);
        assert!(matches!(device.start_preview(), Err(DeviceError::Disconnected)));
    }

    #[test]
    fn test_unknown_index_unavailable() {
        let backend = MockBackend::new();
        assert!(matches!(backend.open(7), Err(DeviceError::Unavailable(7))));
    }

    #[test]
    fn test_still_carries_rotation_tag() {
        let backend = MockBackend::new();
        let mut device = backend.open(0).unwrap();
        device
            .set_parameters(&DeviceParameters {
                flash_mode: None,
                focus_mode: None,
                preview_size: Size::new(32, 24),
                picture_size: Size::new(32, 24),
                rotation: Rotation::Deg270,
            })
            .unwrap();

        let captured = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&captured);
        device
            .take_picture(Box::new(move |data| *sink.lock().unwrap() = data))
            .unwrap();

        let data = captured.lock().unwrap().clone();
        assert_eq!(read_rotation(&data), Rotation::Deg270);
        let decoded = image::load_from_memory(&data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 24));
    }

    #[test]
    fn test_held_focus_fires_once() {
        let backend = MockBackend::new();
        let probe = backend.probe();
        probe.update_faults(|f| f.hold_focus = true);

        let mut device = backend.open(0).unwrap();
        let hits = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&hits);
        device
            .auto_focus(Box::new(move |_| *counter.lock().unwrap() += 1))
            .unwrap();

        assert_eq!(*hits.lock().unwrap(), 0);
        assert!(probe.fire_focus(true));
        assert!(!probe.fire_focus(true));
        assert_eq!(*hits.lock().unwrap(), 1);
    }
}
