//! Capture session state machine.
//!
//! `CameraSession` owns the one open device handle, the resolved settings and
//! the picture-taking flag. It is driven from a single control context:
//! surface lifecycle calls and capture requests arrive as method calls, and
//! everything that completes elsewhere (driver callbacks, post-processing)
//! comes back as a [`ControlEvent`] on the session's queue, applied by
//! [`dispatch_pending`](CameraSession::dispatch_pending) or
//! [`dispatch_next`](CameraSession::dispatch_next).
//!
//! ```text
//! Closed ─open─▶ Opening ─▶ Configured ─attach─▶ Previewing ⇄ Capturing
//!    ▲                                               │
//!    └──────────────── detach / close ───────────────┘
//! ```

use super::config::{FocusGate, RotationSource, SessionOptions};
use super::error::SessionError;
use super::executor::Executor;
use super::settings::{CameraIdentity, CameraSettings};
use crate::device::{CameraBackend, CameraDevice, DeviceError};
use crate::geometry::Facing;
use crate::postprocess::{read_rotation, CaptureFinisher, FinishError};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

/// Receives the finished still, or why there is none.
pub type CaptureCallback = Box<dyn FnOnce(Result<Vec<u8>, SessionError>) + Send + 'static>;

type SurfaceOf<B> = <<B as CameraBackend>::Device as CameraDevice>::Surface;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Opening,
    Configured,
    Previewing,
    Capturing,
}

/// Something that completed off the control context.
#[derive(Debug)]
pub(crate) enum ControlEvent {
    FocusCompleted { attempt: u64, success: bool },
    PictureTaken { attempt: u64, data: Vec<u8> },
    Finished {
        attempt: u64,
        result: Result<Vec<u8>, FinishError>,
    },
}

/// Running totals for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub device_opens: u64,
    pub device_releases: u64,
    pub preview_starts: u64,
    pub captures_started: u64,
    pub captures_completed: u64,
    pub captures_failed: u64,
    pub captures_ignored: u64,
}

struct PendingCapture {
    attempt: u64,
    on_result: CaptureCallback,
}

#[derive(Clone)]
struct AttachedSurface<S> {
    surface: S,
    width: u32,
    height: u32,
}

/// Binds one camera to one preview surface and serializes still captures.
pub struct CameraSession<B: CameraBackend> {
    backend: B,
    options: SessionOptions,
    facing: Facing,
    executor: Arc<dyn Executor>,
    finisher: CaptureFinisher,
    settings: Option<CameraSettings>,
    device: Option<B::Device>,
    surface: Option<AttachedSurface<SurfaceOf<B>>>,
    state: SessionState,
    picture_taking: bool,
    pending: Option<PendingCapture>,
    next_attempt: u64,
    events_tx: UnboundedSender<ControlEvent>,
    events_rx: UnboundedReceiver<ControlEvent>,
    stats: SessionStats,
}

impl<B: CameraBackend> CameraSession<B> {
    /// Creates a closed session. Options are validated here.
    pub fn new(
        backend: B,
        options: SessionOptions,
        executor: Arc<dyn Executor>,
    ) -> Result<Self, SessionError> {
        options.validate()?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let facing = if options.use_front_camera {
            Facing::Front
        } else {
            Facing::Back
        };

        Ok(Self {
            backend,
            finisher: CaptureFinisher::new(options.jpeg_quality),
            options,
            facing,
            executor,
            settings: None,
            device: None,
            surface: None,
            state: SessionState::Closed,
            picture_taking: false,
            pending: None,
            next_attempt: 1,
            events_tx,
            events_rx,
            stats: SessionStats::default(),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn settings(&self) -> Option<&CameraSettings> {
        self.settings.as_ref()
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// True from the capture request until its result has been delivered.
    pub fn is_picture_taking(&self) -> bool {
        self.picture_taking
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Selects the camera and negotiates settings.
    ///
    /// The device is opened only long enough to read its capabilities; the
    /// preview handle is acquired by [`attach_surface`](Self::attach_surface).
    pub fn open(&mut self) -> Result<&CameraSettings, SessionError> {
        self.release_device();
        self.state = SessionState::Opening;

        match self.resolve_settings(self.facing) {
            Ok(settings) => {
                self.state = SessionState::Configured;
                Ok(self.settings.insert(settings))
            }
            Err(e) => {
                self.state = SessionState::Closed;
                Err(e)
            }
        }
    }

    /// Binds the surface and starts the preview.
    ///
    /// Called when the surface becomes available and on every resize. Any
    /// bound device is released first; a zero-sized surface leaves the
    /// session closed.
    pub fn attach_surface(
        &mut self,
        surface: &SurfaceOf<B>,
        width: u32,
        height: u32,
    ) -> Result<(), SessionError> {
        info!(width, height, "Attaching preview surface");
        self.release_device();

        if width == 0 || height == 0 {
            warn!(width, height, "Ignoring surface with invalid size");
            return Ok(());
        }

        let display = self.backend.display_rotation();
        let settings = match self.settings {
            Some(settings) => settings.reoriented(display),
            None => self.resolve_settings(self.facing)?,
        };

        self.state = SessionState::Opening;
        let mut device = match self.backend.open(settings.identity.index) {
            Ok(device) => device,
            Err(e) => {
                error!(index = settings.identity.index, error = %e, "Failed to open camera");
                self.state = SessionState::Closed;
                return Err(SessionError::DeviceOpenFailed(e));
            }
        };
        self.stats.device_opens += 1;

        // Each step is attempted even if an earlier one failed.
        if let Err(e) = device.set_parameters(&settings.parameters()) {
            warn!(error = %e, "Device rejected parameters");
        }
        if let Err(e) = device.set_display_orientation(settings.display_rotation) {
            warn!(error = %e, "Failed to set display orientation");
        }
        self.settings = Some(settings);
        self.state = SessionState::Configured;

        if let Err(e) = device.set_preview_surface(Some(surface)) {
            warn!(error = %e, "Failed to bind preview surface");
        }
        if let Err(e) = device.start_preview() {
            error!(error = %e, "Failed to start preview");
            release_quietly(&mut device);
            self.stats.device_releases += 1;
            self.state = SessionState::Closed;
            return Err(SessionError::DeviceOpenFailed(e));
        }
        self.stats.preview_starts += 1;

        self.device = Some(device);
        self.surface = Some(AttachedSurface {
            surface: surface.clone(),
            width,
            height,
        });
        self.state = SessionState::Previewing;
        info!(
            index = settings.identity.index,
            facing = %settings.identity.facing,
            preview = %settings.sizes.preview,
            picture = %settings.sizes.picture,
            display_rotation = %settings.display_rotation,
            "Preview started"
        );
        Ok(())
    }

    /// Releases the device when the surface is destroyed.
    pub fn detach_surface(&mut self) {
        info!("Detaching preview surface");
        self.release_device();
        self.surface = None;
    }

    /// Caller-facing close; same as losing the surface.
    pub fn close(&mut self) {
        self.detach_surface();
    }

    /// Constrains a requested box to the negotiated preview ratio.
    ///
    /// Keeps the dimension that fits and shrinks the other. Passes the
    /// request through until settings are resolved.
    pub fn measure(&self, width: u32, height: u32) -> (u32, u32) {
        let Some(settings) = &self.settings else {
            return (width, height);
        };
        if width == 0 || height == 0 {
            return (width, height);
        }

        let aspect = settings.displayed_preview();
        if aspect.is_empty() {
            return (width, height);
        }
        let (aw, ah) = (u64::from(aspect.width), u64::from(aspect.height));
        let (w, h) = (u64::from(width), u64::from(height));

        if w * ah < h * aw {
            (width, (w * ah / aw) as u32)
        } else {
            ((h * aw / ah) as u32, height)
        }
    }

    /// Requests a still capture.
    ///
    /// Returns false, without invoking `on_result`, when no preview is
    /// running or a capture is already in flight. Otherwise `on_result` is
    /// invoked exactly once from the control context.
    pub fn take_picture(
        &mut self,
        on_result: impl FnOnce(Result<Vec<u8>, SessionError>) + Send + 'static,
    ) -> bool {
        self.try_take_picture(Box::new(on_result)).is_ok()
    }

    /// Like [`take_picture`](Self::take_picture), reporting an ignored
    /// request as [`SessionError::CaptureIgnored`].
    pub fn try_take_picture(&mut self, on_result: CaptureCallback) -> Result<(), SessionError> {
        if self.picture_taking || self.device.is_none() || self.state != SessionState::Previewing {
            debug!(
                state = ?self.state,
                picture_taking = self.picture_taking,
                "Capture request ignored"
            );
            self.stats.captures_ignored += 1;
            return Err(SessionError::CaptureIgnored);
        }
        let Some(settings) = self.settings else {
            self.stats.captures_ignored += 1;
            return Err(SessionError::CaptureIgnored);
        };

        let attempt = self.next_attempt;
        self.next_attempt += 1;
        self.picture_taking = true;
        self.state = SessionState::Capturing;
        self.pending = Some(PendingCapture { attempt, on_result });
        self.stats.captures_started += 1;
        info!(attempt, "Capture started");

        if !settings.can_auto_focus() {
            // Fixed or continuous focus: nothing to wait for.
            self.on_focus_completed(attempt, true);
            return Ok(());
        }

        let tx = self.events_tx.clone();
        let requested = match self.device.as_mut() {
            Some(device) => device.auto_focus(Box::new(move |success| {
                let _ = tx.send(ControlEvent::FocusCompleted { attempt, success });
            })),
            None => Err(DeviceError::Disconnected),
        };
        if let Err(e) = requested {
            error!(attempt, error = %e, "Autofocus request failed");
            self.finish_capture(attempt, Err(SessionError::CaptureFailed(e)));
        }
        Ok(())
    }

    /// Switches between front and back cameras and restarts the preview on
    /// the current surface.
    pub fn switch_camera(&mut self) -> Result<Facing, SessionError> {
        if !self.options.can_switch_camera || self.picture_taking {
            return Err(SessionError::SwitchNotAllowed);
        }

        let target = self.facing.opposite();
        let attached = self.surface.clone();
        self.release_device();

        match self.resolve_settings(target) {
            Ok(settings) => {
                info!(from = %self.facing, to = %target, "Switching camera");
                self.facing = target;
                self.settings = Some(settings);
            }
            Err(e) => {
                warn!(to = %target, error = %e, "Camera switch failed, restoring previous camera");
                if let Some(attached) = attached {
                    self.attach_surface(&attached.surface, attached.width, attached.height)?;
                }
                return Err(e);
            }
        }

        match attached {
            Some(attached) => {
                self.attach_surface(&attached.surface, attached.width, attached.height)?
            }
            None => self.state = SessionState::Configured,
        }
        Ok(self.facing)
    }

    /// Applies every queued event. Returns how many were applied.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.dispatch(event);
            applied += 1;
        }
        applied
    }

    /// Waits for one event and applies it.
    pub async fn dispatch_next(&mut self) {
        // The session holds a sender itself, so the queue never closes.
        if let Some(event) = self.events_rx.recv().await {
            self.dispatch(event);
        }
    }

    fn dispatch(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::FocusCompleted { attempt, success } => {
                self.on_focus_completed(attempt, success)
            }
            ControlEvent::PictureTaken { attempt, data } => self.on_picture_taken(attempt, data),
            ControlEvent::Finished { attempt, result } => {
                self.finish_capture(attempt, result.map_err(SessionError::PostProcessFailed))
            }
        }
    }

    fn is_current(&self, attempt: u64) -> bool {
        let current = self.pending.as_ref().is_some_and(|p| p.attempt == attempt);
        if !current {
            debug!(attempt, "Dropping event for a finished capture");
        }
        current
    }

    fn on_focus_completed(&mut self, attempt: u64, success: bool) {
        if !self.is_current(attempt) {
            return;
        }
        if !success {
            if self.options.focus_gate == FocusGate::RequireSuccess {
                warn!(attempt, "Autofocus failed, aborting capture");
                self.finish_capture(attempt, Err(SessionError::FocusFailed));
                return;
            }
            debug!(attempt, "Autofocus reported failure, capturing anyway");
        }

        let tx = self.events_tx.clone();
        let requested = match self.device.as_mut() {
            Some(device) => device.take_picture(Box::new(move |data| {
                let _ = tx.send(ControlEvent::PictureTaken { attempt, data });
            })),
            None => Err(DeviceError::Disconnected),
        };
        if let Err(e) = requested {
            error!(attempt, error = %e, "Picture request failed");
            self.finish_capture(attempt, Err(SessionError::CaptureFailed(e)));
        }
    }

    fn on_picture_taken(&mut self, attempt: u64, data: Vec<u8>) {
        if !self.is_current(attempt) {
            return;
        }
        let Some(settings) = self.settings else {
            self.finish_capture(attempt, Err(SessionError::SessionClosed));
            return;
        };
        debug!(attempt, bytes = data.len(), "Picture taken, finishing off the control context");

        let source = self.options.rotation_source;
        let finisher = self.finisher;
        let tx = self.events_tx.clone();
        self.executor.execute(Box::new(move || {
            let rotation = match source {
                RotationSource::Exif => read_rotation(&data),
                RotationSource::Computed => settings.picture_rotation,
            };
            let result = finisher.finish(&data, rotation, settings.mirror);
            drop(data);
            let _ = tx.send(ControlEvent::Finished { attempt, result });
        }));
    }

    /// Ends a capture: resumes the preview, clears the flag, then reports.
    fn finish_capture(&mut self, attempt: u64, result: Result<Vec<u8>, SessionError>) {
        let pending = match self.pending.take() {
            Some(pending) if pending.attempt == attempt => pending,
            other => {
                self.pending = other;
                return;
            }
        };

        if let Some(device) = self.device.as_mut() {
            match device.start_preview() {
                Ok(()) => self.stats.preview_starts += 1,
                Err(e) => warn!(attempt, error = %e, "Failed to resume preview"),
            }
            self.state = SessionState::Previewing;
        }
        self.picture_taking = false;

        match &result {
            Ok(data) => {
                self.stats.captures_completed += 1;
                info!(attempt, bytes = data.len(), "Capture completed");
            }
            Err(e) => {
                self.stats.captures_failed += 1;
                warn!(attempt, error = %e, "Capture failed");
            }
        }
        (pending.on_result)(result);
    }

    /// Opens the camera for `facing` just long enough to read its capabilities.
    fn resolve_settings(&mut self, facing: Facing) -> Result<CameraSettings, SessionError> {
        let cameras = self
            .backend
            .cameras()
            .map_err(SessionError::DeviceOpenFailed)?;
        let identity =
            CameraIdentity::find(&cameras, facing).ok_or(SessionError::DeviceNotFound { facing })?;

        let mut device = self.backend.open(identity.index).map_err(|e| {
            error!(index = identity.index, error = %e, "Failed to open camera");
            SessionError::DeviceOpenFailed(e)
        })?;
        self.stats.device_opens += 1;

        let capabilities = device.capabilities();
        release_quietly(&mut device);
        self.stats.device_releases += 1;

        let capabilities = capabilities.map_err(SessionError::DeviceOpenFailed)?;
        CameraSettings::resolve(
            identity,
            &capabilities,
            &self.options,
            self.backend.display_rotation(),
        )
    }

    /// Drops the device handle, abandoning any capture in flight.
    fn release_device(&mut self) {
        if let Some(mut device) = self.device.take() {
            release_quietly(&mut device);
            self.stats.device_releases += 1;
            info!("Camera released");
        }

        if let Some(pending) = self.pending.take() {
            warn!(attempt = pending.attempt, "Camera released during capture");
            self.picture_taking = false;
            self.stats.captures_failed += 1;
            (pending.on_result)(Err(SessionError::SessionClosed));
        }
        self.state = SessionState::Closed;
    }
}

impl<B: CameraBackend> Drop for CameraSession<B> {
    fn drop(&mut self) {
        self.release_device();
    }
}

/// Stop, unbind, release. Each step is attempted regardless of the others.
fn release_quietly<D: CameraDevice>(device: &mut D) {
    if let Err(e) = device.stop_preview() {
        warn!(error = %e, "stop_preview failed during release");
    }
    if let Err(e) = device.set_preview_surface(None) {
        warn!(error = %e, "Unbinding preview surface failed during release");
    }
    if let Err(e) = device.release() {
        warn!(error = %e, "release failed");
    }
}
