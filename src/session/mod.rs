//! Capture session lifecycle.
//!
//! Ties the pieces together: camera selection, settings negotiation, the
//! surface attach/detach state machine, and the single-flight capture
//! protocol (focus, capture, finish off-thread, resume preview).

mod config;
mod controller;
mod error;
mod executor;
mod settings;


pub use config::{ConfigError, FileConfig, FocusGate, OutputConfig, RotationSource, SessionOptions};
pub use controller::{CameraSession, CaptureCallback, SessionState, SessionStats};
pub use error::SessionError;
pub use executor::{Executor, InlineExecutor, Job};
pub use settings::{CameraIdentity, CameraSettings};
