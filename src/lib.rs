//! Camera Capture Session Library
//!
//! Binds a live camera to a preview surface, negotiates preview and picture
//! sizes for a requested aspect ratio, computes the rotations that keep the
//! preview and the saved still upright, and serializes still captures
//! against the running preview.
//!
//! # Architecture
//!
//! ```text
//! surface events ─▶ session ─▶ geometry (sizes, rotation)
//!                      │
//!                      ├─▶ device (focus, capture)  ─┐
//!                      │                             │ events
//!                      └─◀ postprocess (worker)  ◀───┘
//! ```
//!
//! # Design Principles
//!
//! - **One control context**: every device call and state change happens on
//!   the thread that owns the session; driver callbacks and worker results
//!   come back as queued events
//! - **Single-flight capture**: one capture at a time, and every capture ends
//!   with exactly one preview resume
//! - **Best-effort teardown**: failing to release a camera never blocks
//!   opening the next one
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use camera_session::{
//!     device::{MockBackend, MockSurface},
//!     session::{CameraSession, InlineExecutor, SessionOptions},
//! };
//!
//! let mut session = CameraSession::new(
//!     MockBackend::new(),
//!     SessionOptions::default(),
//!     Arc::new(InlineExecutor),
//! )
//! .unwrap();
//!
//! session.attach_surface(&MockSurface { id: 1 }, 1080, 1920).unwrap();
//! let (width, height) = session.measure(1080, 2400);
//! assert!(width <= 1080 && height <= 2400);
//!
//! let accepted = session.take_picture(|result| {
//!     let jpeg = result.expect("capture failed");
//!     assert!(!jpeg.is_empty());
//! });
//! assert!(accepted);
//!
//! // Apply driver callbacks and the worker result on this thread.
//! session.dispatch_pending();
//! assert!(!session.is_picture_taking());
//! session.close();
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod device;
pub mod geometry;
pub mod metrics;
pub mod postprocess;
pub mod session;

// Re-export commonly used types at crate root
pub use device::{CameraBackend, CameraDevice, DeviceError};
pub use geometry::{AspectMode, AspectRatio, Facing, Rotation, Size, SizeCandidate, SizePolicy};
pub use postprocess::CaptureFinisher;
pub use session::{CameraSession, SessionError, SessionOptions, SessionState};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
