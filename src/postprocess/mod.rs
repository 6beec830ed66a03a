//! Post-processing of captured stills.
//!
//! Raw driver output is rarely what the user framed: the sensor is mounted
//! sideways and front cameras see a mirror image. This module reads the
//! rotation recorded in the still and produces the corrected JPEG.

mod exif_rotation;
mod finisher;

pub use exif_rotation::{read_rotation, rotation_for_tag, tag_for_rotation, with_orientation};
pub use finisher::{transform, CaptureFinisher, FinishError, DEFAULT_JPEG_QUALITY};
