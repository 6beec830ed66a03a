//! Pure geometry: sizes, aspect ratios, negotiation and rotation.
//!
//! Nothing in here touches a device; every function is a plain
//! computation over values the device reported.

mod negotiate;
mod orientation;
mod size;

pub use negotiate::{
    candidates, negotiate, negotiate_any, pick_mid_rank, pick_threshold, SizeCandidate, SizePolicy,
};
pub use orientation::{compute_orientation, Facing, Orientation, Rotation};
pub use size::{is_same_aspect, AspectMode, AspectRatio, Size};
