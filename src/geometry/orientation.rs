//! Display and picture rotation.
//!
//! The sensor is mounted at a fixed angle, the screen turns with the user.
//! Both are composed here so the live preview is drawn upright and the
//! saved still is rotated to match what was framed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A clockwise quarter-turn rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Rotation in degrees: 0, 90, 180 or 270.
    #[inline]
    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Maps an exact quarter turn; anything else is `None`.
    pub fn from_degrees(degrees: u32) -> Option<Self> {
        match degrees {
            0 => Some(Rotation::Deg0),
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    /// Normalizes any multiple of 90 (including 360) into range.
    fn wrap(degrees: u32) -> Self {
        match degrees % 360 {
            90 => Rotation::Deg90,
            180 => Rotation::Deg180,
            270 => Rotation::Deg270,
            _ => Rotation::Deg0,
        }
    }

    /// True for 90 and 270, where width and height trade places.
    #[inline]
    pub fn is_transposing(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

impl TryFrom<u32> for Rotation {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Rotation::from_degrees(value)
            .ok_or_else(|| format!("rotation must be 0, 90, 180 or 270, got {value}"))
    }
}

impl From<Rotation> for u32 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

/// Which side of the device a camera faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    Front,
    Back,
}

impl Facing {
    pub fn opposite(self) -> Self {
        match self {
            Facing::Front => Facing::Back,
            Facing::Back => Facing::Front,
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facing::Front => f.write_str("front"),
            Facing::Back => f.write_str("back"),
        }
    }
}

/// Result of composing sensor mount, screen rotation and facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Orientation {
    /// Rotation applied to the live preview.
    pub display: Rotation,
    /// Rotation the still image needs to come out upright.
    pub picture: Rotation,
    /// Front sensors see a mirror image of the viewfinder.
    pub mirror: bool,
}

/// Computes preview and still rotation for one camera at one screen rotation.
pub fn compute_orientation(sensor: Rotation, display: Rotation, facing: Facing) -> Orientation {
    let sensor = sensor.degrees();
    let degrees = display.degrees();

    let (display, picture) = match facing {
        Facing::Front => {
            let turned = (sensor + degrees) % 360;
            ((360 - turned) % 360, (sensor + 360 - degrees) % 360)
        }
        Facing::Back => ((sensor + 360 - degrees) % 360, (sensor + degrees) % 360),
    };

    Orientation {
        display: Rotation::wrap(display),
        picture: Rotation::wrap(picture),
        mirror: facing == Facing::Front,
    }
}
