//! Pixel sizes and aspect ratios.
//!
//! Ratios are compared by cross-multiplication so that no floating
//! point rounding ever decides whether a device size matches.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::session::ConfigError;

/// A width x height pair in pixels, as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total pixel count.
    #[inline]
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// True when either dimension is zero. Such sizes match no ratio.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns the size with width and height swapped.
    #[inline]
    pub fn transposed(&self) -> Self {
        Self::new(self.height, self.width)
    }

    /// True when this size has exactly the ratio `width:height`.
    #[inline]
    pub fn matches(&self, width: u32, height: u32) -> bool {
        is_same_aspect(self.width, self.height, width, height)
    }

    /// True when both sizes share the same exact ratio.
    #[inline]
    pub fn same_aspect_as(&self, other: &Size) -> bool {
        self.matches(other.width, other.height)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Size {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidSize(s.to_string());
        let (w, h) = s.trim().split_once(|c: char| c == 'x' || c == 'X').ok_or_else(invalid)?;
        let width = w.trim().parse::<u32>().map_err(|_| invalid())?;
        let height = h.trim().parse::<u32>().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self::new(width, height))
    }
}

impl TryFrom<String> for Size {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Size> for String {
    fn from(size: Size) -> Self {
        size.to_string()
    }
}

/// Ratio test by cross-multiplication: `w:h == to_w:to_h`.
///
/// Widened to u64 so that sensor-sized products never overflow. A zero
/// component on either side never matches.
#[inline]
pub fn is_same_aspect(width: u32, height: u32, to_width: u32, to_height: u32) -> bool {
    if width == 0 || height == 0 || to_width == 0 || to_height == 0 {
        return false;
    }
    u64::from(width) * u64::from(to_height) == u64::from(height) * u64::from(to_width)
}

/// A requested width:height ratio. Both components are positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AspectRatio {
    x: u32,
    y: u32,
}

impl AspectRatio {
    pub const SQUARE: AspectRatio = AspectRatio { x: 1, y: 1 };
    pub const STANDARD: AspectRatio = AspectRatio { x: 4, y: 3 };
    pub const WIDE: AspectRatio = AspectRatio { x: 16, y: 9 };

    /// Creates a ratio, rejecting non-positive components.
    pub fn new(x: u32, y: u32) -> Result<Self, ConfigError> {
        if x == 0 || y == 0 {
            return Err(ConfigError::InvalidAspectRatio(format!("{x}:{y}")));
        }
        Ok(Self { x, y })
    }

    #[inline]
    pub fn x(&self) -> u32 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> u32 {
        self.y
    }

    /// True when `size` has exactly this ratio.
    #[inline]
    pub fn accepts(&self, size: &Size) -> bool {
        size.matches(self.x, self.y)
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.x, self.y)
    }
}

impl TryFrom<Size> for AspectRatio {
    type Error = ConfigError;

    fn try_from(size: Size) -> Result<Self, Self::Error> {
        Self::new(size.width, size.height)
    }
}

/// Aspect request: either any ratio the two size lists agree on, or a fixed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AspectMode {
    Auto,
    Fixed(AspectRatio),
}

impl fmt::Display for AspectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AspectMode::Auto => f.write_str("auto"),
            AspectMode::Fixed(ratio) => ratio.fmt(f),
        }
    }
}

impl FromStr for AspectMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(AspectMode::Auto);
        }
        let invalid = || ConfigError::InvalidAspectRatio(s.to_string());
        let (x, y) = s.split_once(|c: char| c == ':' || c == 'x').ok_or_else(invalid)?;
        let x = x.trim().parse::<u32>().map_err(|_| invalid())?;
        let y = y.trim().parse::<u32>().map_err(|_| invalid())?;
        AspectRatio::new(x, y).map(AspectMode::Fixed)
    }
}

impl TryFrom<String> for AspectMode {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AspectMode> for String {
    fn from(mode: AspectMode) -> Self {
        mode.to_string()
    }
}

impl From<AspectRatio> for AspectMode {
    fn from(ratio: AspectRatio) -> Self {
        AspectMode::Fixed(ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_same_aspect_cross_multiplication() {
        assert!(is_same_aspect(800, 600, 4, 3));
        assert!(!is_same_aspect(800, 601, 4, 3));
        assert!(is_same_aspect(1920, 1080, 16, 9));
    }

    #[test]
    fn test_degenerate_sizes_never_match() {
        assert!(!is_same_aspect(0, 0, 4, 3));
        assert!(!is_same_aspect(640, 480, 0, 0));
        assert!(!Size::new(0, 0).same_aspect_as(&Size::new(0, 0)));
        assert!(!AspectRatio::SQUARE.accepts(&Size::new(0, 0)));
        assert!(Size::new(0, 480).is_empty());
        assert!(AspectRatio::try_from(Size::new(0, 0)).is_err());
        assert_eq!(
            AspectRatio::try_from(Size::new(1920, 1080)).unwrap().to_string(),
            "1920:1080"
        );
    }

    #[test]
    fn test_zero_ratio_rejected() {
        assert!(matches!(
            AspectRatio::new(0, 3),
            Err(ConfigError::InvalidAspectRatio(_))
        ));
        assert!("4:0".parse::<AspectMode>().is_err());
    }

    #[test]
    fn test_aspect_mode_parsing() {
        assert_eq!("auto".parse::<AspectMode>().unwrap(), AspectMode::Auto);
        assert_eq!(
            "16:9".parse::<AspectMode>().unwrap(),
            AspectMode::Fixed(AspectRatio::WIDE)
        );
        assert!("sixteen:nine".parse::<AspectMode>().is_err());
        assert_eq!(AspectMode::Fixed(AspectRatio::STANDARD).to_string(), "4:3");
    }

    #[test]
    fn test_size_parsing() {
        assert_eq!("1280x720".parse::<Size>().unwrap(), Size::new(1280, 720));
        assert!("1280".parse::<Size>().is_err());
        assert!("0x720".parse::<Size>().is_err());
    }

    proptest! {
        #[test]
        fn prop_same_aspect_symmetric(w in 1u32..5000, h in 1u32..5000, x in 1u32..50, y in 1u32..50) {
            prop_assert_eq!(is_same_aspect(w, h, x, y), is_same_aspect(x, y, w, h));
        }

        #[test]
        fn prop_same_aspect_scale_invariant(x in 1u32..100, y in 1u32..100, k in 1u32..200) {
            prop_assert!(is_same_aspect(x * k, y * k, x, y));
        }
    }
}
