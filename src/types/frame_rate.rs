//! Target frame rate for the admission governor

use serde::{Deserialize, Serialize};

/// Target admitted frame rate, always within [`TargetFrameRate::MIN`]..=[`TargetFrameRate::MAX`].
///
/// Out-of-range requests are clamped silently, including when deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct TargetFrameRate(u32);

impl TargetFrameRate {
    /// Lowest accepted rate in frames per second
    pub const MIN: u32 = 10;

    /// Highest accepted rate in frames per second
    pub const MAX: u32 = 60;

    /// Clamp `fps` into the accepted range
    pub fn new(fps: u32) -> Self {
        Self(fps.clamp(Self::MIN, Self::MAX))
    }

    /// Frames per second
    pub fn fps(self) -> u32 {
        self.0
    }

    /// Minimum spacing between admitted frames in milliseconds (`1000 / fps`)
    pub fn min_interval_ms(self) -> f64 {
        1000.0 / self.0 as f64
    }
}

impl Default for TargetFrameRate {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl From<u32> for TargetFrameRate {
    fn from(fps: u32) -> Self {
        Self::new(fps)
    }
}

impl From<TargetFrameRate> for u32 {
    fn from(rate: TargetFrameRate) -> Self {
        rate.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_both_ends() {
        assert_eq!(TargetFrameRate::new(5).fps(), 10);
        assert_eq!(TargetFrameRate::new(1000).fps(), 60);
        assert_eq!(TargetFrameRate::new(30).fps(), 30);
    }

    #[test]
    fn interval_matches_rate() {
        assert_eq!(TargetFrameRate::new(10).min_interval_ms(), 100.0);
        assert_eq!(TargetFrameRate::new(50).min_interval_ms(), 20.0);
        assert!(TargetFrameRate::new(60).min_interval_ms() < 17.0);
    }
}
