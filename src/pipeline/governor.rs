//! Frame admission rate limiting

use tracing::{debug, trace};

use crate::types::TargetFrameRate;

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Dropped,
}

/// Admits a frame only when at least `1000 / fps` ms have passed since the
/// previously admitted one.
///
/// The first frame after [`reset`](Self::reset) is always admitted. A clock
/// that steps backwards re-anchors the governor at the new reading and admits
/// that frame.
#[derive(Debug, Clone)]
pub struct FrameRateGovernor {
    target: TargetFrameRate,
    last_admitted: Option<u64>,
}

impl FrameRateGovernor {
    pub fn new(target: TargetFrameRate) -> Self {
        Self { target, last_admitted: None }
    }

    /// Decide whether a frame arriving at `now_ms` is admitted.
    pub fn check(&mut self, now_ms: u64) -> Admission {
        if let Some(last) = self.last_admitted {
            if now_ms < last {
                debug!(last_admitted = last, now_ms, "Clock moved backwards, re-anchoring frame rate governor");
                self.last_admitted = Some(now_ms);
                return Admission::Admitted;
            }
            let elapsed = (now_ms - last) as f64;
            if elapsed < self.target.min_interval_ms() {
                trace!(elapsed_ms = elapsed, target_fps = self.target.fps(), "Frame rate limited");
                return Admission::Dropped;
            }
        }
        self.last_admitted = Some(now_ms);
        Admission::Admitted
    }

    /// Update the target rate; the next decision uses the new interval.
    pub fn set_target(&mut self, target: TargetFrameRate) {
        self.target = target;
    }

    pub fn target(&self) -> TargetFrameRate {
        self.target
    }

    /// Forget the last admission so the next frame is admitted unconditionally.
    pub fn reset(&mut self) {
        self.last_admitted = None;
    }

    /// Treat `now_ms` as the last admission time.
    pub fn anchor(&mut self, now_ms: u64) {
        self.last_admitted = Some(now_ms);
    }

    pub fn last_admitted(&self) -> Option<u64> {
        self.last_admitted
    }
}
