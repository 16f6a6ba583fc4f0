use pagescan_core::{MotionLimits, QualityParams};
use serde::{Deserialize, Serialize};

/// Tuning for the scan coordinator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerParams {
    /// Score in `[0, 1]` at which a target locks.
    pub capture_threshold: f32,
    /// Lock targets automatically once they reach `capture_threshold`.
    pub auto_lock: bool,
    pub motion: MotionLimits,
    pub quality: QualityParams,
    /// A capture needs `score > best_score + min_improvement`.
    pub min_improvement: f32,
    /// Seconds between evaluations; `0` evaluates every tick.
    pub evaluation_interval: f32,
}

impl Default for ScannerParams {
    fn default() -> Self {
        Self {
            capture_threshold: 0.85,
            auto_lock: true,
            motion: MotionLimits::default(),
            quality: QualityParams::default(),
            min_improvement: 1e-5,
            evaluation_interval: 0.0,
        }
    }
}

impl ScannerParams {
    /// `score / capture_threshold`, clamped to `[0, 1]`.
    pub fn progress(&self, score: f32) -> f32 {
        if self.capture_threshold <= 0.0 {
            return 1.0;
        }
        (score / self.capture_threshold).clamp(0.0, 1.0)
    }
}
