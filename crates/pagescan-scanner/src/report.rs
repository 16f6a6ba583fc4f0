use serde::{Deserialize, Serialize};

use crate::events::CaptureEvent;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickOutcome {
    /// The source has no camera yet.
    NoCamera,
    /// Waiting for the evaluation interval to elapse.
    Throttled,
    /// Camera moved too fast; nothing evaluated.
    Unstable,
    Evaluated,
}

/// Why an accepted score did not produce a capture. State is left unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureRejection {
    /// A page corner projects behind the camera.
    BehindCamera,
    /// The homography solve returned the rejection sentinel.
    DegenerateGeometry,
    /// No camera background to rectify from.
    FeedUnavailable,
    /// The capture texture could not be allocated.
    TextureUnavailable,
}

/// Per-target UI feedback for one evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetFeedback {
    pub name: String,
    pub score: f32,
    /// `score / capture_threshold`, clamped to `[0, 1]`.
    pub progress: f32,
    pub stable: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub frame: u64,
    pub outcome: TickOutcome,
    pub stable: bool,
    /// Targets seen for the first time this tick.
    #[serde(default)]
    pub discovered: Vec<String>,
    #[serde(default)]
    pub feedback: Vec<TargetFeedback>,
    #[serde(default)]
    pub captures: Vec<CaptureEvent>,
    /// Targets that locked this tick.
    #[serde(default)]
    pub locked: Vec<String>,
    #[serde(default)]
    pub rejected: Vec<(String, CaptureRejection)>,
}

impl TickReport {
    pub fn new(frame: u64) -> Self {
        Self {
            frame,
            outcome: TickOutcome::NoCamera,
            stable: false,
            discovered: Vec::new(),
            feedback: Vec::new(),
            captures: Vec::new(),
            locked: Vec::new(),
            rejected: Vec::new(),
        }
    }

    pub fn captured(&self, name: &str) -> bool {
        self.captures.iter().any(|c| c.target_name == name)
    }

    pub fn feedback_for(&self, name: &str) -> Option<&TargetFeedback> {
        self.feedback.iter().find(|f| f.name == name)
    }
}
