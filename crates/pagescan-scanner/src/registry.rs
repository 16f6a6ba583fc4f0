//! Arena storage for per-target records.
//!
//! Names map to stable indices into a dense `Vec`; records are updated in
//! place by index and never removed, so an index stays valid for the life of
//! the registry.

use std::collections::HashMap;

use pagescan_source::{PoseRef, TargetObservation};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetPhase {
    /// Known by name but no full observation yet.
    Discovered,
    /// Scored every evaluation; captures are transient actions in this phase.
    Evaluating,
    /// Terminal until reset.
    Locked,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetState {
    /// Non-decreasing while unlocked.
    pub best_score: f32,
    pub locked: bool,
}

#[derive(Clone, Debug)]
pub struct TargetRecord {
    pub name: String,
    /// Printed size in meters (width, height).
    pub physical_size: [f32; 2],
    pub pose: PoseRef,
    pub tracking_active: bool,
    /// Score from the most recent evaluation.
    pub last_score: f32,
    pub state: TargetState,
    pub phase: TargetPhase,
    pub(crate) capture_requested: bool,
}

impl TargetRecord {
    fn discovered(name: &str, physical_size: [f32; 2]) -> Self {
        Self {
            name: name.to_owned(),
            physical_size,
            pose: PoseRef::dangling(),
            tracking_active: false,
            last_score: 0.0,
            state: TargetState::default(),
            phase: TargetPhase::Discovered,
            capture_requested: false,
        }
    }

    /// Tracked, has a live pose and is not locked.
    pub fn is_evaluable(&self) -> bool {
        self.phase == TargetPhase::Evaluating && self.tracking_active && self.pose.is_alive()
    }
}

#[derive(Debug, Default)]
pub struct TargetRegistry {
    index: HashMap<String, usize>,
    records: Vec<TargetRecord>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&TargetRecord> {
        self.index_of(name).map(|i| &self.records[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut TargetRecord> {
        let i = self.index_of(name)?;
        Some(&mut self.records[i])
    }

    pub fn record(&self, idx: usize) -> Option<&TargetRecord> {
        self.records.get(idx)
    }

    pub fn record_mut(&mut self, idx: usize) -> Option<&mut TargetRecord> {
        self.records.get_mut(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TargetRecord> {
        self.records.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TargetRecord> {
        self.records.iter_mut()
    }

    /// Add a name-only record in [`TargetPhase::Discovered`].
    ///
    /// Returns the index and whether it was newly inserted.
    pub fn register(&mut self, name: &str, physical_size: [f32; 2]) -> (usize, bool) {
        if let Some(i) = self.index_of(name) {
            return (i, false);
        }
        let i = self.records.len();
        self.records.push(TargetRecord::discovered(name, physical_size));
        self.index.insert(name.to_owned(), i);
        (i, true)
    }

    /// Merge an observation: insert on first sight, otherwise refresh pose,
    /// size and tracking flag in place.
    ///
    /// A full observation moves a Discovered record to Evaluating. Locked
    /// records stay locked.
    pub fn merge(&mut self, obs: &TargetObservation) -> (usize, bool) {
        let (i, inserted) = self.register(&obs.name, obs.physical_size);
        let record = &mut self.records[i];
        record.pose = obs.pose.clone();
        record.tracking_active = obs.tracking_active;
        if obs.physical_size[0] > 0.0 && obs.physical_size[1] > 0.0 {
            record.physical_size = obs.physical_size;
        }
        if record.phase == TargetPhase::Discovered && record.pose.is_alive() {
            record.phase = TargetPhase::Evaluating;
        }
        (i, inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagescan_core::Pose;
    use pagescan_source::LivePose;

    fn obs(name: &str, pose: &LivePose, active: bool) -> TargetObservation {
        TargetObservation {
            name: name.to_owned(),
            physical_size: [0.2, 0.3],
            pose: pose.downgrade(),
            tracking_active: active,
        }
    }

    #[test]
    fn indices_are_stable_and_names_unique() {
        let pose = LivePose::new(Pose::identity());
        let mut reg = TargetRegistry::new();
        let (a, new_a) = reg.merge(&obs("A", &pose, true));
        let (b, _) = reg.merge(&obs("B", &pose, true));
        let (a2, new_a2) = reg.merge(&obs("A", &pose, false));
        assert!(new_a && !new_a2);
        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_eq!(reg.len(), 2);
        assert!(!reg.get("A").unwrap().tracking_active);
    }

    #[test]
    fn registered_target_waits_for_full_observation() {
        let mut reg = TargetRegistry::new();
        reg.register("Page1", [0.2, 0.3]);
        assert_eq!(reg.get("Page1").unwrap().phase, TargetPhase::Discovered);
        assert!(!reg.get("Page1").unwrap().is_evaluable());

        let pose = LivePose::new(Pose::identity());
        reg.merge(&obs("Page1", &pose, true));
        let rec = reg.get("Page1").unwrap();
        assert_eq!(rec.phase, TargetPhase::Evaluating);
        assert!(rec.is_evaluable());
    }

    #[test]
    fn merge_keeps_locked_phase_and_state() {
        let pose = LivePose::new(Pose::identity());
        let mut reg = TargetRegistry::new();
        reg.merge(&obs("A", &pose, true));
        {
            let rec = reg.get_mut("A").unwrap();
            rec.phase = TargetPhase::Locked;
            rec.state = TargetState {
                best_score: 0.9,
                locked: true,
            };
        }
        reg.merge(&obs("A", &pose, true));
        let rec = reg.get("A").unwrap();
        assert_eq!(rec.phase, TargetPhase::Locked);
        assert_eq!(rec.state.best_score, 0.9);
    }

    #[test]
    fn dropped_pose_makes_target_unevaluable() {
        let pose = LivePose::new(Pose::identity());
        let mut reg = TargetRegistry::new();
        reg.merge(&obs("A", &pose, true));
        drop(pose);
        assert!(!reg.get("A").unwrap().is_evaluable());
    }
}
