//! Tracked-image events and their coalescing into target observations.
//!
//! Trackers may report a new image in an "added" batch before its reference
//! metadata is filled in. The bridge therefore holds added ids as pending and
//! only announces the target on the first "updated" report for that id.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pose::{LivePose, PoseRef};
use crate::source::TargetObservation;

/// Session-unique id the tracker assigns to a tracked image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackableId(pub u64);

impl fmt::Display for TrackableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}

/// Stable id of an image in the reference library.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageGuid(pub u64);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceImage {
    pub guid: ImageGuid,
    pub name: String,
    /// Printed size in meters, if known.
    #[serde(default)]
    pub size: Option<[f32; 2]>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceLibrary {
    pub images: Vec<ReferenceImage>,
}

impl ReferenceLibrary {
    pub fn new(images: Vec<ReferenceImage>) -> Self {
        Self { images }
    }

    pub fn name_of(&self, guid: ImageGuid) -> Option<&str> {
        self.images
            .iter()
            .find(|img| img.guid == guid)
            .map(|img| img.name.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    #[default]
    None,
    Limited,
    Tracking,
}

/// One tracked image as reported by the tracker.
#[derive(Clone, Debug)]
pub struct TrackedImage {
    pub id: TrackableId,
    /// Reference name; may be empty on early reports.
    pub name: String,
    pub guid: Option<ImageGuid>,
    /// Physical size in meters.
    pub size: [f32; 2],
    pub pose: LivePose,
    pub state: TrackingState,
}

/// One batch of tracker changes.
#[derive(Clone, Debug, Default)]
pub struct TrackablesChanged {
    pub added: Vec<TrackedImage>,
    pub updated: Vec<TrackedImage>,
    pub removed: Vec<TrackableId>,
}

#[derive(Clone, Debug)]
struct Announced {
    name: String,
    size: [f32; 2],
    pose: PoseRef,
    active: bool,
}

#[derive(Debug, Default)]
pub struct TrackedImageBridge {
    library: ReferenceLibrary,
    pending: HashSet<TrackableId>,
    announced: HashMap<TrackableId, Announced>,
}

impl TrackedImageBridge {
    pub fn new(library: ReferenceLibrary) -> Self {
        Self {
            library,
            pending: HashSet::new(),
            announced: HashMap::new(),
        }
    }

    pub fn library(&self) -> &ReferenceLibrary {
        &self.library
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn announced_count(&self) -> usize {
        self.announced.len()
    }

    /// Target name for an image: reported name, then library lookup by guid,
    /// then the trackable id.
    pub fn resolve_name(&self, img: &TrackedImage) -> String {
        if !img.name.is_empty() {
            return img.name.clone();
        }
        img.guid
            .and_then(|guid| self.library.name_of(guid))
            .map(str::to_owned)
            .unwrap_or_else(|| img.id.to_string())
    }

    /// Fold one batch into observations for the coordinator.
    ///
    /// - added ids become pending,
    /// - the first update of a pending id announces the target,
    /// - later updates re-announce only when tracking state or pose handle
    ///   changes,
    /// - removal drops a pending id and announces a known target as inactive.
    pub fn process(&mut self, change: &TrackablesChanged) -> Vec<TargetObservation> {
        let mut out = Vec::new();

        for img in &change.added {
            self.pending.insert(img.id);
        }

        for img in &change.updated {
            let active = img.state == TrackingState::Tracking;
            let pose = img.pose.downgrade();
            if self.pending.remove(&img.id) {
                let name = self.resolve_name(img);
                log::info!("target '{}' ({}) announced", name, img.id);
                let record = Announced {
                    name,
                    size: img.size,
                    pose,
                    active,
                };
                out.push(observation(&record));
                self.announced.insert(img.id, record);
            } else if let Some(record) = self.announced.get_mut(&img.id) {
                if record.active != active || !record.pose.same_source(&pose) {
                    record.active = active;
                    record.pose = pose;
                    out.push(observation(record));
                }
            } else {
                log::debug!("update for unannounced trackable {} ignored", img.id);
            }
        }

        for id in &change.removed {
            if self.pending.remove(id) {
                log::debug!("pending trackable {} removed before first update", id);
            }
            if let Some(mut record) = self.announced.remove(id) {
                record.active = false;
                out.push(observation(&record));
            }
        }

        out
    }
}

fn observation(record: &Announced) -> TargetObservation {
    TargetObservation {
        name: record.name.clone(),
        physical_size: record.size,
        pose: record.pose.clone(),
        tracking_active: record.active,
    }
}
