use std::cell::Cell;
use std::rc::{Rc, Weak};

use pagescan_core::Pose;

/// A transform owned and updated by the tracking subsystem.
#[derive(Clone, Debug, Default)]
pub struct LivePose(Rc<Cell<Pose>>);

impl LivePose {
    pub fn new(pose: Pose) -> Self {
        Self(Rc::new(Cell::new(pose)))
    }

    #[inline]
    pub fn get(&self) -> Pose {
        self.0.get()
    }

    #[inline]
    pub fn set(&self, pose: Pose) {
        self.0.set(pose);
    }

    pub fn downgrade(&self) -> PoseRef {
        PoseRef(Rc::downgrade(&self.0))
    }
}

/// Non-owning handle to a [`LivePose`]; reads fail once the tracker drops it.
#[derive(Clone, Debug, Default)]
pub struct PoseRef(Weak<Cell<Pose>>);

impl PoseRef {
    /// A handle that never resolves.
    pub fn dangling() -> Self {
        Self(Weak::new())
    }

    #[inline]
    pub fn get(&self) -> Option<Pose> {
        self.0.upgrade().map(|cell| cell.get())
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    /// `true` if both handles point at the same tracker transform.
    pub fn same_source(&self, other: &PoseRef) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }
}
