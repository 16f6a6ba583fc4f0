//! Target source for page scanning.
//!
//! Bridges the core to a marker-tracking subsystem:
//!
//! - [`Camera`] projects world points to screen pixels,
//! - [`LivePose`] / [`PoseRef`] model the tracker-owned transform the core
//!   only ever borrows weakly,
//! - [`TrackedImageBridge`] coalesces "added" and first "updated" tracker
//!   events into a single [`TargetObservation`],
//! - [`CameraFeed`] keeps the shared camera texture, refreshed at most once
//!   per rendered frame,
//! - [`TargetSource`] is the contract the scan coordinator consumes, and
//!   [`ArBridge`] the implementation driven by host tracker callbacks.

mod bridge;
mod camera;
mod feed;
mod pose;
mod source;
mod tracking;

pub use bridge::ArBridge;
pub use camera::Camera;
pub use feed::{feed_extent, CameraFeed, FEED_FORMAT_PREFERENCE};
pub use pose::{LivePose, PoseRef};
pub use source::{TargetObservation, TargetSource};
pub use tracking::{
    ImageGuid, ReferenceImage, ReferenceLibrary, TrackableId, TrackablesChanged, TrackedImage,
    TrackedImageBridge, TrackingState,
};
