//! Scan coordinator for printed-page capture.
//!
//! Per tick the coordinator:
//! 1. merges target observations from a [`pagescan_source::TargetSource`],
//! 2. computes one global stability flag from camera motion,
//! 3. scores every evaluating target and, on sufficient improvement,
//!    rectifies the shared camera texture into the target's cache slot,
//! 4. emits a [`CaptureEvent`] and locks targets that cross the threshold.
//!
//! Nothing on the tick path returns an error. Rejected geometry, a missing
//! camera background or unknown target names are logged and reported in the
//! [`TickReport`].
//!
//! ## Quickstart
//!
//! ```
//! use pagescan_core::ReferenceMath;
//! use pagescan_scanner::{ScanCoordinator, ScannerParams};
//! use pagescan_texture::{PixelFormat, SoftwareDevice, TextureCache};
//!
//! let device = SoftwareDevice::new();
//! let cache = TextureCache::new(&device, 256, &PixelFormat::DEFAULT_PREFERENCE).unwrap();
//! let mut scanner = ScanCoordinator::new(ScannerParams::default(), ReferenceMath, cache);
//! scanner.register_target("Page1", [0.21, 0.297]);
//! assert!(scanner.state("Page1").is_some());
//! ```

mod coordinator;
mod events;
mod params;
mod registry;
mod report;

pub use coordinator::{FrameTick, ScanCoordinator};
pub use events::{CaptureEvent, CaptureObservers, PaintBinding, SubscriptionId};
pub use params::ScannerParams;
pub use registry::{TargetPhase, TargetRecord, TargetRegistry, TargetState};
pub use report::{CaptureRejection, TargetFeedback, TickOutcome, TickReport};
