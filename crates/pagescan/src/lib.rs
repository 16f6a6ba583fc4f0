//! High-level facade crate for the `pagescan-*` workspace.
//!
//! This crate provides:
//! - stable re-exports of the pipeline crates,
//! - [`ScanConfig`], the JSON configuration surface,
//! - [`ScanSession`], the composition root that owns device, target source,
//!   scan coordinator and math provider,
//! - session replay from recorded frames (see [`replay`]),
//! - the `pagescan` command-line tool (feature `cli`).
//!
//! ## Quickstart
//!
//! ```
//! use pagescan::{ScanConfig, ScanSession};
//! use pagescan::source::ReferenceLibrary;
//!
//! let config = ScanConfig::default();
//! let mut session = ScanSession::software(&config, ReferenceLibrary::default()).unwrap();
//! let report = session.tick(1.0 / 60.0);
//! assert!(report.captures.is_empty());
//! session.shutdown();
//! ```
//!
//! ## API map
//! - `pagescan::core`: poses, homography solve, image buffers, math provider.
//! - `pagescan::texture`: pixel formats, GPU device trait, texture cache, rectifier.
//! - `pagescan::source`: camera, tracked-image coalescing, camera feed, target source.
//! - `pagescan::scanner`: per-target state machine and capture events.

pub use pagescan_core as core;
pub use pagescan_scanner as scanner;
pub use pagescan_source as source;
pub use pagescan_texture as texture;

pub mod config;
pub mod replay;
pub mod session;

pub use config::{ConfigError, ConfigIoError, ScanConfig, TargetSpec};
pub use pagescan_core::{MathProvider, Pose, ReferenceMath};
pub use pagescan_scanner::{CaptureEvent, PaintBinding, TargetPhase, TickOutcome, TickReport};
pub use replay::{run_replay, ReplayError, ReplayReport, ReplaySession};
pub use session::{ScanSession, SessionError};
