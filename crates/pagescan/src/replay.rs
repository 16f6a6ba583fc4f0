//! Recorded scan sessions replayed against the software device.
//!
//! A recording is a JSON document with the screen size, an optional
//! reference library and one entry per rendered frame: frame delta, camera
//! pose, tracker events and an optional camera background. Replaying it
//! simulates the tracking subsystem (it owns the live poses) and drives a
//! [`ScanSession`] frame by frame. Captured imagery stays in memory.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use nalgebra::Matrix4;
use pagescan_core::{Pose, RgbaImage};
use pagescan_scanner::{CaptureRejection, TargetPhase};
use pagescan_source::{
    ArBridge, Camera, ImageGuid, LivePose, ReferenceLibrary, TrackableId, TrackablesChanged,
    TrackedImage, TrackingState,
};
use pagescan_texture::{SoftwareDevice, TextureHandle};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::config::ScanConfig;
use crate::session::{ScanSession, SessionError};

#[derive(thiserror::Error, Debug)]
pub enum ReplayError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("screen size must be non-zero, got {0}x{1}")]
    EmptyScreen(u32, u32),
    #[error("frame {frame}: {reason}")]
    InvalidFrame { frame: usize, reason: String },
    #[cfg(feature = "image")]
    #[error("frame {frame}: failed to load {path}: {source}")]
    Image {
        frame: usize,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("frame image {0} needs the `image` feature")]
    ImageSupportDisabled(PathBuf),
}

fn default_fov() -> f32 {
    60.0
}

fn default_dt() -> f32 {
    1.0 / 60.0
}

fn default_state() -> TrackingState {
    TrackingState::Tracking
}

/// Camera background for one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FrameImage {
    /// Uniform color, for synthetic recordings.
    Solid {
        width: usize,
        height: usize,
        rgba: [u8; 4],
    },
    /// Image file, relative to the recording.
    File { path: PathBuf },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackerEvent {
    Added {
        id: u64,
        #[serde(default)]
        name: String,
        #[serde(default)]
        guid: Option<u64>,
        size: [f32; 2],
        pose: Pose,
    },
    Updated {
        id: u64,
        #[serde(default)]
        name: String,
        #[serde(default)]
        guid: Option<u64>,
        size: [f32; 2],
        pose: Pose,
        #[serde(default = "default_state")]
        state: TrackingState,
    },
    Removed {
        id: u64,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    #[serde(default = "default_dt")]
    pub dt: f32,
    pub camera: Pose,
    #[serde(default)]
    pub background: Option<FrameImage>,
    #[serde(default)]
    pub display_matrix: Option<Matrix4<f32>>,
    #[serde(default)]
    pub events: Vec<TrackerEvent>,
    /// Targets to reset before this frame's tick.
    #[serde(default)]
    pub reset: Vec<String>,
    /// Targets to force-capture on this frame's tick.
    #[serde(default)]
    pub request_capture: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplaySession {
    /// Screen size in pixels (width, height).
    pub screen: [u32; 2],
    #[serde(default = "default_fov")]
    pub vertical_fov_deg: f32,
    #[serde(default)]
    pub config: Option<ScanConfig>,
    #[serde(default)]
    pub library: ReferenceLibrary,
    pub frames: Vec<ReplayFrame>,
}

impl ReplaySession {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ReplayError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub frame: u64,
    pub target: String,
    pub score: f32,
    pub texture: TextureHandle,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RejectionRecord {
    pub frame: u64,
    pub target: String,
    pub reason: CaptureRejection,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetSummary {
    pub name: String,
    pub phase: TargetPhase,
    pub best_score: f32,
    pub locked: bool,
    pub texture: Option<TextureHandle>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayReport {
    pub frames: u64,
    pub evaluated_frames: u64,
    pub unstable_frames: u64,
    pub captures: Vec<CaptureRecord>,
    pub locks: Vec<(u64, String)>,
    pub rejections: Vec<RejectionRecord>,
    pub targets: Vec<TargetSummary>,
    pub released_textures: usize,
}

/// Stand-in for the tracking subsystem: owns one live pose per trackable.
#[derive(Default)]
struct SimulatedTracker {
    poses: HashMap<u64, LivePose>,
}

impl SimulatedTracker {
    fn image(
        &mut self,
        id: u64,
        name: &str,
        guid: Option<u64>,
        size: [f32; 2],
        pose: Pose,
        state: TrackingState,
    ) -> TrackedImage {
        let live = self.poses.entry(id).or_default();
        live.set(pose);
        TrackedImage {
            id: TrackableId(id),
            name: name.to_owned(),
            guid: guid.map(ImageGuid),
            size,
            pose: live.clone(),
            state,
        }
    }

    fn batch(&mut self, events: &[TrackerEvent]) -> TrackablesChanged {
        let mut change = TrackablesChanged::default();
        for event in events {
            match event {
                TrackerEvent::Added {
                    id,
                    name,
                    guid,
                    size,
                    pose,
                } => {
                    let img = self.image(*id, name, *guid, *size, *pose, TrackingState::None);
                    change.added.push(img);
                }
                TrackerEvent::Updated {
                    id,
                    name,
                    guid,
                    size,
                    pose,
                    state,
                } => {
                    let img = self.image(*id, name, *guid, *size, *pose, *state);
                    change.updated.push(img);
                }
                TrackerEvent::Removed { id } => {
                    self.poses.remove(id);
                    change.removed.push(TrackableId(*id));
                }
            }
        }
        change
    }
}

fn load_frame_image(
    image: &FrameImage,
    base_dir: Option<&Path>,
    frame: usize,
) -> Result<RgbaImage, ReplayError> {
    match image {
        FrameImage::Solid {
            width,
            height,
            rgba,
        } => {
            if *width == 0 || *height == 0 {
                return Err(ReplayError::InvalidFrame {
                    frame,
                    reason: "background has zero size".into(),
                });
            }
            Ok(RgbaImage::filled(*width, *height, *rgba))
        }
        FrameImage::File { path } => {
            let path = match base_dir {
                Some(dir) if path.is_relative() => dir.join(path),
                _ => path.clone(),
            };
            read_image(&path, frame)
        }
    }
}

#[cfg(feature = "image")]
fn read_image(path: &Path, frame: usize) -> Result<RgbaImage, ReplayError> {
    let to_err = |source| ReplayError::Image {
        frame,
        path: path.to_path_buf(),
        source,
    };
    let img = image::ImageReader::open(path)?
        .decode()
        .map_err(to_err)?
        .to_rgba8();
    let (w, h) = img.dimensions();
    RgbaImage::from_rgba8(w as usize, h as usize, img.as_raw()).ok_or_else(|| {
        ReplayError::InvalidFrame {
            frame,
            reason: format!("{} has an unexpected buffer size", path.display()),
        }
    })
}

#[cfg(not(feature = "image"))]
fn read_image(path: &Path, _frame: usize) -> Result<RgbaImage, ReplayError> {
    Err(ReplayError::ImageSupportDisabled(path.to_path_buf()))
}

/// Replay `session` with `config`. Relative frame image paths resolve
/// against `base_dir`.
#[cfg_attr(feature = "tracing", instrument(level = "info", skip_all, fields(frames = session.frames.len())))]
pub fn run_replay(
    session: &ReplaySession,
    config: &ScanConfig,
    base_dir: Option<&Path>,
) -> Result<ReplayReport, ReplayError> {
    let [screen_w, screen_h] = session.screen;
    if screen_w == 0 || screen_h == 0 {
        return Err(ReplayError::EmptyScreen(screen_w, screen_h));
    }

    let mut scan = ScanSession::software(config, session.library.clone())?;
    let mut tracker = SimulatedTracker::default();
    let mut report = ReplayReport::default();

    for (i, frame) in session.frames.iter().enumerate() {
        let camera = Camera::new(frame.camera, session.vertical_fov_deg, screen_w, screen_h);
        let background = frame
            .background
            .as_ref()
            .map(|img| load_frame_image(img, base_dir, i))
            .transpose()?;

        {
            let bridge: &mut ArBridge = scan.source_mut();
            bridge.set_camera(camera);
            bridge.set_background(background);
            if let Some(display) = frame.display_matrix {
                bridge.set_display_matrix(display);
            }
            let change = tracker.batch(&frame.events);
            bridge.on_trackables_changed(&change);
        }
        for name in &frame.reset {
            scan.scanner_mut().reset(name);
        }
        for name in &frame.request_capture {
            scan.scanner_mut().request_capture(name);
        }

        let tick = scan.tick(frame.dt);
        match tick.outcome {
            pagescan_scanner::TickOutcome::Evaluated => report.evaluated_frames += 1,
            pagescan_scanner::TickOutcome::Unstable => report.unstable_frames += 1,
            _ => {}
        }
        for c in tick.captures {
            report.captures.push(CaptureRecord {
                frame: tick.frame,
                target: c.target_name,
                score: c.score,
                texture: c.texture,
            });
        }
        for name in tick.locked {
            report.locks.push((tick.frame, name));
        }
        for (target, reason) in tick.rejected {
            report.rejections.push(RejectionRecord {
                frame: tick.frame,
                target,
                reason,
            });
        }
    }

    report.frames = scan.frame();
    report.targets = scan
        .scanner()
        .targets()
        .map(|t| TargetSummary {
            name: t.name.clone(),
            phase: t.phase,
            best_score: t.state.best_score,
            locked: t.state.locked,
            texture: scan.scanner().captured_texture(&t.name),
        })
        .collect();
    report.released_textures = scan.shutdown();
    log::info!(
        "replayed {} frames: {} captures, {} locks",
        report.frames,
        report.captures.len(),
        report.locks.len()
    );
    Ok(report)
}
