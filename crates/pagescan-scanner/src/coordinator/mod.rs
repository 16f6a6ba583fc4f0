//! The per-tick scan state machine.

mod capture;

use nalgebra::Point2;
use pagescan_core::{MathProvider, Pose, QualityInput, UnwarpMatrix};
use pagescan_source::{TargetObservation, TargetSource};
use pagescan_texture::{GpuDevice, Rectifier, TextureCache, TextureHandle};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::events::{CaptureObservers, SubscriptionId};
use crate::params::ScannerParams;
use crate::registry::{TargetPhase, TargetRecord, TargetRegistry, TargetState};
use crate::report::{TargetFeedback, TickOutcome, TickReport};
use crate::CaptureEvent;

/// One host frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTick {
    /// Monotonic rendered-frame counter; keys the camera-feed memo.
    pub index: u64,
    /// Seconds since the previous tick.
    pub dt: f32,
}

/// Buffers marshalled to the math provider on every solve.
///
/// Reused across calls. The math provider only sees borrowed views, one call
/// at a time.
#[derive(Clone, Copy, Debug)]
struct Scratch {
    corners: [Point2<f32>; 4],
    unwarp: UnwarpMatrix,
}

impl Default for Scratch {
    fn default() -> Self {
        Self {
            corners: [Point2::origin(); 4],
            unwarp: UnwarpMatrix::rejected(),
        }
    }
}

/// Owns per-target state and drives evaluation and capture.
///
/// Single-threaded: the host calls [`ScanCoordinator::tick`] once per frame.
/// Construct it at the composition root and hand references to consumers.
#[derive(Debug)]
pub struct ScanCoordinator<M: MathProvider> {
    params: ScannerParams,
    math: M,
    registry: TargetRegistry,
    cache: TextureCache,
    rectifier: Rectifier,
    observers: CaptureObservers,
    last_camera: Option<Pose>,
    pending_dt: f32,
    scratch: Scratch,
}

impl<M: MathProvider> ScanCoordinator<M> {
    pub fn new(params: ScannerParams, math: M, cache: TextureCache) -> Self {
        Self {
            params,
            math,
            registry: TargetRegistry::new(),
            cache,
            rectifier: Rectifier,
            observers: CaptureObservers::default(),
            last_camera: None,
            pending_dt: 0.0,
            scratch: Scratch::default(),
        }
    }

    #[inline]
    pub fn params(&self) -> &ScannerParams {
        &self.params
    }

    #[inline]
    pub fn math(&self) -> &M {
        &self.math
    }

    pub fn cache(&self) -> &TextureCache {
        &self.cache
    }

    pub fn registry(&self) -> &TargetRegistry {
        &self.registry
    }

    pub fn target(&self, name: &str) -> Option<&TargetRecord> {
        self.registry.get(name)
    }

    pub fn targets(&self) -> impl Iterator<Item = &TargetRecord> {
        self.registry.iter()
    }

    pub fn state(&self, name: &str) -> Option<TargetState> {
        self.registry.get(name).map(|r| r.state)
    }

    pub fn phase(&self, name: &str) -> Option<TargetPhase> {
        self.registry.get(name).map(|r| r.phase)
    }

    /// Texture of the latest capture for `name`, if it was ever captured.
    pub fn captured_texture(&self, name: &str) -> Option<TextureHandle> {
        self.cache.get(name)
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&CaptureEvent) + 'static) -> SubscriptionId {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Merge a target observation. Returns the resulting phase.
    pub fn observe(&mut self, obs: &TargetObservation) -> TargetPhase {
        let (idx, inserted) = self.registry.merge(obs);
        if inserted {
            log::info!(
                "target '{}' registered ({:.3} x {:.3} m)",
                obs.name,
                obs.physical_size[0],
                obs.physical_size[1]
            );
        }
        self.registry
            .record(idx)
            .map(|r| r.phase)
            .unwrap_or(TargetPhase::Discovered)
    }

    /// Pre-register a target by name. It stays Discovered until observed.
    /// Returns `false` if the name is already known.
    pub fn register_target(&mut self, name: &str, physical_size: [f32; 2]) -> bool {
        self.registry.register(name, physical_size).1
    }

    /// Mark a target as no longer tracked. Its record, best score and texture
    /// are kept. Unknown names are a no-op.
    pub fn target_lost(&mut self, name: &str) -> bool {
        match self.registry.get_mut(name) {
            Some(rec) => {
                rec.tracking_active = false;
                true
            }
            None => {
                log::debug!("target_lost: unknown target '{}'", name);
                false
            }
        }
    }

    /// Clear lock and best score so the target is evaluated again.
    pub fn reset(&mut self, name: &str) -> bool {
        match self.registry.get_mut(name) {
            Some(rec) => {
                reset_record(rec);
                log::info!("target '{}' reset", name);
                true
            }
            None => {
                log::debug!("reset: unknown target '{}'", name);
                false
            }
        }
    }

    pub fn reset_all(&mut self) {
        for rec in self.registry.iter_mut() {
            reset_record(rec);
        }
    }

    /// Force one rectification on the next evaluation regardless of score.
    ///
    /// Refused for unknown and locked targets. The request is consumed by the
    /// next capture attempt, successful or not.
    pub fn request_capture(&mut self, name: &str) -> bool {
        match self.registry.get_mut(name) {
            Some(rec) if rec.phase != TargetPhase::Locked => {
                rec.capture_requested = true;
                true
            }
            Some(_) => {
                log::debug!("request_capture: '{}' is locked", name);
                false
            }
            None => {
                log::debug!("request_capture: unknown target '{}'", name);
                false
            }
        }
    }

    /// Run one frame of the scan loop.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(frame = tick.index))
    )]
    pub fn tick<S, D>(&mut self, source: &mut S, device: &mut D, tick: FrameTick) -> TickReport
    where
        S: TargetSource,
        D: GpuDevice + ?Sized,
    {
        let mut report = TickReport::new(tick.index);

        for obs in source.drain_observations() {
            let known = self.registry.index_of(&obs.name).is_some();
            self.observe(&obs);
            if !known {
                report.discovered.push(obs.name);
            }
        }

        let Some(camera) = source.camera() else {
            log::debug!("no camera at frame {}", tick.index);
            return report;
        };

        let dt = if tick.dt.is_finite() && tick.dt > 0.0 {
            tick.dt
        } else {
            0.0
        };
        let interval = self.params.evaluation_interval;
        let elapsed = if interval > 0.0 {
            self.pending_dt += dt;
            if self.pending_dt < interval {
                report.outcome = TickOutcome::Throttled;
                return report;
            }
            std::mem::take(&mut self.pending_dt)
        } else {
            dt
        };

        // First evaluation compares the camera against itself.
        let last = self.last_camera.unwrap_or(camera.pose);
        self.last_camera = Some(camera.pose);
        let stable = self
            .math
            .is_stable(&camera.pose, &last, elapsed, &self.params.motion);
        report.stable = stable;
        if !stable {
            report.outcome = TickOutcome::Unstable;
            log::debug!("frame {}: camera unstable, skipping evaluation", tick.index);
            return report;
        }
        report.outcome = TickOutcome::Evaluated;

        let screen = camera.screen_size();
        let display = source.display_matrix();
        let mut feed: Option<Option<TextureHandle>> = None;

        for idx in 0..self.registry.len() {
            let Some(rec) = self.registry.record(idx) else {
                continue;
            };
            if !rec.is_evaluable() {
                continue;
            }
            let Some(pose) = rec.pose.get() else {
                continue;
            };
            let name = rec.name.clone();
            let physical = rec.physical_size;
            let best = rec.state.best_score;
            let manual = rec.capture_requested;

            let score = self.math.quality(
                &QualityInput {
                    camera_position: camera.pose.position,
                    camera_forward: camera.forward(),
                    target_position: pose.position,
                    target_up: pose.up(),
                    target_screen: camera.world_to_screen(&pose.position),
                    screen,
                },
                &self.params.quality,
            );
            report.feedback.push(TargetFeedback {
                name: name.clone(),
                score,
                progress: self.params.progress(score),
                stable,
            });

            let improved = score > best + self.params.min_improvement;
            if let Some(rec) = self.registry.record_mut(idx) {
                rec.last_score = score;
                if improved || manual {
                    rec.capture_requested = false;
                }
            }
            if !(improved || manual) {
                continue;
            }

            let attempt = capture::CaptureAttempt {
                idx,
                name: &name,
                pose: &pose,
                physical,
                score,
                camera: &camera,
                display: display.as_ref(),
                frame: tick.index,
            };
            self.capture(source, device, &mut feed, attempt, &mut report);
        }

        report
    }

    /// Release every cached capture texture and drop all observers.
    /// Returns the number of textures freed.
    pub fn teardown<D: GpuDevice + ?Sized>(&mut self, device: &mut D) -> usize {
        self.observers.clear();
        self.last_camera = None;
        self.pending_dt = 0.0;
        let freed = self.cache.release_all(device);
        log::debug!("scan coordinator released {} capture textures", freed);
        freed
    }
}

fn reset_record(rec: &mut TargetRecord) {
    rec.state = TargetState::default();
    rec.capture_requested = false;
    if rec.phase == TargetPhase::Locked {
        rec.phase = TargetPhase::Evaluating;
    }
}
