use nalgebra::{Matrix4, Point2};
use pagescan_core::{MathProvider, Pose};
use pagescan_source::{Camera, TargetSource};
use pagescan_texture::{GpuDevice, TextureHandle};

use super::ScanCoordinator;
use crate::events::CaptureEvent;
use crate::registry::TargetPhase;
use crate::report::{CaptureRejection, TickReport};

pub(super) struct CaptureAttempt<'a> {
    pub idx: usize,
    pub name: &'a str,
    pub pose: &'a Pose,
    pub physical: [f32; 2],
    pub score: f32,
    pub camera: &'a Camera,
    pub display: Option<&'a Matrix4<f32>>,
    pub frame: u64,
}

impl<M: MathProvider> ScanCoordinator<M> {
    /// Project, solve, rectify and commit one capture.
    ///
    /// Any rejection leaves the target state untouched.
    pub(super) fn capture<S, D>(
        &mut self,
        source: &mut S,
        device: &mut D,
        feed: &mut Option<Option<TextureHandle>>,
        attempt: CaptureAttempt<'_>,
        report: &mut TickReport,
    ) where
        S: TargetSource,
        D: GpuDevice + ?Sized,
    {
        let name = attempt.name;
        let reject = |report: &mut TickReport, reason: CaptureRejection| {
            log::debug!("capture of '{}' rejected: {:?}", name, reason);
            report.rejected.push((name.to_owned(), reason));
        };

        let corners = attempt.pose.plane_corners(attempt.physical);
        for (dst, world) in self.scratch.corners.iter_mut().zip(corners.iter()) {
            let p = attempt.camera.world_to_screen(world);
            if !(p.z > 0.0) {
                reject(report, CaptureRejection::BehindCamera);
                return;
            }
            *dst = Point2::new(p.x, p.y);
        }

        self.scratch.unwarp = self.math.homography(
            attempt.physical,
            attempt.camera.screen_size(),
            &self.scratch.corners,
        );
        if self.scratch.unwarp.is_rejected() {
            reject(report, CaptureRejection::DegenerateGeometry);
            return;
        }

        // All targets in a tick rectify from the same feed frame.
        let source_tex = *feed.get_or_insert_with(|| source.camera_feed_texture(device, attempt.frame));
        let Some(source_tex) = source_tex else {
            reject(report, CaptureRejection::FeedUnavailable);
            return;
        };

        let slot = match self.cache.get_or_create(device, name) {
            Ok(slot) => slot,
            Err(err) => {
                log::warn!("no capture texture for '{}': {}", name, err);
                reject(report, CaptureRejection::TextureUnavailable);
                return;
            }
        };

        self.rectifier.rectify(
            device,
            slot,
            source_tex,
            &self.scratch.unwarp,
            attempt.display,
        );

        let threshold = self.params.capture_threshold;
        let auto_lock = self.params.auto_lock;
        let Some(rec) = self.registry.record_mut(attempt.idx) else {
            return;
        };
        rec.state.best_score = rec.state.best_score.max(attempt.score);
        let lock = auto_lock && rec.state.best_score >= threshold;
        if lock {
            rec.state.locked = true;
            rec.phase = TargetPhase::Locked;
        }

        log::info!(
            "captured '{}' score {:.3} into {:?}",
            name,
            attempt.score,
            slot
        );
        let event = CaptureEvent {
            target_name: name.to_owned(),
            texture: slot,
            score: attempt.score,
        };
        self.observers.emit(&event);
        report.captures.push(event);
        if lock {
            log::info!("target '{}' locked", name);
            report.locked.push(name.to_owned());
        }
    }
}
