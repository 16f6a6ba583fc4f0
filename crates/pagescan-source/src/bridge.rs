use nalgebra::Matrix4;
use pagescan_core::RgbaImage;
use pagescan_texture::{GpuDevice, TextureHandle};

use crate::camera::Camera;
use crate::feed::CameraFeed;
use crate::source::{TargetObservation, TargetSource};
use crate::tracking::{ReferenceLibrary, TrackablesChanged, TrackedImageBridge};

/// [`TargetSource`] fed by host tracker callbacks.
///
/// The host forwards tracker batches through
/// [`ArBridge::on_trackables_changed`], camera frames through
/// [`ArBridge::on_camera_frame`] and the camera pose through
/// [`ArBridge::set_camera`]. The coordinator pulls from the other side.
#[derive(Debug)]
pub struct ArBridge {
    tracker: TrackedImageBridge,
    camera: Option<Camera>,
    background: Option<RgbaImage>,
    display: Option<Matrix4<f32>>,
    feed: CameraFeed,
    queued: Vec<TargetObservation>,
}

impl ArBridge {
    pub fn new(library: ReferenceLibrary, max_feed_resolution: u32) -> Self {
        Self {
            tracker: TrackedImageBridge::new(library),
            camera: None,
            background: None,
            display: None,
            feed: CameraFeed::new(max_feed_resolution),
            queued: Vec::new(),
        }
    }

    pub fn tracker(&self) -> &TrackedImageBridge {
        &self.tracker
    }

    pub fn feed(&self) -> &CameraFeed {
        &self.feed
    }

    pub fn on_trackables_changed(&mut self, change: &TrackablesChanged) {
        let observations = self.tracker.process(change);
        self.queued.extend(observations);
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = Some(camera);
    }

    /// Latest camera background image; `None` while the camera is not ready.
    pub fn set_background(&mut self, frame: Option<RgbaImage>) {
        self.background = frame;
    }

    /// Frame callback: new background plus the display matrix that came with it.
    pub fn on_camera_frame(&mut self, frame: RgbaImage, display: Option<Matrix4<f32>>) {
        self.background = Some(frame);
        if display.is_some() {
            self.display = display;
        }
    }

    pub fn set_display_matrix(&mut self, display: Matrix4<f32>) {
        self.display = Some(display);
    }
}

impl TargetSource for ArBridge {
    fn drain_observations(&mut self) -> Vec<TargetObservation> {
        std::mem::take(&mut self.queued)
    }

    fn camera(&self) -> Option<Camera> {
        self.camera
    }

    fn camera_feed_texture<D: GpuDevice + ?Sized>(
        &mut self,
        device: &mut D,
        frame: u64,
    ) -> Option<TextureHandle> {
        let screen = self
            .camera
            .map(|c| [c.screen_width, c.screen_height])
            .or_else(|| {
                self.background
                    .as_ref()
                    .map(|b| [b.width as u32, b.height as u32])
            })?;
        let view = self.background.as_ref().map(|b| b.view());
        self.feed.refresh(device, frame, screen, view.as_ref())
    }

    fn display_matrix(&self) -> Option<Matrix4<f32>> {
        self.display
    }

    fn release<D: GpuDevice + ?Sized>(&mut self, device: &mut D) {
        if self.feed.release(device) {
            log::debug!("released camera feed texture");
        }
    }
}
