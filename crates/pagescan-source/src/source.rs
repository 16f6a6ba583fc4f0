use nalgebra::Matrix4;
use pagescan_texture::{GpuDevice, TextureHandle};

use crate::camera::Camera;
use crate::pose::PoseRef;

/// A target as reported by the tracking subsystem.
#[derive(Clone, Debug)]
pub struct TargetObservation {
    pub name: String,
    /// Printed size in meters (width, height).
    pub physical_size: [f32; 2],
    pub pose: PoseRef,
    pub tracking_active: bool,
}

/// What the scan coordinator needs from the tracking side.
pub trait TargetSource {
    /// Observations collected since the last call, oldest first.
    fn drain_observations(&mut self) -> Vec<TargetObservation>;

    /// Camera for screen-space projection; `None` until the tracker is up.
    fn camera(&self) -> Option<Camera>;

    /// Shared camera texture for `frame`, composited at most once per frame.
    /// `None` while the camera background is unavailable.
    fn camera_feed_texture<D: GpuDevice + ?Sized>(
        &mut self,
        device: &mut D,
        frame: u64,
    ) -> Option<TextureHandle>;

    /// Latest display-orientation matrix, if the platform published one.
    fn display_matrix(&self) -> Option<Matrix4<f32>> {
        None
    }

    /// Release GPU resources owned by the source.
    fn release<D: GpuDevice + ?Sized>(&mut self, device: &mut D);
}
