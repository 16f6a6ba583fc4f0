use nalgebra::Matrix4;
use pagescan_core::UnwarpMatrix;

use crate::device::{GpuDevice, TextureHandle, UnwarpPass};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Issues the unwarp blit from the shared camera texture into a capture slot.
#[derive(Clone, Copy, Debug, Default)]
pub struct Rectifier;

impl Rectifier {
    /// Draw `source` through `unwarp` into `destination`.
    ///
    /// `display` is the platform display-orientation matrix; `None` means
    /// identity. Rejected matrices never reach the device.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, device, unwarp, display))
    )]
    pub fn rectify<D: GpuDevice + ?Sized>(
        &self,
        device: &mut D,
        destination: TextureHandle,
        source: TextureHandle,
        unwarp: &UnwarpMatrix,
        display: Option<&Matrix4<f32>>,
    ) {
        if unwarp.is_rejected() {
            log::debug!("skipping rectify into {:?}: rejected unwarp", destination);
            return;
        }
        device.draw_unwarp(&UnwarpPass {
            source,
            destination,
            unwarp: *unwarp,
            display: display.copied().unwrap_or_else(Matrix4::identity),
        });
    }
}
