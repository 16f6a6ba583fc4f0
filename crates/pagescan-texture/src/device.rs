use crate::error::TextureError;
use crate::format::PixelFormat;
use nalgebra::Matrix4;
use pagescan_core::{RgbaImageView, UnwarpMatrix};
use serde::{Deserialize, Serialize};

/// Opaque GPU texture id issued by a [`GpuDevice`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextureHandle(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl TextureDescriptor {
    pub fn square(size: u32, format: PixelFormat) -> Self {
        Self {
            width: size,
            height: size,
            format,
        }
    }
}

/// One rectification draw.
///
/// For every destination texel at UV `(u, v)` (origin bottom-left) the shader
/// maps `(u, v, 1)` through the unwarp homography into normalized screen UV,
/// then through `display` (applied to `(u', v', 0, 1)`) into source texture UV,
/// and samples `source` there.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnwarpPass {
    pub source: TextureHandle,
    pub destination: TextureHandle,
    pub unwarp: UnwarpMatrix,
    pub display: Matrix4<f32>,
}

/// The GPU operations the capture pipeline needs.
///
/// Implementations are driven from a single thread, one call at a time.
pub trait GpuDevice {
    fn supports_format(&self, format: PixelFormat) -> bool;

    fn create_texture(&mut self, desc: &TextureDescriptor) -> Result<TextureHandle, TextureError>;

    /// Free a texture; `false` if the handle was not live.
    fn release_texture(&mut self, handle: TextureHandle) -> bool;

    /// `(width, height)` of a live texture.
    fn texture_extent(&self, handle: TextureHandle) -> Option<[u32; 2]>;

    /// Blit a camera frame into `destination`, scaling to its extent.
    fn upload_frame(
        &mut self,
        destination: TextureHandle,
        frame: &RgbaImageView<'_>,
    ) -> Result<(), TextureError>;

    /// Issue one unwarp draw. Never fails; invalid passes are dropped.
    fn draw_unwarp(&mut self, pass: &UnwarpPass);
}
