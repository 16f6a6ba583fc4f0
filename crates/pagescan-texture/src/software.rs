//! CPU implementation of [`GpuDevice`].
//!
//! Surfaces are stored as [`RgbaImage`]s with row 0 at the top. Texture UV
//! space has its origin at the bottom-left, so `v` runs against the row index.

use std::collections::HashMap;

use nalgebra::{Matrix4, Point2, Vector4};
use pagescan_core::{sample_bilinear_rgba, RgbaImage, RgbaImageView};

use crate::device::{GpuDevice, TextureDescriptor, TextureHandle, UnwarpPass};
use crate::error::TextureError;
use crate::format::PixelFormat;

#[derive(Clone, Debug)]
struct Surface {
    format: PixelFormat,
    image: RgbaImage,
}

#[derive(Clone, Debug)]
pub struct SoftwareDevice {
    formats: Vec<PixelFormat>,
    surfaces: HashMap<TextureHandle, Surface>,
    next_id: u32,
    created: usize,
    released: usize,
    uploads: usize,
    draws: usize,
}

impl Default for SoftwareDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareDevice {
    /// A device that can render to every [`PixelFormat`].
    pub fn new() -> Self {
        Self::with_formats(&[
            PixelFormat::Rgb565,
            PixelFormat::Rgba8,
            PixelFormat::PlatformDefault,
        ])
    }

    /// A device limited to `formats`, for exercising format fallback.
    pub fn with_formats(formats: &[PixelFormat]) -> Self {
        Self {
            formats: formats.to_vec(),
            surfaces: HashMap::new(),
            next_id: 1,
            created: 0,
            released: 0,
            uploads: 0,
            draws: 0,
        }
    }

    /// Current contents of a live texture.
    pub fn read_pixels(&self, handle: TextureHandle) -> Option<&RgbaImage> {
        self.surfaces.get(&handle).map(|s| &s.image)
    }

    pub fn texture_format(&self, handle: TextureHandle) -> Option<PixelFormat> {
        self.surfaces.get(&handle).map(|s| s.format)
    }

    pub fn live_textures(&self) -> usize {
        self.surfaces.len()
    }

    pub fn created_count(&self) -> usize {
        self.created
    }

    pub fn released_count(&self) -> usize {
        self.released
    }

    pub fn upload_count(&self) -> usize {
        self.uploads
    }

    pub fn draw_count(&self) -> usize {
        self.draws
    }
}

/// Texel-center UV of pixel `(x, y)` in a `w x h` surface.
#[inline]
fn texel_uv(x: usize, y: usize, w: usize, h: usize) -> Point2<f32> {
    Point2::new(
        (x as f32 + 0.5) / w as f32,
        1.0 - (y as f32 + 0.5) / h as f32,
    )
}

/// Bilinear fetch at UV with the bottom-left origin.
#[inline]
fn sample_uv(src: &RgbaImageView<'_>, uv: Point2<f32>) -> [u8; 4] {
    let x = uv.x * src.width as f32 - 0.5;
    let y = (1.0 - uv.y) * src.height as f32 - 0.5;
    sample_bilinear_rgba(src, x, y)
}

#[inline]
fn apply_display(display: &Matrix4<f32>, uv: Point2<f32>) -> Point2<f32> {
    let p = display * Vector4::new(uv.x, uv.y, 0.0, 1.0);
    if p.w.abs() > f32::EPSILON && p.w != 1.0 {
        Point2::new(p.x / p.w, p.y / p.w)
    } else {
        Point2::new(p.x, p.y)
    }
}

impl GpuDevice for SoftwareDevice {
    fn supports_format(&self, format: PixelFormat) -> bool {
        self.formats.contains(&format)
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> Result<TextureHandle, TextureError> {
        if desc.width == 0 || desc.height == 0 {
            return Err(TextureError::ZeroSized {
                width: desc.width,
                height: desc.height,
            });
        }
        if !self.supports_format(desc.format) {
            return Err(TextureError::NoSupportedFormat {
                tried: vec![desc.format],
            });
        }
        let handle = TextureHandle(self.next_id);
        self.next_id += 1;
        let clear = desc.format.quantize([0, 0, 0, 0]);
        self.surfaces.insert(
            handle,
            Surface {
                format: desc.format,
                image: RgbaImage::filled(desc.width as usize, desc.height as usize, clear),
            },
        );
        self.created += 1;
        Ok(handle)
    }

    fn release_texture(&mut self, handle: TextureHandle) -> bool {
        let existed = self.surfaces.remove(&handle).is_some();
        if existed {
            self.released += 1;
        }
        existed
    }

    fn texture_extent(&self, handle: TextureHandle) -> Option<[u32; 2]> {
        self.surfaces
            .get(&handle)
            .map(|s| [s.image.width as u32, s.image.height as u32])
    }

    fn upload_frame(
        &mut self,
        destination: TextureHandle,
        frame: &RgbaImageView<'_>,
    ) -> Result<(), TextureError> {
        let surface = self
            .surfaces
            .get_mut(&destination)
            .ok_or(TextureError::UnknownHandle(destination))?;
        let (w, h) = (surface.image.width, surface.image.height);
        let format = surface.format;
        for y in 0..h {
            for x in 0..w {
                let px = if frame.width == 0 || frame.height == 0 {
                    [0, 0, 0, 0]
                } else {
                    sample_uv(frame, texel_uv(x, y, w, h))
                };
                surface.image.data[y * w + x] = format.quantize(px);
            }
        }
        self.uploads += 1;
        Ok(())
    }

    fn draw_unwarp(&mut self, pass: &UnwarpPass) {
        let Some(h) = pass.unwarp.homography() else {
            log::warn!("dropping unwarp draw with rejected matrix");
            return;
        };
        if pass.source == pass.destination {
            log::warn!("dropping unwarp draw reading and writing {:?}", pass.source);
            return;
        }
        // Take the destination out so the source can be borrowed alongside it.
        let Some(mut dst) = self.surfaces.remove(&pass.destination) else {
            log::warn!("unwarp destination {:?} is not live", pass.destination);
            return;
        };
        match self.surfaces.get(&pass.source) {
            Some(src) => {
                let src_view = src.image.view();
                let (w, ht) = (dst.image.width, dst.image.height);
                for y in 0..ht {
                    for x in 0..w {
                        let screen_uv = h.apply(texel_uv(x, y, w, ht));
                        let uv = apply_display(&pass.display, screen_uv);
                        let px = if uv.x.is_finite() && uv.y.is_finite() {
                            sample_uv(&src_view, uv)
                        } else {
                            [0, 0, 0, 0]
                        };
                        dst.image.data[y * w + x] = dst.format.quantize(px);
                    }
                }
                self.draws += 1;
            }
            None => log::warn!("unwarp source {:?} is not live", pass.source),
        }
        self.surfaces.insert(pass.destination, dst);
    }
}
