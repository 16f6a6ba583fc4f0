use pagescan_core::RgbaImageView;
use pagescan_texture::{
    negotiate_format, GpuDevice, PixelFormat, TextureDescriptor, TextureError, TextureHandle,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Formats tried for the shared camera texture.
pub const FEED_FORMAT_PREFERENCE: [PixelFormat; 2] =
    [PixelFormat::Rgba8, PixelFormat::PlatformDefault];

/// Feed texture size: screen aspect, long side capped at `max_resolution`.
pub fn feed_extent(screen_width: u32, screen_height: u32, max_resolution: u32) -> [u32; 2] {
    let long = screen_width.max(screen_height).max(1);
    let scale = (max_resolution as f64 / long as f64).min(1.0);
    let w = ((screen_width as f64 * scale).round() as u32).max(1);
    let h = ((screen_height as f64 * scale).round() as u32).max(1);
    [w, h]
}

/// The shared camera texture every target rectifies from.
///
/// [`CameraFeed::refresh`] blits the camera background at most once per
/// frame index; later calls in the same frame return the memoized handle so
/// all targets in a tick see the same source image. Nothing else writes to
/// the texture.
#[derive(Debug)]
pub struct CameraFeed {
    max_resolution: u32,
    texture: Option<TextureHandle>,
    extent: [u32; 2],
    last_frame: Option<u64>,
}

impl CameraFeed {
    pub fn new(max_resolution: u32) -> Self {
        Self {
            max_resolution,
            texture: None,
            extent: [0, 0],
            last_frame: None,
        }
    }

    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    pub fn extent(&self) -> [u32; 2] {
        self.extent
    }

    /// Feed texture for `frame`, or `None` when no camera background is
    /// available yet.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "trace", skip(self, device, background))
    )]
    pub fn refresh<D: GpuDevice + ?Sized>(
        &mut self,
        device: &mut D,
        frame: u64,
        screen: [u32; 2],
        background: Option<&RgbaImageView<'_>>,
    ) -> Option<TextureHandle> {
        if self.last_frame == Some(frame) {
            return self.texture;
        }
        let Some(background) = background else {
            log::debug!("camera background not ready at frame {}", frame);
            return None;
        };

        let texture = match self.ensure_texture(device, screen) {
            Ok(t) => t,
            Err(err) => {
                log::warn!("camera feed texture unavailable: {}", err);
                return None;
            }
        };
        if let Err(err) = device.upload_frame(texture, background) {
            log::warn!("camera feed upload failed: {}", err);
            return None;
        }
        self.last_frame = Some(frame);
        Some(texture)
    }

    fn ensure_texture<D: GpuDevice + ?Sized>(
        &mut self,
        device: &mut D,
        screen: [u32; 2],
    ) -> Result<TextureHandle, TextureError> {
        let extent = feed_extent(screen[0], screen[1], self.max_resolution);
        if let Some(texture) = self.texture {
            if extent == self.extent {
                return Ok(texture);
            }
            // Screen rotated or resized.
            device.release_texture(texture);
            self.texture = None;
        }
        let format = negotiate_format(device, &FEED_FORMAT_PREFERENCE)?;
        let texture = device.create_texture(&TextureDescriptor {
            width: extent[0],
            height: extent[1],
            format,
        })?;
        log::debug!(
            "camera feed texture {:?}: {}x{} {:?}",
            texture,
            extent[0],
            extent[1],
            format
        );
        self.texture = Some(texture);
        self.extent = extent;
        Ok(texture)
    }

    /// Release the feed texture; `true` if one was live.
    pub fn release<D: GpuDevice + ?Sized>(&mut self, device: &mut D) -> bool {
        self.last_frame = None;
        self.extent = [0, 0];
        match self.texture.take() {
            Some(texture) => device.release_texture(texture),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagescan_core::RgbaImage;
    use pagescan_texture::SoftwareDevice;

    #[test]
    fn extent_keeps_aspect_under_cap() {
        assert_eq!(feed_extent(1080, 1920, 1920), [1080, 1920]);
        assert_eq!(feed_extent(2160, 3840, 1920), [1080, 1920]);
        assert_eq!(feed_extent(4000, 3000, 1000), [1000, 750]);
        assert_eq!(feed_extent(0, 0, 1920), [1, 1]);
    }

    #[test]
    fn refresh_is_memoized_per_frame() {
        let mut dev = SoftwareDevice::new();
        let mut feed = CameraFeed::new(64);
        let img = RgbaImage::filled(32, 64, [1, 2, 3, 255]);
        let a = feed.refresh(&mut dev, 7, [32, 64], Some(&img.view()));
        let b = feed.refresh(&mut dev, 7, [32, 64], Some(&img.view()));
        assert!(a.is_some());
        assert_eq!(a, b);
        assert_eq!(dev.upload_count(), 1);
        feed.refresh(&mut dev, 8, [32, 64], Some(&img.view()));
        assert_eq!(dev.upload_count(), 2);
        assert_eq!(dev.created_count(), 1);
        assert_eq!(dev.texture_extent(a.unwrap()), Some([32, 64]));
    }

    #[test]
    fn missing_background_is_not_fatal() {
        let mut dev = SoftwareDevice::new();
        let mut feed = CameraFeed::new(64);
        assert!(feed.refresh(&mut dev, 1, [32, 64], None).is_none());
        assert_eq!(dev.created_count(), 0);
        let img = RgbaImage::filled(4, 4, [0, 0, 0, 255]);
        assert!(feed.refresh(&mut dev, 1, [32, 64], Some(&img.view())).is_some());
    }

    #[test]
    fn screen_change_reallocates_and_release_frees() {
        let mut dev = SoftwareDevice::new();
        let mut feed = CameraFeed::new(64);
        let img = RgbaImage::filled(4, 4, [0, 0, 0, 255]);
        feed.refresh(&mut dev, 1, [32, 64], Some(&img.view()));
        feed.refresh(&mut dev, 2, [64, 32], Some(&img.view()));
        assert_eq!(feed.extent(), [64, 32]);
        assert_eq!(dev.live_textures(), 1);
        assert!(feed.release(&mut dev));
        assert!(!feed.release(&mut dev));
        assert_eq!(dev.live_textures(), 0);
    }
}
