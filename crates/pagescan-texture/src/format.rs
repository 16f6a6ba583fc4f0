use crate::device::GpuDevice;
use crate::error::TextureError;
use serde::{Deserialize, Serialize};

/// Render-target pixel formats the capture pipeline can ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// 16-bit packed RGB, 5/6/5 bits, opaque.
    Rgb565,
    /// 8 bits per channel RGBA.
    Rgba8,
    /// Whatever the platform uses for its default render target.
    PlatformDefault,
}

impl PixelFormat {
    /// Compact first, then the widely supported format, then the platform default.
    pub const DEFAULT_PREFERENCE: [PixelFormat; 3] = [
        PixelFormat::Rgb565,
        PixelFormat::Rgba8,
        PixelFormat::PlatformDefault,
    ];

    /// Round-trip an RGBA8 pixel through this format's storage precision.
    #[inline]
    pub fn quantize(self, px: [u8; 4]) -> [u8; 4] {
        match self {
            PixelFormat::Rgb565 => {
                let r = px[0] >> 3;
                let g = px[1] >> 2;
                let b = px[2] >> 3;
                // Replicate high bits into the low bits on expansion.
                [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2), 255]
            }
            _ => px,
        }
    }
}

/// Pick the first format in `preference` the device can render to.
pub fn negotiate_format<D: GpuDevice + ?Sized>(
    device: &D,
    preference: &[PixelFormat],
) -> Result<PixelFormat, TextureError> {
    for &format in preference {
        if device.supports_format(format) {
            return Ok(format);
        }
        log::debug!("render format {:?} unsupported, trying next", format);
    }
    Err(TextureError::NoSupportedFormat {
        tried: preference.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::software::SoftwareDevice;

    #[test]
    fn picks_first_supported() {
        let device = SoftwareDevice::with_formats(&[PixelFormat::Rgba8, PixelFormat::PlatformDefault]);
        let f = negotiate_format(&device, &PixelFormat::DEFAULT_PREFERENCE).unwrap();
        assert_eq!(f, PixelFormat::Rgba8);
    }

    #[test]
    fn falls_back_to_platform_default() {
        let device = SoftwareDevice::with_formats(&[PixelFormat::PlatformDefault]);
        let f = negotiate_format(&device, &PixelFormat::DEFAULT_PREFERENCE).unwrap();
        assert_eq!(f, PixelFormat::PlatformDefault);
    }

    #[test]
    fn fails_only_when_every_candidate_is_unsupported() {
        let device = SoftwareDevice::with_formats(&[]);
        let err = negotiate_format(&device, &PixelFormat::DEFAULT_PREFERENCE).unwrap_err();
        assert_eq!(
            err,
            TextureError::NoSupportedFormat {
                tried: PixelFormat::DEFAULT_PREFERENCE.to_vec()
            }
        );
    }

    #[test]
    fn rgb565_drops_low_bits_and_alpha() {
        assert_eq!(PixelFormat::Rgb565.quantize([255, 255, 255, 0]), [255, 255, 255, 255]);
        assert_eq!(PixelFormat::Rgb565.quantize([0, 0, 0, 7]), [0, 0, 0, 255]);
        let q = PixelFormat::Rgb565.quantize([100, 100, 100, 255]);
        assert!(q[0].abs_diff(100) <= 8 && q[1].abs_diff(100) <= 4);
        assert_eq!(PixelFormat::Rgba8.quantize([1, 2, 3, 4]), [1, 2, 3, 4]);
    }

    #[test]
    fn serializes_snake_case() {
        let s = serde_json::to_string(&PixelFormat::PlatformDefault).unwrap();
        assert_eq!(s, "\"platform_default\"");
    }
}
