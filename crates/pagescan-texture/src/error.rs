use crate::device::TextureHandle;
use crate::format::PixelFormat;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TextureError {
    #[error("no supported pixel format among {tried:?}")]
    NoSupportedFormat { tried: Vec<PixelFormat> },
    #[error("texture size must be non-zero, got {width}x{height}")]
    ZeroSized { width: u32, height: u32 },
    #[error("unknown texture handle {0:?}")]
    UnknownHandle(TextureHandle),
}
