//! GPU texture resources for page scanning.
//!
//! Owns the three pieces of the capture pipeline that touch the GPU:
//!
//! - pixel-format negotiation over a capability-ordered fallback list,
//! - the [`TextureCache`] holding one persistent output texture per target name,
//! - the [`Rectifier`] that blits the shared camera texture through an unwarp
//!   homography into a cached slot.
//!
//! The GPU itself sits behind the [`GpuDevice`] trait. [`SoftwareDevice`] is a
//! CPU implementation used by tests, replay and headless tooling.
//!
//! ## Quickstart
//!
//! ```
//! use pagescan_texture::{PixelFormat, SoftwareDevice, TextureCache};
//!
//! let mut device = SoftwareDevice::new();
//! let mut cache = TextureCache::new(&device, 256, &PixelFormat::DEFAULT_PREFERENCE).unwrap();
//! let a = cache.get_or_create(&mut device, "Page1").unwrap();
//! let b = cache.get_or_create(&mut device, "Page1").unwrap();
//! assert_eq!(a, b);
//! cache.release_all(&mut device);
//! ```

mod cache;
mod device;
mod error;
mod format;
mod rectify;
mod software;

pub use cache::TextureCache;
pub use device::{GpuDevice, TextureDescriptor, TextureHandle, UnwarpPass};
pub use error::TextureError;
pub use format::{negotiate_format, PixelFormat};
pub use rectify::Rectifier;
pub use software::SoftwareDevice;
