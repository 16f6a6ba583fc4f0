use std::collections::HashMap;

use crate::device::{GpuDevice, TextureDescriptor, TextureHandle};
use crate::error::TextureError;
use crate::format::{negotiate_format, PixelFormat};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// One persistent output texture per target name.
///
/// Slots are allocated lazily at a fixed square resolution and a format
/// negotiated once at construction. They are overwritten in place and never
/// reallocated; there is no eviction since the key space is the marker
/// library. Call [`TextureCache::release_all`] at teardown.
#[derive(Debug)]
pub struct TextureCache {
    resolution: u32,
    format: PixelFormat,
    slots: HashMap<String, TextureHandle>,
}

impl TextureCache {
    pub fn new<D: GpuDevice + ?Sized>(
        device: &D,
        resolution: u32,
        preference: &[PixelFormat],
    ) -> Result<Self, TextureError> {
        if resolution == 0 {
            return Err(TextureError::ZeroSized {
                width: 0,
                height: 0,
            });
        }
        let format = negotiate_format(device, preference)?;
        log::info!(
            "texture cache ready: {}x{} {:?}",
            resolution,
            resolution,
            format
        );
        Ok(Self {
            resolution,
            format,
            slots: HashMap::new(),
        })
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Texture for `name`, allocating it on first use.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self, device)))]
    pub fn get_or_create<D: GpuDevice + ?Sized>(
        &mut self,
        device: &mut D,
        name: &str,
    ) -> Result<TextureHandle, TextureError> {
        if let Some(&handle) = self.slots.get(name) {
            return Ok(handle);
        }
        let handle =
            device.create_texture(&TextureDescriptor::square(self.resolution, self.format))?;
        log::debug!("allocated capture texture {:?} for '{}'", handle, name);
        self.slots.insert(name.to_owned(), handle);
        Ok(handle)
    }

    pub fn get(&self, name: &str) -> Option<TextureHandle> {
        self.slots.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Release every slot; returns how many textures the device freed.
    pub fn release_all<D: GpuDevice + ?Sized>(&mut self, device: &mut D) -> usize {
        let mut freed = 0;
        for (name, handle) in self.slots.drain() {
            if device.release_texture(handle) {
                freed += 1;
            } else {
                log::warn!("capture texture for '{}' was already released", name);
            }
        }
        freed
    }
}
