//! Composition root: one object owning the whole capture pipeline.

use pagescan_core::{MathProvider, ReferenceMath};
use pagescan_scanner::{FrameTick, ScanCoordinator, TickReport};
use pagescan_source::{ArBridge, ReferenceLibrary, TargetSource};
use pagescan_texture::{GpuDevice, SoftwareDevice, TextureCache, TextureError};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::config::{ConfigError, ScanConfig};

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Texture(#[from] TextureError),
}

/// Owns device, source, coordinator and math provider for one scan session.
///
/// [`ScanSession::shutdown`] (or dropping the session) releases every capture
/// texture and the shared camera texture exactly once.
pub struct ScanSession<D: GpuDevice, S: TargetSource, M: MathProvider = ReferenceMath> {
    device: D,
    source: S,
    scanner: ScanCoordinator<M>,
    frame: u64,
    released: bool,
}

impl ScanSession<SoftwareDevice, ArBridge, ReferenceMath> {
    /// Headless session on the CPU device, fed through an [`ArBridge`].
    pub fn software(config: &ScanConfig, library: ReferenceLibrary) -> Result<Self, SessionError> {
        let bridge = ArBridge::new(library, config.max_camera_feed_resolution);
        Self::new(config, SoftwareDevice::new(), bridge, ReferenceMath)
    }
}

impl<D: GpuDevice, S: TargetSource, M: MathProvider> ScanSession<D, S, M> {
    pub fn new(config: &ScanConfig, device: D, source: S, math: M) -> Result<Self, SessionError> {
        config.validate()?;
        let cache = TextureCache::new(&device, config.output_resolution, &config.format_preference)?;
        let mut scanner = ScanCoordinator::new(config.scanner_params(), math, cache);
        for target in &config.targets {
            scanner.register_target(&target.name, target.physical_size);
        }
        log::info!(
            "scan session ready: {} pre-registered targets",
            config.targets.len()
        );
        Ok(Self {
            device,
            source,
            scanner,
            frame: 0,
            released: false,
        })
    }

    /// Advance one rendered frame.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub fn tick(&mut self, dt: f32) -> TickReport {
        self.frame += 1;
        self.scanner.tick(
            &mut self.source,
            &mut self.device,
            FrameTick {
                index: self.frame,
                dt,
            },
        )
    }

    /// Frames ticked so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn scanner(&self) -> &ScanCoordinator<M> {
        &self.scanner
    }

    pub fn scanner_mut(&mut self) -> &mut ScanCoordinator<M> {
        &mut self.scanner
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn is_shut_down(&self) -> bool {
        self.released
    }

    /// Release all GPU resources. Returns how many capture textures were
    /// freed; later calls return 0.
    pub fn shutdown(&mut self) -> usize {
        if self.released {
            return 0;
        }
        self.released = true;
        let freed = self.scanner.teardown(&mut self.device);
        self.source.release(&mut self.device);
        log::info!("scan session shut down after {} frames", self.frame);
        freed
    }
}

impl<D: GpuDevice, S: TargetSource, M: MathProvider> Drop for ScanSession<D, S, M> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TargetSpec;
    use pagescan_scanner::TargetPhase;
    use pagescan_texture::PixelFormat;

    #[test]
    fn invalid_config_is_refused() {
        let cfg = ScanConfig {
            capture_threshold: -0.1,
            ..Default::default()
        };
        assert!(matches!(
            ScanSession::software(&cfg, ReferenceLibrary::default()),
            Err(SessionError::Config(_))
        ));
    }

    #[test]
    fn unsupported_formats_are_refused() {
        let cfg = ScanConfig {
            format_preference: vec![PixelFormat::Rgb565],
            ..Default::default()
        };
        let device = SoftwareDevice::with_formats(&[PixelFormat::Rgba8]);
        let bridge = ArBridge::new(ReferenceLibrary::default(), 64);
        assert!(matches!(
            ScanSession::new(&cfg, device, bridge, ReferenceMath),
            Err(SessionError::Texture(TextureError::NoSupportedFormat { .. }))
        ));
    }

    #[test]
    fn preregistered_targets_start_discovered() {
        let cfg = ScanConfig {
            targets: vec![TargetSpec {
                name: "Page1".into(),
                physical_size: [0.2, 0.3],
            }],
            ..Default::default()
        };
        let mut session = ScanSession::software(&cfg, ReferenceLibrary::default()).unwrap();
        assert_eq!(
            session.scanner().phase("Page1"),
            Some(TargetPhase::Discovered)
        );
        let report = session.tick(1.0 / 60.0);
        assert_eq!(session.frame(), 1);
        assert!(report.captures.is_empty());
        assert_eq!(session.shutdown(), 0);
        assert!(session.is_shut_down());
    }
}
