//! JSON configuration for a scan session.

use std::{fs, path::Path};

use pagescan_core::{MotionLimits, QualityParams};
use pagescan_scanner::ScannerParams;
use pagescan_texture::PixelFormat;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum ConfigIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("capture_threshold must be in [0, 1], got {0}")]
    ThresholdOutOfRange(f32),
    #[error("{field} must be finite and non-negative, got {value}")]
    Negative { field: &'static str, value: f32 },
    #[error("min_scan_distance {min} exceeds max_scan_distance {max}")]
    DistanceBand { min: f32, max: f32 },
    #[error("{0} must be non-zero")]
    ZeroResolution(&'static str),
    #[error("format_preference is empty")]
    EmptyFormatPreference,
    #[error("target '{0}' needs a non-empty name and positive physical size")]
    InvalidTarget(String),
}

/// A target known before the tracker reports it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub name: String,
    /// Printed size in meters (width, height).
    pub physical_size: [f32; 2],
}

/// Static configuration of a scan session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub capture_threshold: f32,
    pub auto_lock: bool,
    /// Meters per second.
    pub max_move_speed: f32,
    /// Degrees per second.
    pub max_rotate_speed: f32,
    pub min_scan_distance: f32,
    pub max_scan_distance: f32,
    pub distance_penalty_multiplier: f32,
    pub angle_weight: f32,
    pub center_weight: f32,
    /// Side of the square capture textures in pixels.
    pub output_resolution: u32,
    /// Cap on the long side of the shared camera texture.
    pub max_camera_feed_resolution: u32,
    pub min_improvement: f32,
    /// Seconds between evaluations; `0` evaluates every tick.
    pub evaluation_interval: f32,
    pub format_preference: Vec<PixelFormat>,
    pub targets: Vec<TargetSpec>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        let scanner = ScannerParams::default();
        Self {
            capture_threshold: scanner.capture_threshold,
            auto_lock: scanner.auto_lock,
            max_move_speed: scanner.motion.max_move_speed,
            max_rotate_speed: scanner.motion.max_rotate_speed,
            min_scan_distance: scanner.quality.min_scan_distance,
            max_scan_distance: scanner.quality.max_scan_distance,
            distance_penalty_multiplier: scanner.quality.distance_penalty,
            angle_weight: scanner.quality.angle_weight,
            center_weight: scanner.quality.center_weight,
            output_resolution: 1024,
            max_camera_feed_resolution: 1920,
            min_improvement: scanner.min_improvement,
            evaluation_interval: scanner.evaluation_interval,
            format_preference: PixelFormat::DEFAULT_PREFERENCE.to_vec(),
            targets: Vec::new(),
        }
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

impl ScanConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.capture_threshold) {
            return Err(ConfigError::ThresholdOutOfRange(self.capture_threshold));
        }
        non_negative("max_move_speed", self.max_move_speed)?;
        non_negative("max_rotate_speed", self.max_rotate_speed)?;
        non_negative("min_scan_distance", self.min_scan_distance)?;
        non_negative("max_scan_distance", self.max_scan_distance)?;
        non_negative("distance_penalty_multiplier", self.distance_penalty_multiplier)?;
        non_negative("angle_weight", self.angle_weight)?;
        non_negative("center_weight", self.center_weight)?;
        non_negative("min_improvement", self.min_improvement)?;
        non_negative("evaluation_interval", self.evaluation_interval)?;
        if self.min_scan_distance > self.max_scan_distance {
            return Err(ConfigError::DistanceBand {
                min: self.min_scan_distance,
                max: self.max_scan_distance,
            });
        }
        if self.output_resolution == 0 {
            return Err(ConfigError::ZeroResolution("output_resolution"));
        }
        if self.max_camera_feed_resolution == 0 {
            return Err(ConfigError::ZeroResolution("max_camera_feed_resolution"));
        }
        if self.format_preference.is_empty() {
            return Err(ConfigError::EmptyFormatPreference);
        }
        for t in &self.targets {
            let [w, h] = t.physical_size;
            if t.name.is_empty() || !(w > 0.0 && h > 0.0 && w.is_finite() && h.is_finite()) {
                return Err(ConfigError::InvalidTarget(t.name.clone()));
            }
        }
        Ok(())
    }

    pub fn scanner_params(&self) -> ScannerParams {
        ScannerParams {
            capture_threshold: self.capture_threshold,
            auto_lock: self.auto_lock,
            motion: MotionLimits {
                max_move_speed: self.max_move_speed,
                max_rotate_speed: self.max_rotate_speed,
            },
            quality: QualityParams {
                angle_weight: self.angle_weight,
                center_weight: self.center_weight,
                min_scan_distance: self.min_scan_distance,
                max_scan_distance: self.max_scan_distance,
                distance_penalty: self.distance_penalty_multiplier,
            },
            min_improvement: self.min_improvement,
            evaluation_interval: self.evaluation_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_and_match_documented_values() {
        let cfg = ScanConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.capture_threshold, 0.85);
        assert!(cfg.auto_lock);
        assert_eq!(cfg.output_resolution, 1024);
        assert_eq!(cfg.max_camera_feed_resolution, 1920);
        assert_eq!(cfg.format_preference[0], PixelFormat::Rgb565);
        assert_eq!(cfg.scanner_params(), ScannerParams::default());
    }

    #[test]
    fn rejects_bad_values() {
        let bad = [
            ScanConfig {
                capture_threshold: 1.5,
                ..Default::default()
            },
            ScanConfig {
                max_move_speed: -1.0,
                ..Default::default()
            },
            ScanConfig {
                min_scan_distance: 2.0,
                max_scan_distance: 1.0,
                ..Default::default()
            },
            ScanConfig {
                output_resolution: 0,
                ..Default::default()
            },
            ScanConfig {
                format_preference: vec![],
                ..Default::default()
            },
            ScanConfig {
                targets: vec![TargetSpec {
                    name: "Page1".into(),
                    physical_size: [0.0, 0.3],
                }],
                ..Default::default()
            },
        ];
        for cfg in bad {
            assert!(cfg.validate().is_err(), "{cfg:?}");
        }
    }

    #[test]
    fn json_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.json");
        let cfg = ScanConfig {
            auto_lock: false,
            targets: vec![TargetSpec {
                name: "Cover".into(),
                physical_size: [0.21, 0.297],
            }],
            ..Default::default()
        };
        cfg.write_json(&path).unwrap();
        assert_eq!(ScanConfig::load_json(&path).unwrap(), cfg);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: ScanConfig =
            serde_json::from_str(r#"{"capture_threshold":0.7,"format_preference":["rgba8"]}"#)
                .unwrap();
        assert_eq!(cfg.capture_threshold, 0.7);
        assert_eq!(cfg.format_preference, vec![PixelFormat::Rgba8]);
        assert_eq!(cfg.angle_weight, 0.6);
    }
}
