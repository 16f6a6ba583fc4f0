//! Core types and math for printed-page scanning.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! know about GPUs, tracking subsystems, or per-target state; those live in
//! `pagescan-texture`, `pagescan-source` and `pagescan-scanner`.

mod geometry;
mod homography;
mod image;
mod logger;
mod math;

pub use geometry::Pose;
pub use homography::{
    homography_from_4pt, page_uv_rect, solve_page_homography, Homography, UnwarpMatrix,
};
pub use image::{sample_bilinear_rgba, RgbaImage, RgbaImageView};
pub use math::{
    MathProvider, MotionLimits, QualityInput, QualityParams, ReferenceMath, DT_FALLBACK,
    DT_MIN,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
