//! High-level detection module

pub mod config;
pub mod detector;

pub use config::{DebugConfig, DetectionConfig};
pub use detector::Detector;
