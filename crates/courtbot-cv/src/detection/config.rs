//! Detection configuration

use crate::capture::Region;
use crate::debug::DEFAULT_CAPACITY;
use crate::template::MatcherConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything the detector needs besides the references themselves
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub matcher: MatcherConfig,
    pub debug: DebugConfig,
    pub capture_region: Option<Region>,
}

/// Debug artifact configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
    pub capacity: usize,
    /// Mirror retained artifacts to disk when set
    pub output_dir: Option<PathBuf>,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: DEFAULT_CAPACITY,
            output_dir: None,
        }
    }
}

impl DebugConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}
