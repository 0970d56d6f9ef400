//! Reference images and the scoring configuration

mod correlation;
pub mod loader;
pub mod matcher;

pub use loader::ReferenceLoader;
pub use matcher::{MethodScore, TemplateMatcher, MATCH_EPSILON};

use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Threshold applied when neither the caller nor the config names one.
pub const DEFAULT_THRESHOLD: f64 = 0.80;

/// Immutable labelled bitmap with its match threshold
#[derive(Debug, Clone)]
pub struct ReferenceImage {
    pub label: String,
    pub image: GrayImage,
    pub threshold: f64,
    pub path: Option<PathBuf>,
}

impl ReferenceImage {
    pub fn new(label: impl Into<String>, image: GrayImage) -> Self {
        Self {
            label: label.into(),
            image,
            threshold: DEFAULT_THRESHOLD,
            path: None,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.path = Some(path);
        self
    }
}

/// All references loaded at startup, keyed by label
#[derive(Debug, Clone, Default)]
pub struct ReferenceSet {
    references: BTreeMap<String, ReferenceImage>,
}

impl ReferenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, reference: ReferenceImage) {
        self.references.insert(reference.label.clone(), reference);
    }

    pub fn get(&self, label: &str) -> Option<&ReferenceImage> {
        self.references.get(label)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.references.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferenceImage> {
        self.references.values()
    }
}

impl FromIterator<ReferenceImage> for ReferenceSet {
    fn from_iter<T: IntoIterator<Item = ReferenceImage>>(iter: T) -> Self {
        let mut set = Self::new();
        for reference in iter {
            set.insert(reference);
        }
        set
    }
}

/// Template matching method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingMethod {
    /// Correlation coefficient (zero-mean NCC, robust to brightness offsets)
    CCoeffNormed,
    /// Normalized cross-correlation
    CCorrNormed,
    /// Normalized squared difference (inverted: lower is better)
    SqDiffNormed,
}

impl MatchingMethod {
    pub fn name(&self) -> &'static str {
        match self {
            MatchingMethod::CCoeffNormed => "ccoeff_normed",
            MatchingMethod::CCorrNormed => "ccorr_normed",
            MatchingMethod::SqDiffNormed => "sqdiff_normed",
        }
    }
}

impl fmt::Display for MatchingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Template matching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Methods scored on every call; order breaks ties
    pub methods: Vec<MatchingMethod>,
    pub default_threshold: f64,
    /// Frame height the references were captured at
    pub reference_height: Option<u32>,
    /// Relative height difference tolerated before rescaling references
    pub scale_tolerance: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            methods: vec![
                MatchingMethod::CCoeffNormed,
                MatchingMethod::CCorrNormed,
                MatchingMethod::SqDiffNormed,
            ],
            default_threshold: DEFAULT_THRESHOLD,
            reference_height: Some(1080),
            scale_tolerance: 0.1,
        }
    }
}

impl MatcherConfig {
    /// Configuration that scores a single method
    pub fn single(method: MatchingMethod) -> Self {
        Self {
            methods: vec![method],
            ..Default::default()
        }
    }

    /// Configuration with scale correction disabled
    pub fn unscaled() -> Self {
        Self {
            reference_height: None,
            ..Default::default()
        }
    }
}
