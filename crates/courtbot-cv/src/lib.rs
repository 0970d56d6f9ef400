//! Courtbot Computer Vision Library
//!
//! Screen-state detection for the menu bot: multi-method template scoring,
//! reference loading, capture sources and the debug artifact ring.

pub mod capture;
pub mod debug;
pub mod detection;
pub mod result;
pub mod template;
pub mod utils;

// Re-export commonly used types
pub use capture::{CaptureError, CaptureSource, Region, ReplayCapture, StaticCapture};
pub use debug::{ArtifactKind, DebugArtifact, DebugArtifactStore};
pub use detection::{DetectionConfig, Detector};
pub use result::{Detection, Location, MatchResult};
pub use template::{MatcherConfig, MatchingMethod, ReferenceImage, ReferenceLoader, ReferenceSet, TemplateMatcher};
pub use traits::Detect;
pub use utils::ImageUtils;

// Error handling
pub type Result<T> = anyhow::Result<T>;

/// Core traits for the CV system
pub mod traits {
    use crate::result::Detection;

    /// Looks for one labelled reference on the current screen.
    ///
    /// Every call captures a fresh frame. `threshold` overrides the
    /// reference's configured threshold when given.
    pub trait Detect {
        fn detect(&mut self, label: &str, threshold: Option<f64>) -> Detection;
    }

    impl<T: Detect + ?Sized> Detect for Box<T> {
        fn detect(&mut self, label: &str, threshold: Option<f64>) -> Detection {
            (**self).detect(label, threshold)
        }
    }
}
