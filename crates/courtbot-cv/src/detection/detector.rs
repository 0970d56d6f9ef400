//! Capture-and-score façade used by the engine

use super::config::DetectionConfig;
use crate::capture::{CaptureSource, Region};
use crate::debug::{ArtifactKind, DebugArtifactStore};
use crate::result::{Detection, MatchResult};
use crate::template::{ReferenceSet, TemplateMatcher};
use crate::traits::Detect;
use crate::utils::ImageUtils;
use image::RgbImage;
use tracing::{info, warn};

/// Captures a frame per call and scores one reference against it
pub struct Detector<C: CaptureSource> {
    capture: C,
    matcher: TemplateMatcher,
    references: ReferenceSet,
    store: DebugArtifactStore,
    debug_enabled: bool,
    region: Option<Region>,
}

impl<C: CaptureSource> Detector<C> {
    /// Create new detector
    pub fn new(config: DetectionConfig, references: ReferenceSet, capture: C) -> Self {
        let mut store = DebugArtifactStore::new(config.debug.capacity);
        if let Some(dir) = config.debug.output_dir.clone() {
            store = store.with_output_dir(dir);
        }

        Self {
            capture,
            matcher: TemplateMatcher::new(config.matcher),
            references,
            store,
            debug_enabled: config.debug.enabled,
            region: config.capture_region,
        }
    }

    pub fn artifacts(&self) -> &DebugArtifactStore {
        &self.store
    }

    /// Threshold used when the caller supplies none
    pub fn threshold_for(&self, label: &str, threshold: Option<f64>) -> Option<f64> {
        threshold.or_else(|| self.references.get(label).map(|r| r.threshold))
    }

    fn record(&mut self, label: &str, frame: &RgbImage, result: &MatchResult) {
        if !self.debug_enabled {
            return;
        }

        self.store.push(label, ArtifactKind::Frame, frame.clone());
        if let (true, Some(location)) = (result.found, result.location) {
            let annotated =
                ImageUtils::annotate_match(frame, location.x, location.y, result.template_size);
            self.store.push(label, ArtifactKind::Annotated, annotated);
        }
    }
}

impl<C: CaptureSource> Detect for Detector<C> {
    fn detect(&mut self, label: &str, threshold: Option<f64>) -> Detection {
        let Some(threshold) = self.threshold_for(label, threshold) else {
            warn!("No reference image configured for '{}'", label);
            return Detection::Unavailable(format!("unknown label '{}'", label));
        };

        let frame = match self.capture.capture(self.region) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Capture failed while looking for '{}': {}", label, e);
                return Detection::Unavailable(e.to_string());
            }
        };

        let gray = ImageUtils::to_grayscale(&frame);
        let result = match self.references.get(label) {
            Some(reference) => self.matcher.match_reference(&gray, reference, threshold),
            None => MatchResult::not_found(),
        };

        if result.found {
            info!(
                "Matched {} - score {:.3} (threshold {:.3}) at {}",
                label,
                result.score,
                threshold,
                result.location.map(|l| l.to_string()).unwrap_or_default()
            );
        } else {
            info!("No match for {} - score {:.3} (threshold {:.3})", label, result.score, threshold);
        }

        self.record(label, &frame, &result);
        Detection::from_result(result)
    }
}
