//! Multi-method template scoring
//!
//! Every configured method scores the whole frame; squared-difference
//! distances are flipped to `1 - d` so all methods compare on a
//! higher-is-better scale, and the best single method wins.
//!
//! Large frames are searched coarse-to-fine: one exhaustive pass on a
//! downsampled pyramid level nominates a few peaks per method, and each
//! peak is refined level by level up to full resolution.

use super::correlation::{Correlator, Scores};
use super::{MatcherConfig, MatchingMethod, ReferenceImage};
use crate::result::{Location, MatchResult};
use crate::utils::ImageUtils;
use image::GrayImage;
use std::borrow::Cow;
use tracing::debug;

/// Tolerance subtracted from the threshold before comparing scores
pub const MATCH_EPSILON: f64 = 0.001;

/// Multiply-adds allowed for the exhaustive pass before going a level down
const SEARCH_BUDGET: u64 = 20_000_000;
/// Templates are never shrunk below this side length
const MIN_TEMPLATE_SIDE: u32 = 8;
/// Coarse peaks kept per method
const CANDIDATES_PER_METHOD: usize = 6;
/// Refinement window half-width around a peak mapped one level up
const REFINE_RADIUS: u32 = 2;

/// Peak of one method over the frame, already on the higher-is-better scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MethodScore {
    pub method: MatchingMethod,
    pub score: f64,
    pub location: Location,
}

/// A method's peak being tracked through the pyramid
#[derive(Debug, Clone, Copy)]
struct Candidate {
    method: MatchingMethod,
    location: Location,
    score: f64,
}

/// Template matcher fusing several scoring methods
pub struct TemplateMatcher {
    config: MatcherConfig,
}

impl TemplateMatcher {
    /// Create new template matcher
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Score `reference` against `frame` and decide against `threshold`.
    pub fn match_reference(
        &self,
        frame: &GrayImage,
        reference: &ReferenceImage,
        threshold: f64,
    ) -> MatchResult {
        let template = self.scaled_template(frame, reference);
        let scores = self.score_methods(frame, &template);
        let mut result = Self::fuse(&scores, threshold);
        result.template_size = template.dimensions();

        debug!(
            label = %reference.label,
            score = result.score,
            threshold,
            method = ?result.method,
            "scored reference"
        );
        result
    }

    /// The reference as it will be matched against `frame`, after the
    /// fixed scale correction.
    pub fn scaled_template<'a>(&self, frame: &GrayImage, reference: &'a ReferenceImage) -> Cow<'a, GrayImage> {
        match self.config.reference_height {
            Some(height) => ImageUtils::scale_for_frame(
                &reference.image,
                frame.height(),
                height,
                self.config.scale_tolerance,
            ),
            None => Cow::Borrowed(&reference.image),
        }
    }

    /// Peak score of every configured method. Empty when the template
    /// does not fit inside the frame.
    pub fn score_methods(&self, frame: &GrayImage, template: &GrayImage) -> Vec<MethodScore> {
        if !Self::fits(frame, template) {
            debug!(
                frame = ?frame.dimensions(),
                template = ?template.dimensions(),
                "template does not fit inside frame"
            );
            return Vec::new();
        }

        let depth = Self::pyramid_depth(frame, template);
        let mut levels = vec![(Cow::Borrowed(frame), Cow::Borrowed(template))];
        for _ in 0..depth {
            let (f, t) = &levels[levels.len() - 1];
            let next = (Cow::Owned(ImageUtils::halve(f)), Cow::Owned(ImageUtils::halve(t)));
            levels.push(next);
        }

        let (coarse_frame, coarse_template) = &levels[depth];
        let mut correlator = Correlator::new(coarse_frame, coarse_template);
        let map = correlator.score_all();
        let (cols, _) = correlator.positions();
        let keep = if depth == 0 { 1 } else { CANDIDATES_PER_METHOD };
        let radius = coarse_template.width().max(coarse_template.height()) / 2;

        let mut candidates: Vec<Candidate> = self
            .config
            .methods
            .iter()
            .flat_map(|&method| Self::peaks(&map, cols, method, keep, radius))
            .collect();

        for (f, t) in levels[..depth].iter().rev() {
            correlator = Correlator::new(f, t);
            for candidate in candidates.iter_mut() {
                let centre = Location::new(candidate.location.x * 2, candidate.location.y * 2);
                *candidate = Self::refine(&correlator, candidate.method, centre);
            }
        }
        debug!(depth, candidates = candidates.len(), "pyramid search done");

        // Any method's peak may be the best place for another method too.
        let finals: Vec<(Location, Scores)> = candidates
            .iter()
            .map(|c| (c.location, correlator.score_at(c.location.x, c.location.y)))
            .collect();

        self.config
            .methods
            .iter()
            .filter_map(|&method| {
                finals
                    .iter()
                    .fold(None, |best: Option<&(Location, Scores)>, f| match best {
                        Some(b) if b.1.get(method) >= f.1.get(method) => Some(b),
                        _ => Some(f),
                    })
                    .map(|(location, scores)| MethodScore {
                        method,
                        score: scores.get(method),
                        location: *location,
                    })
            })
            .collect()
    }

    /// Pick the highest score; earlier methods win ties.
    pub fn fuse(scores: &[MethodScore], threshold: f64) -> MatchResult {
        let mut best: Option<&MethodScore> = None;
        for candidate in scores {
            if best.is_none_or(|b| candidate.score > b.score) {
                best = Some(candidate);
            }
        }

        let Some(best) = best else {
            return MatchResult::not_found();
        };

        let found = best.score >= threshold - MATCH_EPSILON;
        MatchResult {
            found,
            score: best.score,
            location: found.then_some(best.location),
            method: Some(best.method),
            template_size: (0, 0),
        }
    }

    fn fits(frame: &GrayImage, template: &GrayImage) -> bool {
        template.width() > 0
            && template.height() > 0
            && template.width() <= frame.width()
            && template.height() <= frame.height()
    }

    /// Pyramid levels to drop before the exhaustive pass
    fn pyramid_depth(frame: &GrayImage, template: &GrayImage) -> usize {
        let cost = |depth: u32| {
            let (fw, fh) = (frame.width() >> depth, frame.height() >> depth);
            let (tw, th) = (template.width() >> depth, template.height() >> depth);
            u64::from(fw - tw + 1) * u64::from(fh - th + 1) * u64::from(tw) * u64::from(th)
        };
        let min_side = template.width().min(template.height());

        let mut depth = 0;
        while cost(depth) > SEARCH_BUDGET && min_side >> (depth + 1) >= MIN_TEMPLATE_SIDE {
            depth += 1;
        }
        depth as usize
    }

    /// Up to `keep` best positions for `method`, at least `radius` apart.
    /// Earlier positions win ties.
    fn peaks(map: &[Scores], cols: u32, method: MatchingMethod, keep: usize, radius: u32) -> Vec<Candidate> {
        let at = |index: usize| Location::new(index as u32 % cols, index as u32 / cols);
        let candidate = |index: usize| Candidate {
            method,
            location: at(index),
            score: map[index].get(method),
        };

        if keep == 1 {
            let best = (0..map.len()).fold(0, |b, i| if map[i].get(method) > map[b].get(method) { i } else { b });
            return vec![candidate(best)];
        }

        let mut order: Vec<usize> = (0..map.len()).collect();
        order.sort_by(|&a, &b| map[b].get(method).total_cmp(&map[a].get(method)));

        let mut picked: Vec<Candidate> = Vec::with_capacity(keep);
        for index in order {
            if picked.len() == keep {
                break;
            }
            let location = at(index);
            let crowded = picked.iter().any(|p| {
                p.location.x.abs_diff(location.x) <= radius && p.location.y.abs_diff(location.y) <= radius
            });
            if !crowded {
                picked.push(candidate(index));
            }
        }
        picked
    }

    /// Best position for `method` in a small window around `centre`
    fn refine(correlator: &Correlator, method: MatchingMethod, centre: Location) -> Candidate {
        let (cols, rows) = correlator.positions();
        let span = |c: u32, limit: u32| {
            let hi = (c + REFINE_RADIUS).min(limit - 1);
            (c.saturating_sub(REFINE_RADIUS).min(hi), hi)
        };
        let (x0, x1) = span(centre.x, cols);
        let (y0, y1) = span(centre.y, rows);

        let mut best = Candidate {
            method,
            location: Location::new(x0, y0),
            score: f64::NEG_INFINITY,
        };
        for y in y0..=y1 {
            for x in x0..=x1 {
                let score = correlator.score_at(x, y).get(method);
                if score > best.score {
                    best.location = Location::new(x, y);
                    best.score = score;
                }
            }
        }
        best
    }
}

impl Default for TemplateMatcher {
    fn default() -> Self {
        Self::new(MatcherConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{imageops, Luma};
    use std::time::{Duration, Instant};

    fn noise(x: u32, y: u32) -> u8 {
        let mut h = x.wrapping_mul(374_761_393).wrapping_add(y.wrapping_mul(668_265_263));
        h = (h ^ (h >> 13)).wrapping_mul(1_274_126_177);
        ((h ^ (h >> 16)) & 0xff) as u8
    }

    fn noisy_frame(w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| Luma([noise(x, y)]))
    }

    fn crop(frame: &GrayImage, x: u32, y: u32, w: u32, h: u32) -> GrayImage {
        imageops::crop_imm(frame, x, y, w, h).to_image()
    }

    /// Flat 24px tiles with fine grain on top, like a menu screen
    fn tiled_frame(w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| Luma([noise(x / 24, y / 24 + 500) / 2 + noise(x, y) / 8]))
    }

    /// Bright, nearly flat noise: 248..=252
    fn low_contrast(w: u32, h: u32, offset: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| Luma([248 + noise(x + offset, y) % 5]))
    }

    #[test]
    fn test_exact_crop_is_found_at_its_origin() {
        let frame = noisy_frame(64, 48);
        let reference = ReferenceImage::new("home", crop(&frame, 21, 13, 12, 9));
        let matcher = TemplateMatcher::new(MatcherConfig::unscaled());

        let result = matcher.match_reference(&frame, &reference, 0.99);

        assert!(result.found);
        assert!(result.score > 0.999);
        assert_eq!(result.location, Some(Location::new(21, 13)));
        assert_eq!(result.template_size, (12, 9));
    }

    #[test]
    fn test_each_method_peaks_on_exact_crop() {
        let frame = noisy_frame(40, 30);
        let template = crop(&frame, 7, 5, 10, 8);
        for method in [
            MatchingMethod::CCoeffNormed,
            MatchingMethod::CCorrNormed,
            MatchingMethod::SqDiffNormed,
        ] {
            let matcher = TemplateMatcher::new(MatcherConfig::single(method));
            let scores = matcher.score_methods(&frame, &template);
            assert_eq!(scores.len(), 1);
            assert!(scores[0].score > 0.999, "{} scored {}", method, scores[0].score);
            assert_eq!(scores[0].location, Location::new(7, 5), "{}", method);
        }
    }

    #[test]
    fn test_fused_score_is_the_method_maximum() {
        let frame = noisy_frame(48, 36);
        // Brightened copy: the methods disagree on how similar it is.
        let mut template = crop(&frame, 10, 10, 14, 10);
        for p in template.pixels_mut() {
            p[0] = p[0] / 2 + 100;
        }
        let matcher = TemplateMatcher::new(MatcherConfig::unscaled());

        let scores = matcher.score_methods(&frame, &template);
        let result = TemplateMatcher::fuse(&scores, 0.8);

        let best = scores
            .iter()
            .copied()
            .reduce(|a, b| if b.score > a.score { b } else { a })
            .unwrap();
        assert_eq!(scores.len(), 3);
        assert!(scores.iter().any(|s| s.score < best.score));
        assert_eq!(result.score, best.score);
        assert_eq!(result.method, Some(best.method));
    }

    #[test]
    fn test_fuse_prefers_higher_score_and_first_on_tie() {
        let at = Location::new(1, 2);
        let low = MethodScore { method: MatchingMethod::CCoeffNormed, score: 0.4, location: at };
        let high = MethodScore { method: MatchingMethod::SqDiffNormed, score: 0.9, location: Location::new(3, 4) };
        let tie = MethodScore { method: MatchingMethod::CCorrNormed, score: 0.9, location: at };

        let result = TemplateMatcher::fuse(&[low, high, tie], 0.5);
        assert_eq!(result.method, Some(MatchingMethod::SqDiffNormed));
        assert_eq!(result.location, Some(Location::new(3, 4)));

        let result = TemplateMatcher::fuse(&[high, low], 0.5);
        assert_eq!(result.score, 0.9);
    }

    #[test]
    fn test_found_iff_score_clears_threshold_minus_epsilon() {
        let score = MethodScore { method: MatchingMethod::CCorrNormed, score: 0.8, location: Location::new(0, 0) };

        assert!(TemplateMatcher::fuse(&[score], 0.8).found);
        assert!(TemplateMatcher::fuse(&[score], 0.8005).found);
        assert!(!TemplateMatcher::fuse(&[score], 0.802).found);

        for step in 0..=100 {
            let threshold = step as f64 / 100.0;
            let result = TemplateMatcher::fuse(&[score], threshold);
            assert_eq!(result.found, 0.8 >= threshold - MATCH_EPSILON, "threshold {}", threshold);
            assert_eq!(result.location.is_some(), result.found);
        }
    }

    #[test]
    fn test_oversized_template_is_a_miss() {
        let frame = noisy_frame(10, 10);
        let reference = ReferenceImage::new("huge", noisy_frame(20, 5));
        let matcher = TemplateMatcher::new(MatcherConfig::unscaled());

        let result = matcher.match_reference(&frame, &reference, 0.0);
        assert!(!result.found);
        assert_eq!(result.method, None);
    }

    #[test]
    fn test_flat_frame_does_not_produce_nan() {
        let frame = GrayImage::new(20, 20);
        let template = noisy_frame(5, 5);
        let matcher = TemplateMatcher::new(MatcherConfig::unscaled());

        for score in matcher.score_methods(&frame, &template) {
            assert!(score.score.is_finite(), "{} produced {}", score.method, score.score);
        }
    }

    #[test]
    fn test_reference_is_rescaled_for_half_height_frames() {
        let full = noisy_frame(80, 60);
        let reference = ReferenceImage::new("tile", GrayImage::new(20, 10));
        let matcher = TemplateMatcher::new(MatcherConfig {
            reference_height: Some(120),
            ..Default::default()
        });

        let result = matcher.match_reference(&full, &reference, 0.0);
        assert_eq!(result.template_size, (10, 5));
    }

    #[test]
    fn test_pyramid_depth_grows_with_frame_size() {
        let template = GrayImage::new(120, 60);
        assert_eq!(TemplateMatcher::pyramid_depth(&GrayImage::new(1920, 1080), &template), 2);
        assert_eq!(TemplateMatcher::pyramid_depth(&GrayImage::new(130, 70), &template), 0);
        // tiny templates are never shrunk below the minimum side
        let tiny = GrayImage::new(10, 10);
        assert_eq!(TemplateMatcher::pyramid_depth(&GrayImage::new(1920, 1080), &tiny), 0);
    }

    #[test]
    fn test_full_hd_frame_is_matched_quickly() {
        let frame = tiled_frame(1920, 1080);
        let reference = ReferenceImage::new("tile", crop(&frame, 837, 411, 120, 60));
        let matcher = TemplateMatcher::default();

        let started = Instant::now();
        let result = matcher.match_reference(&frame, &reference, 0.95);
        let elapsed = started.elapsed();

        assert!(result.found, "score {}", result.score);
        assert_eq!(result.location, Some(Location::new(837, 411)));
        assert!(elapsed < Duration::from_secs(5), "took {:?}", elapsed);
    }

    #[test]
    fn test_refinement_recovers_odd_offsets() {
        let frame = tiled_frame(640, 360);
        let matcher = TemplateMatcher::new(MatcherConfig::unscaled());
        for (x, y) in [(3, 5), (301, 117), (517, 293)] {
            let template = crop(&frame, x, y, 96, 48);
            let scores = matcher.score_methods(&frame, &template);

            assert_eq!(scores.len(), 3);
            for score in scores {
                assert_eq!(score.location, Location::new(x, y), "{}", score.method);
                assert!(score.score > 0.999, "{} scored {}", score.method, score.score);
            }
        }
    }

    #[test]
    fn test_low_contrast_stranger_is_not_a_ccoeff_match() {
        let frame = low_contrast(200, 120, 0);
        let template = low_contrast(120, 80, 9_000);
        let matcher = TemplateMatcher::new(MatcherConfig {
            reference_height: None,
            ..MatcherConfig::single(MatchingMethod::CCoeffNormed)
        });

        let result = matcher.match_reference(&frame, &ReferenceImage::new("stars", template), 0.99);

        assert!(!result.found);
        assert!(result.score.abs() < 0.5, "score {}", result.score);
    }
}
