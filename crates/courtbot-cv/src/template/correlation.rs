//! Exact per-position scores for one frame and template pair
//!
//! Everything is accumulated in `f64` against a mean-centred template, so
//! bright low-contrast references keep their significant digits.

use super::MatchingMethod;
use image::GrayImage;

/// Window variance (squared intensity units) below which a region is flat
const FLAT_VARIANCE: f64 = 1e-3;

/// All three scores at one position, on the higher-is-better scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Scores {
    pub ccoeff: f64,
    pub ccorr: f64,
    /// `1 - d` of the normalized squared difference
    pub sqdiff: f64,
}

impl Scores {
    /// Scores for a position where nothing can be said
    const WORST: Scores = Scores {
        ccoeff: 0.0,
        ccorr: 0.0,
        sqdiff: 0.0,
    };

    pub fn get(&self, method: MatchingMethod) -> f64 {
        match method {
            MatchingMethod::CCoeffNormed => self.ccoeff,
            MatchingMethod::CCorrNormed => self.ccorr,
            MatchingMethod::SqDiffNormed => self.sqdiff,
        }
    }
}

struct CentredTemplate {
    width: usize,
    height: usize,
    /// `t - mean(t)`, row-major
    values: Vec<f64>,
    mean: f64,
    sq_sum: f64,
    /// Sum of squared deviations from the mean
    variance: f64,
}

impl CentredTemplate {
    fn new(template: &GrayImage) -> Self {
        let n = template.len() as f64;
        let mean = template.iter().map(|&v| v as f64).sum::<f64>() / n;
        let values: Vec<f64> = template.iter().map(|&v| v as f64 - mean).collect();
        let sq_sum = template.iter().map(|&v| (v as f64) * (v as f64)).sum();
        let variance = values.iter().map(|v| v * v).sum();

        Self {
            width: template.width() as usize,
            height: template.height() as usize,
            values,
            mean,
            sq_sum,
            variance,
        }
    }
}

/// Scores a template at any position of one frame
pub(crate) struct Correlator {
    frame_width: usize,
    frame: Vec<f64>,
    sums: WindowSums,
    template: CentredTemplate,
}

impl Correlator {
    /// `template` must fit inside `frame`.
    pub fn new(frame: &GrayImage, template: &GrayImage) -> Self {
        Self {
            frame_width: frame.width() as usize,
            frame: frame.iter().map(|&v| v as f64).collect(),
            sums: WindowSums::new(frame),
            template: CentredTemplate::new(template),
        }
    }

    /// Number of valid template positions along x and y
    pub fn positions(&self) -> (u32, u32) {
        let rows = self.frame.len() / self.frame_width;
        (
            (self.frame_width - self.template.width + 1) as u32,
            (rows - self.template.height + 1) as u32,
        )
    }

    pub fn score_at(&self, x: u32, y: u32) -> Scores {
        let t = &self.template;
        let n = t.values.len() as f64;
        let (i_sum, i_sq_sum) = self.sums.window(x, y, t.width, t.height);
        let centred_dot = self.centred_dot(x as usize, y as usize);

        let i_variance = (i_sq_sum - i_sum * i_sum / n).max(0.0);
        let ccoeff = if i_variance > FLAT_VARIANCE && t.variance > FLAT_VARIANCE {
            (centred_dot / (i_variance * t.variance).sqrt()).clamp(-1.0, 1.0)
        } else {
            Scores::WORST.ccoeff
        };

        let norm = (i_sq_sum * t.sq_sum).sqrt();
        if norm <= FLAT_VARIANCE {
            return Scores {
                ccoeff,
                ..Scores::WORST
            };
        }
        let dot = centred_dot + t.mean * i_sum;
        let distance = (i_sq_sum - 2.0 * dot + t.sq_sum).max(0.0) / norm;

        Scores {
            ccoeff,
            ccorr: (dot / norm).clamp(0.0, 1.0),
            sqdiff: 1.0 - distance,
        }
    }

    /// Scores at every position, row-major over `positions()`
    pub fn score_all(&self) -> Vec<Scores> {
        let (cols, rows) = self.positions();
        let row_scores = |y: u32| (0..cols).map(move |x| (x, y));

        #[cfg(feature = "parallel")]
        let scores = {
            use rayon::prelude::*;
            (0..rows)
                .into_par_iter()
                .flat_map_iter(|y| row_scores(y).map(|(x, y)| self.score_at(x, y)))
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let scores = (0..rows)
            .flat_map(row_scores)
            .map(|(x, y)| self.score_at(x, y))
            .collect();

        scores
    }

    /// Sum of frame pixels times centred template values at (x, y)
    fn centred_dot(&self, x: usize, y: usize) -> f64 {
        let t = &self.template;
        t.values
            .chunks_exact(t.width)
            .enumerate()
            .map(|(row, template_row)| {
                let start = (y + row) * self.frame_width + x;
                self.frame[start..start + t.width]
                    .iter()
                    .zip(template_row)
                    .map(|(i, t)| i * t)
                    .sum::<f64>()
            })
            .sum()
    }
}

/// Integral images of pixel values and squared pixel values
struct WindowSums {
    stride: usize,
    sum: Vec<f64>,
    sq_sum: Vec<f64>,
}

impl WindowSums {
    fn new(image: &GrayImage) -> Self {
        let (w, h) = image.dimensions();
        let stride = w as usize + 1;
        let mut sum = vec![0.0; stride * (h as usize + 1)];
        let mut sq_sum = sum.clone();

        for (y, row) in image.rows().enumerate() {
            let mut acc = 0.0;
            let mut acc_sq = 0.0;
            for (x, pixel) in row.enumerate() {
                let v = pixel[0] as f64;
                acc += v;
                acc_sq += v * v;
                let idx = (y + 1) * stride + x + 1;
                sum[idx] = sum[idx - stride] + acc;
                sq_sum[idx] = sq_sum[idx - stride] + acc_sq;
            }
        }

        Self { stride, sum, sq_sum }
    }

    /// (sum, sum of squares) over the `w` x `h` window at (x, y)
    fn window(&self, x: u32, y: u32, w: usize, h: usize) -> (f64, f64) {
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + w, y0 + h);
        let at = |table: &[f64], x: usize, y: usize| table[y * self.stride + x];
        let area = |table: &[f64]| at(table, x1, y1) - at(table, x0, y1) - at(table, x1, y0) + at(table, x0, y0);
        (area(&self.sum), area(&self.sq_sum))
    }
}
