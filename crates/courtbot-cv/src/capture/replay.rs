//! Capture sources backed by files or memory

use super::{CaptureError, CaptureSource, Region};
use crate::Result;
use anyhow::{bail, Context};
use image::RgbImage;
use std::fs;
use std::path::{Path, PathBuf};

const FRAME_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Cycles through screenshot files, one per capture call
#[derive(Debug, Clone)]
pub struct ReplayCapture {
    frames: Vec<PathBuf>,
    cursor: usize,
}

impl ReplayCapture {
    /// Replay a single file, or every image in a directory in name order
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            Self::from_dir(path)
        } else {
            Ok(Self::from_files(vec![path.to_path_buf()]))
        }
    }

    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut frames = Vec::new();
        for entry in fs::read_dir(dir).with_context(|| format!("Failed to read frames: {:?}", dir))? {
            let path = entry?.path();
            let is_frame = path
                .extension()
                .map(|ext| ext.to_string_lossy().to_lowercase())
                .is_some_and(|ext| FRAME_EXTENSIONS.contains(&ext.as_str()));
            if is_frame {
                frames.push(path);
            }
        }

        if frames.is_empty() {
            bail!("No frames found in {:?}", dir);
        }
        frames.sort();
        Ok(Self::from_files(frames))
    }

    pub fn from_files(frames: Vec<PathBuf>) -> Self {
        Self { frames, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl CaptureSource for ReplayCapture {
    fn capture(&mut self, region: Option<Region>) -> std::result::Result<RgbImage, CaptureError> {
        if self.frames.is_empty() {
            return Err(CaptureError::Unavailable("no frames to replay".to_string()));
        }

        let path = &self.frames[self.cursor];
        self.cursor = (self.cursor + 1) % self.frames.len();

        let frame = image::open(path)
            .map_err(|e| CaptureError::Unavailable(format!("{:?}: {}", path, e)))?
            .to_rgb8();

        match region {
            Some(region) => region.crop(&frame),
            None => Ok(frame),
        }
    }
}

/// Returns the same in-memory frame on every call
#[derive(Debug, Clone)]
pub struct StaticCapture {
    frame: RgbImage,
}

impl StaticCapture {
    pub fn new(frame: RgbImage) -> Self {
        Self { frame }
    }
}

impl CaptureSource for StaticCapture {
    fn capture(&mut self, region: Option<Region>) -> std::result::Result<RgbImage, CaptureError> {
        match region {
            Some(region) => region.crop(&self.frame),
            None => Ok(self.frame.clone()),
        }
    }
}
