//! Bounded store of recent capture and match frames
//!
//! Purely observational: nothing in the detection path reads it back, and
//! a failed write is logged and dropped.

use crate::utils::ImageUtils;
use chrono::{DateTime, Local};
use image::RgbImage;
use std::collections::VecDeque;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Raw captured frame
    Frame,
    /// Frame with the matched region outlined
    Annotated,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Frame => f.write_str("screen"),
            ArtifactKind::Annotated => f.write_str("match"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DebugArtifact {
    pub timestamp: DateTime<Local>,
    pub label: String,
    pub kind: ArtifactKind,
    pub image: RgbImage,
    /// File the artifact was written to, when persistence is on
    pub path: Option<PathBuf>,
}

/// Fixed-capacity, oldest-first-evicted artifact ring
#[derive(Debug)]
pub struct DebugArtifactStore {
    capacity: usize,
    artifacts: VecDeque<DebugArtifact>,
    output_dir: Option<PathBuf>,
    sequence: u64,
}

impl DebugArtifactStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            artifacts: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            output_dir: None,
            sequence: 0,
        }
    }

    /// Also mirror retained artifacts to `dir`, deleting files on eviction
    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        if let Err(e) = fs::create_dir_all(&dir) {
            warn!("Debug output disabled, cannot create {:?}: {}", dir, e);
            return self;
        }
        self.output_dir = Some(dir);
        self
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &DebugArtifact> {
        self.artifacts.iter()
    }

    pub fn push(&mut self, label: &str, kind: ArtifactKind, image: RgbImage) {
        if self.capacity == 0 {
            return;
        }

        while self.artifacts.len() >= self.capacity {
            if let Some(evicted) = self.artifacts.pop_front() {
                Self::remove_file(&evicted);
            }
        }

        let timestamp = Local::now();
        self.sequence += 1;
        let path = self.output_dir.as_ref().and_then(|dir| {
            let name = format!(
                "{}_{:06}_{}_{}.png",
                timestamp.format("%Y%m%d_%H%M%S"),
                self.sequence,
                label,
                kind
            );
            let path = dir.join(name);
            match ImageUtils::save_image(&image, &path) {
                Ok(()) => Some(path),
                Err(e) => {
                    warn!("Failed to write debug artifact: {:#}", e);
                    None
                }
            }
        });

        self.artifacts.push_back(DebugArtifact {
            timestamp,
            label: label.to_string(),
            kind,
            image,
            path,
        });
    }

    fn remove_file(artifact: &DebugArtifact) {
        if let Some(path) = &artifact.path {
            if let Err(e) = fs::remove_file(path) {
                warn!("Failed to remove evicted artifact {:?}: {}", path, e);
            }
        }
    }
}
