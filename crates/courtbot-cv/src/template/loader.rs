//! Reference image loading
//!
//! Failures here are fatal: the bot cannot run with a hole in its action
//! table, so every error carries the label and path that broke.

use super::{ReferenceImage, ReferenceSet};
use crate::utils::image::ImageUtils;
use crate::Result;
use anyhow::{bail, Context};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Loads references relative to a base directory
pub struct ReferenceLoader {
    base_dir: PathBuf,
}

impl ReferenceLoader {
    /// Create new loader resolving relative paths against `base_dir`
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Load one labelled reference
    pub fn load(&self, label: &str, path: &Path, threshold: f64) -> Result<ReferenceImage> {
        let resolved = self.resolve(path);
        if !resolved.exists() {
            bail!("Reference image for '{}' not found: {:?}", label, resolved);
        }

        let image = ImageUtils::load_grayscale(&resolved)
            .with_context(|| format!("Failed to load reference '{}'", label))?;
        if image.width() == 0 || image.height() == 0 {
            bail!("Reference image for '{}' is empty: {:?}", label, resolved);
        }

        Ok(ReferenceImage::new(label, image)
            .with_threshold(threshold)
            .with_path(resolved))
    }

    /// Load every configured reference, applying per-label thresholds
    pub fn load_all(
        &self,
        image_paths: &BTreeMap<String, PathBuf>,
        thresholds: &BTreeMap<String, f64>,
        default_threshold: f64,
    ) -> Result<ReferenceSet> {
        let mut set = ReferenceSet::new();
        for (label, path) in image_paths {
            let threshold = thresholds.get(label).copied().unwrap_or(default_threshold);
            set.insert(self.load(label, path, threshold)?);
        }

        info!("Loaded {} reference images from {:?}", set.len(), self.base_dir);
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use std::fs;

    fn write_png(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        GrayImage::from_pixel(6, 4, Luma([90])).save(&path).unwrap();
        path
    }

    #[test]
    fn test_load_all_applies_thresholds() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write_png(dir.path(), "home.png");
        write_png(dir.path(), "stars.png");

        let paths = BTreeMap::from([
            ("home".to_string(), PathBuf::from("home.png")),
            ("stars".to_string(), PathBuf::from("stars.png")),
        ]);
        let thresholds = BTreeMap::from([("stars".to_string(), 0.99)]);

        let set = ReferenceLoader::new(dir.path()).load_all(&paths, &thresholds, 0.8)?;

        assert_eq!(set.len(), 2);
        assert_eq!(set.get("home").unwrap().threshold, 0.8);
        assert_eq!(set.get("stars").unwrap().threshold, 0.99);
        assert_eq!(set.get("home").unwrap().image.dimensions(), (6, 4));
        Ok(())
    }

    #[test]
    fn test_missing_reference_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let paths = BTreeMap::from([("myteam".to_string(), PathBuf::from("nope.png"))]);

        let err = ReferenceLoader::new(dir.path())
            .load_all(&paths, &BTreeMap::new(), 0.8)
            .unwrap_err();
        assert!(err.to_string().contains("myteam"));
    }

    #[test]
    fn test_corrupt_reference_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.png"), b"not a png").unwrap();

        let result = ReferenceLoader::new(dir.path()).load("broken", Path::new("broken.png"), 0.8);
        assert!(result.is_err());
    }
}
