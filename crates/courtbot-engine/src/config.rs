//! JSON bot configuration

use crate::dispatcher::{ActionEntry, ActionTable};
use crate::search::SearchConfig;
use crate::session::Timings;
use anyhow::Context;
use courtbot_core::actions::UnknownAction;
use courtbot_core::ActionKind;
use courtbot_cv::{DetectionConfig, ReferenceLoader, ReferenceSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("priority list is empty")]
    EmptyPriority,
    #[error(transparent)]
    UnknownAction(#[from] UnknownAction),
    #[error("no image path configured for priority label '{label}'")]
    MissingImage { label: String },
    #[error("no image path configured for search label '{label}'")]
    MissingLabel { label: String },
    #[error("threshold {value} for '{label}' is outside [0, 1]")]
    InvalidThreshold { label: String, value: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Label to reference image, relative to the config file
    pub image_paths: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub thresholds: BTreeMap<String, f64>,
    /// Dispatcher labels, highest priority first
    pub priority: Vec<String>,
    #[serde(flatten)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub timings: Timings,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl BotConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        let config = Self::from_json_str(&text, base_dir)
            .with_context(|| format!("Invalid config: {:?}", path))?;
        info!(
            "Loaded config {:?}: {} images, {} priority entries",
            path,
            config.image_paths.len(),
            config.priority.len()
        );
        Ok(config)
    }

    pub fn from_json_str(text: &str, base_dir: impl Into<PathBuf>) -> crate::Result<Self> {
        let mut config: Self = serde_json::from_str(text).context("Failed to parse config JSON")?;
        config.base_dir = base_dir.into();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.priority.is_empty() {
            return Err(ConfigError::EmptyPriority);
        }

        let mut uses_search = false;
        for label in &self.priority {
            let kind: ActionKind = label.parse()?;
            uses_search |= kind == ActionKind::DominationButton;
            if !self.image_paths.contains_key(label) {
                return Err(ConfigError::MissingImage {
                    label: label.clone(),
                });
            }
        }

        if uses_search {
            for label in self.search.labels() {
                if !self.image_paths.contains_key(label) {
                    return Err(ConfigError::MissingLabel {
                        label: label.to_string(),
                    });
                }
            }
        }

        check_threshold("default", self.detection.matcher.default_threshold)?;
        for (label, &value) in &self.thresholds {
            check_threshold(label, value)?;
        }

        Ok(())
    }

    /// Labels whose references must load for a session to start
    pub fn required_labels(&self) -> BTreeSet<&str> {
        let mut labels: BTreeSet<&str> = self.priority.iter().map(String::as_str).collect();
        if labels.contains(ActionKind::DominationButton.label()) {
            labels.extend(self.search.labels());
        }
        labels
    }

    /// Dispatcher table in priority order
    pub fn action_table(&self) -> Result<ActionTable, ConfigError> {
        self.priority
            .iter()
            .map(|label| -> Result<ActionEntry, ConfigError> {
                Ok(ActionEntry::new(label.clone(), label.parse()?))
            })
            .collect()
    }

    /// Load every configured reference image. Any failure is fatal.
    pub fn load_references(&self) -> crate::Result<ReferenceSet> {
        ReferenceLoader::new(&self.base_dir).load_all(
            &self.image_paths,
            &self.thresholds,
            self.detection.matcher.default_threshold,
        )
    }
}

fn check_threshold(label: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidThreshold {
            label: label.to_string(),
            value,
        })
    }
}
