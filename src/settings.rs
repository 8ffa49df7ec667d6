use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::Level;

use crate::decision::DecisionRule;
use crate::preprocessing::ResizeMode;

/// Application settings.
///
/// Layered as: built-in defaults, then an optional settings file, then
/// `SEEFOOD__SECTION__KEY` environment variables. CLI flags are applied on top
/// by the binary.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub model: ModelConfig,
    pub preprocessing: PreprocessingConfig,
    pub decision: DecisionRule,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub model_path: PathBuf,
    pub labels_path: PathBuf,
    pub input_width: u32,
    pub input_height: u32,
    /// Per-channel mean subtracted after scaling pixels to [0,1]
    pub mean: [f32; 3],
    pub std: [f32; 3],
    /// Set when the model outputs logits rather than probabilities
    pub apply_softmax: bool,
    pub top_k: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/mobilenet_v2.rten"),
            labels_path: PathBuf::from("models/imagenet_labels.txt"),
            input_width: 224,
            input_height: 224,
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
            apply_softmax: true,
            top_k: 5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    pub resize: ResizeMode,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings, reading `file` if given (it must exist)
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("SEEFOOD")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder
            .build()
            .context("Failed to read settings")?
            .try_deserialize()
            .context("Invalid settings")?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings that would make every run fail or every answer the same
    pub fn validate(&self) -> Result<()> {
        if self.model.input_width == 0 || self.model.input_height == 0 {
            anyhow::bail!(
                "Model input size must be non-zero, got {}x{}",
                self.model.input_width,
                self.model.input_height
            );
        }
        if self.model.top_k == 0 {
            anyhow::bail!("model.top_k must be at least 1");
        }
        if self.model.std.iter().any(|s| *s == 0.0) {
            anyhow::bail!("model.std must not contain zeros");
        }
        if self.decision.keyword.is_empty() {
            anyhow::bail!("decision.keyword must not be empty");
        }
        if self.decision.positive_label.is_empty() || self.decision.negative_label.is_empty() {
            anyhow::bail!("decision.positive_label and decision.negative_label must not be empty");
        }
        if let Some(threshold) = self.decision.min_confidence {
            if !(0.0..=1.0).contains(&threshold) {
                anyhow::bail!("decision.min_confidence must be within 0.0..=1.0, got {threshold}");
            }
        }
        self.log_level()?;
        Ok(())
    }

    pub fn log_level(&self) -> Result<Level> {
        Level::from_str(&self.logging.level)
            .map_err(|_| anyhow::anyhow!("Unknown log level: {}", self.logging.level))
    }
}
