use anyhow::Result;
use image::DynamicImage;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::classifier::ImageClassifier;
use crate::decision::DecisionRule;
use crate::error::{ConversionError, InferenceError, PipelineError};
use crate::models::{ClassificationResult, Decision, NormalizedImage, RawImage};
use crate::preprocessing::{self, ResizeMode};

/// Turns one raw image into one decision: prepare, classify, decide.
///
/// The pipeline holds no per-run state; the classifier is shared read-only,
/// so one pipeline can serve any number of runs.
pub struct ClassificationPipeline {
    classifier: Arc<dyn ImageClassifier>,
    rule: DecisionRule,
    resize: ResizeMode,
    /// Root directory for debug outputs, when debug mode is on
    debug_dir: Option<PathBuf>,
    debug_counter: AtomicUsize,
}

impl ClassificationPipeline {
    pub fn new(classifier: Arc<dyn ImageClassifier>, rule: DecisionRule) -> Self {
        Self {
            classifier,
            rule,
            resize: ResizeMode::default(),
            debug_dir: None,
            debug_counter: AtomicUsize::new(0),
        }
    }

    pub fn with_resize(mut self, resize: ResizeMode) -> Self {
        self.resize = resize;
        self
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.debug_dir = Some(output_dir);

        Ok(self)
    }

    /// Decode the raw image and fit it to the classifier's input size
    pub fn prepare(&self, raw: &RawImage) -> Result<NormalizedImage, ConversionError> {
        let decoded = preprocessing::decode(raw)?;
        let (width, height) = self.classifier.input_size();
        tracing::debug!(
            "Decoded {} ({}x{}), normalizing to {}x{}",
            raw.display_name(),
            decoded.width(),
            decoded.height(),
            width,
            height
        );

        let normalized = preprocessing::normalize(&decoded, width, height, self.resize)?;
        self.save_debug_output(&decoded, &normalized);

        Ok(normalized)
    }

    /// Run the classifier; an empty answer is an inference failure
    pub async fn classify(&self, image: &NormalizedImage) -> Result<ClassificationResult, InferenceError> {
        let result = ClassificationResult::new(self.classifier.classify(image).await?)?;
        tracing::debug!(
            "{} ranked: {}",
            self.classifier.name(),
            result
                .entries()
                .iter()
                .map(|c| format!("{} {:.2}", c.label, c.confidence))
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(result)
    }

    pub fn decide(&self, result: &ClassificationResult) -> Decision {
        self.rule.decide(result)
    }

    /// Run all three stages in order. Any failure aborts the run.
    pub async fn run(&self, raw: &RawImage) -> Result<Decision, PipelineError> {
        let normalized = self.prepare(raw)?;
        let result = self.classify(&normalized).await?;
        let decision = self.decide(&result);

        tracing::info!(
            "{}: {} (top label {:?}, confidence {:.2})",
            raw.display_name(),
            decision.label,
            decision.basis.label,
            decision.basis.confidence
        );

        Ok(decision)
    }

    /// Save the decoded input and normalized image if debug mode is enabled.
    /// Failures are logged and otherwise ignored.
    fn save_debug_output(&self, decoded: &DynamicImage, normalized: &NormalizedImage) {
        let Some(debug_dir) = &self.debug_dir else {
            return;
        };

        let index = self.debug_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let filename = format!("{:02}.png", index);

        let outputs = [
            ("00_input", decoded.clone()),
            ("01_normalized", DynamicImage::ImageRgb8(normalized.pixels.clone())),
        ];

        for (step_dir_name, image) in outputs {
            let step_dir = debug_dir.join(step_dir_name);
            let output_path = step_dir.join(&filename);

            let saved = std::fs::create_dir_all(&step_dir)
                .map_err(anyhow::Error::from)
                .and_then(|_| image.save(&output_path).map_err(anyhow::Error::from));

            match saved {
                Ok(()) => tracing::debug!("Debug: saved {}/{}", step_dir_name, filename),
                Err(e) => tracing::warn!("Failed to save debug image {}: {}", output_path.display(), e),
            }
        }
    }
}
