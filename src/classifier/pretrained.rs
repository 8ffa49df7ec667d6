use async_trait::async_trait;
use rten::Model;
use rten_tensor::prelude::*;
use rten_tensor::{NdTensor, Tensor};
use std::path::Path;
use std::sync::Arc;

use super::ImageClassifier;
use crate::settings::ModelConfig;
use crate::error::InferenceError;
use crate::models::{Classification, NormalizedImage};

/// Classifier backed by a pretrained model run through `rten`.
///
/// The model and labels are loaded once and shared read-only between calls.
pub struct RtenClassifier {
    model: Arc<Model>,
    labels: Arc<Vec<String>>,
    config: ModelConfig,
}

impl RtenClassifier {
    /// Load the model and labels named in `config`
    pub fn load(config: &ModelConfig) -> Result<Self, InferenceError> {
        let labels = load_labels(&config.labels_path)?;

        tracing::info!(
            "Loading model {} ({} labels)",
            config.model_path.display(),
            labels.len()
        );
        let model = Model::load_file(&config.model_path).map_err(|e| InferenceError::ModelLoad {
            path: config.model_path.clone(),
            message: e.to_string(),
        })?;

        Ok(Self {
            model: Arc::new(model),
            labels: Arc::new(labels),
            config: config.clone(),
        })
    }
}

#[async_trait]
impl ImageClassifier for RtenClassifier {
    fn input_size(&self) -> (u32, u32) {
        (self.config.input_width, self.config.input_height)
    }

    async fn classify(&self, image: &NormalizedImage) -> Result<Vec<Classification>, InferenceError> {
        let (width, height) = (image.width() as usize, image.height() as usize);
        let data = image.to_chw(self.config.mean, self.config.std);

        let model = self.model.clone();
        let labels = self.labels.clone();
        let apply_softmax = self.config.apply_softmax;
        let top_k = self.config.top_k;

        // Model execution is CPU-bound; keep it off the async workers
        tokio::task::spawn_blocking(move || {
            let input = NdTensor::from_data([1, 3, height, width], data);
            let output = model
                .run_one(input.view().into(), None)
                .map_err(|e| InferenceError::Runtime(e.to_string()))?;
            let output = Tensor::<f32>::try_from(output)
                .map_err(|e| InferenceError::Runtime(format!("unexpected output type: {e:?}")))?;

            let mut scores = output.to_vec();
            if apply_softmax {
                scores = softmax(&scores);
            }

            rank(&scores, &labels, top_k)
        })
        .await
        .map_err(|e| InferenceError::TaskFailed(e.to_string()))?
    }

    fn name(&self) -> &str {
        "rten"
    }
}

/// Read a labels file, one label per line (blank lines skipped)
pub fn load_labels(path: &Path) -> Result<Vec<String>, InferenceError> {
    let contents = std::fs::read_to_string(path).map_err(|source| InferenceError::LabelsLoad {
        path: path.to_path_buf(),
        source,
    })?;

    let labels: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if labels.is_empty() {
        return Err(InferenceError::NoLabels(path.to_path_buf()));
    }

    Ok(labels)
}

pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / sum).collect()
}

/// Map scores to labels and keep the `top_k` best, highest first.
///
/// Models with one extra leading output (a background class) are accepted;
/// that output is skipped. Equal scores keep index order.
pub fn rank(scores: &[f32], labels: &[String], top_k: usize) -> Result<Vec<Classification>, InferenceError> {
    let scores = if scores.len() == labels.len() {
        scores
    } else if scores.len() == labels.len() + 1 {
        &scores[1..]
    } else {
        return Err(InferenceError::OutputMismatch {
            expected: labels.len(),
            actual: scores.len(),
        });
    };

    let mut indexed: Vec<(usize, f32)> = scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, score)| score.is_finite())
        .collect();

    // Stable sort, so ties stay in index order
    indexed.sort_by(|a, b| b.1.total_cmp(&a.1));
    indexed.truncate(top_k.max(1));

    Ok(indexed
        .into_iter()
        .map(|(idx, score)| Classification::new(labels[idx].clone(), score))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_softmax_handles_large_logits() {
        let probs = softmax(&[1000.0, 1000.0]);
        assert!((probs[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_rank_orders_and_truncates() {
        let names = labels(&["bun", "hotdog, hot dog, red hot", "pizza"]);
        let ranked = rank(&[0.1, 0.7, 0.2], &names, 2).unwrap();

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].label, "hotdog, hot dog, red hot");
        assert_eq!(ranked[1].label, "pizza");
    }

    #[test]
    fn test_rank_skips_background_class() {
        let names = labels(&["bun", "hotdog"]);
        let ranked = rank(&[0.9, 0.02, 0.08], &names, 5).unwrap();

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0], Classification::new("hotdog", 0.08));
    }

    #[test]
    fn test_rank_ties_keep_index_order() {
        let names = labels(&["a", "b", "c"]);
        let ranked = rank(&[0.25, 0.5, 0.5], &names, 3).unwrap();
        assert_eq!(ranked[0].label, "b");
        assert_eq!(ranked[1].label, "c");
    }

    #[test]
    fn test_rank_rejects_mismatched_output() {
        let names = labels(&["a", "b"]);
        let err = rank(&[0.1, 0.2, 0.3, 0.4], &names, 5).unwrap_err();
        assert!(matches!(err, InferenceError::OutputMismatch { expected: 2, actual: 4 }));
    }

    #[test]
    fn test_load_labels_skips_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "tench, Tinca tinca\n\n  hotdog, hot dog, red hot  \n").unwrap();

        let loaded = load_labels(file.path()).unwrap();
        assert_eq!(loaded, labels(&["tench, Tinca tinca", "hotdog, hot dog, red hot"]));
    }

    #[test]
    fn test_load_labels_errors() {
        let missing = load_labels(Path::new("/nonexistent/labels.txt"));
        assert!(matches!(missing, Err(InferenceError::LabelsLoad { .. })));

        let empty = tempfile::NamedTempFile::new().unwrap();
        let result = load_labels(empty.path());
        assert!(matches!(result, Err(InferenceError::NoLabels(_))));
    }

    #[test]
    fn test_missing_model_is_an_error_not_a_crash() {
        let mut labels_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(labels_file, "hotdog").unwrap();

        let config = ModelConfig {
            model_path: "/nonexistent/model.rten".into(),
            labels_path: labels_file.path().to_path_buf(),
            ..ModelConfig::default()
        };

        let result = RtenClassifier::load(&config);
        assert!(matches!(result, Err(InferenceError::ModelLoad { .. })));
    }
}
