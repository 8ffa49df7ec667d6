use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::ImageClassifier;
use crate::error::InferenceError;
use crate::models::{Classification, NormalizedImage};

/// Classifier that answers with a predetermined ranking.
///
/// Useful for running the pipeline without model files. Responses are
/// consumed in order; the last one repeats once the script runs out.
pub struct ScriptedClassifier {
    responses: Mutex<Vec<Vec<Classification>>>,
    input_size: (u32, u32),
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    /// Always answer with `ranking`
    pub fn new(ranking: Vec<Classification>) -> Self {
        Self::sequence(vec![ranking])
    }

    /// Answer with each ranking in turn
    pub fn sequence(responses: Vec<Vec<Classification>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            input_size: (224, 224),
            calls: AtomicUsize::new(0),
        }
    }

    /// Convenience constructor from `(label, confidence)` pairs
    pub fn from_pairs(pairs: &[(&str, f32)]) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|(label, confidence)| Classification::new(*label, *confidence))
                .collect(),
        )
    }

    pub fn with_input_size(mut self, width: u32, height: u32) -> Self {
        self.input_size = (width, height);
        self
    }

    /// Number of classify calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageClassifier for ScriptedClassifier {
    fn input_size(&self) -> (u32, u32) {
        self.input_size
    }

    async fn classify(&self, image: &NormalizedImage) -> Result<Vec<Classification>, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("Scripted classifier got {}x{} image", image.width(), image.height());

        let mut responses = self
            .responses
            .lock()
            .map_err(|e| InferenceError::TaskFailed(e.to_string()))?;

        let ranking = if responses.len() > 1 {
            responses.remove(0)
        } else {
            responses.first().cloned().unwrap_or_default()
        };

        Ok(ranking)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
