pub mod pretrained;
pub mod scripted;

use async_trait::async_trait;

use crate::error::InferenceError;
use crate::models::{Classification, NormalizedImage};

pub use pretrained::RtenClassifier;
pub use scripted::ScriptedClassifier;

/// A pretrained image classifier: normalized image in, ranked labels out
#[async_trait]
pub trait ImageClassifier: Send + Sync {
    /// Input size (width, height) the classifier expects
    fn input_size(&self) -> (u32, u32);

    /// Classify one image. Entries are ordered by descending confidence.
    async fn classify(&self, image: &NormalizedImage) -> Result<Vec<Classification>, InferenceError>;

    /// Human-readable name for logging
    fn name(&self) -> &str;
}
