pub mod app;
pub mod classifier;
pub mod decision;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod session;
pub mod settings;

pub use classifier::{ImageClassifier, RtenClassifier, ScriptedClassifier};
pub use decision::DecisionRule;
pub use error::{ConversionError, InferenceError, PipelineError, SourceError};
pub use models::{Classification, ClassificationResult, Decision, NormalizedImage, RawImage};
pub use pipeline::ClassificationPipeline;
pub use session::{Outcome, Session, Ticket};
pub use settings::Settings;
