mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from seefood for tests
pub use seefood::app::{self, Capture, Dispatch, PresentationSink, RunSummary};
pub use seefood::{
    Classification, ClassificationPipeline, ConversionError, DecisionRule, ImageClassifier,
    InferenceError, Outcome, PipelineError, RawImage, ScriptedClassifier, Session, SourceError,
};
