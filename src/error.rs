use std::path::PathBuf;
use thiserror::Error;

// Pipeline error taxonomy. Both kinds are recoverable: the run is abandoned and
// the caller may submit another image.

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Conversion Error: {0}")]
    Conversion(#[from] ConversionError),
    #[error("Inference Error: {0}")]
    Inference(#[from] InferenceError),
}

impl PipelineError {
    /// Short message suitable for showing to the user
    pub fn user_message(&self) -> &'static str {
        match self {
            PipelineError::Conversion(_) => "Couldn't read that photo.",
            PipelineError::Inference(_) => "Couldn't analyze that photo.",
        }
    }
}

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("The image contains no data")]
    Empty,
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Target size {0}x{1} is invalid")]
    InvalidTargetSize(u32, u32),
}

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Failed to load model {path:?}: {message}")]
    ModelLoad { path: PathBuf, message: String },
    #[error("Failed to load labels {path:?}: {source}")]
    LabelsLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Labels file {0:?} has no labels")]
    NoLabels(PathBuf),
    #[error("Model run failed: {0}")]
    Runtime(String),
    #[error("Model produced {actual} scores for {expected} labels")]
    OutputMismatch { expected: usize, actual: usize },
    #[error("Classifier task failed: {0}")]
    TaskFailed(String),
    #[error("Classifier returned no results")]
    NoResults,
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SourceError {
    pub fn origin(&self) -> String {
        match self {
            SourceError::Read { path, .. } => path.display().to_string(),
        }
    }

    pub fn user_message(&self) -> &'static str {
        "Couldn't read that photo."
    }
}
