use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    #[error("the class label table is empty")]
    Empty,
    #[error("class label #{0} is blank")]
    Blank(usize),
    #[error("duplicate class label `{0}`")]
    Duplicate(String),
}

/// Setup errors raised while reading a labeled image directory.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset directory {} does not exist or is not a directory", .0.display())]
    MissingRoot(PathBuf),
    #[error("dataset directory {} has no class subdirectories", .0.display())]
    NoClasses(PathBuf),
    #[error("dataset directory {} contains no image files", .0.display())]
    NoImages(PathBuf),
    #[error("class labels differ between splits: training {training}, evaluation {evaluation}")]
    LabelMismatch {
        training: String,
        evaluation: String,
    },
    #[error(transparent)]
    Labels(#[from] LabelError),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Setup errors raised while writing or opening a trained model artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to prepare artifact directory {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model config {} could not be read or written: {message}", path.display())]
    Config { path: PathBuf, message: String },
    #[error("model weights {} could not be read or written: {message}", path.display())]
    Record { path: PathBuf, message: String },
}

/// A rejected upload, reported before any tensor work happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("the uploaded file is empty")]
    Empty,
    #[error("unsupported file type `.{0}`; expected jpg, jpeg or png")]
    UnsupportedExtension(String),
    #[error("the uploaded file is not a recognizable image")]
    UnrecognizedFormat,
    #[error("unsupported image format {0}; expected JPEG or PNG")]
    UnsupportedFormat(String),
    #[error("the image could not be decoded: {0}")]
    Decode(String),
    #[error("the image is {width}x{height}; at most {max}x{max} pixels are accepted")]
    TooLarge { width: u32, height: u32, max: u32 },
}

/// Per-request failure shown to the user; the program keeps running.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("model produced {got} probabilities for {expected} labels")]
    OutputShape { expected: usize, got: usize },
    #[error("model output could not be read: {0}")]
    Output(String),
    #[error("model output is not a valid probability vector")]
    InvalidProbabilities,
}

/// Anything that stops the trainer. All variants are setup errors.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}
