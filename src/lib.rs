pub mod config;
pub mod dataset;
pub mod error;
pub mod inference;
pub mod labels;
pub mod model;
pub mod preprocess;
pub mod renderer;
pub mod training;
pub mod ui;

pub use inference::{Classifier, Prediction};
pub use labels::{ClassLabelSet, CLASS_LABELS};
pub use model::{Model, ModelConfig};
pub use training::{train, TrainingConfig, TrainingReport};
