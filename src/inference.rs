use std::path::Path;

use burn::{
    config::Config,
    module::Module,
    prelude::Backend,
    record::{CompactRecorder, Recorder},
};
use image::DynamicImage;

use crate::{
    error::{ArtifactError, InferenceError},
    labels::{self, ClassLabelSet},
    model::Model,
    preprocess::{validate_upload, PreprocessedImage},
    training::{TrainingConfig, CONFIG_FILE, MODEL_FILE},
};

/// A loaded, read-only model together with the label table it was trained on.
///
/// Built once and handed to whoever classifies; nothing about it is global.
pub struct Classifier<B: Backend> {
    model: Model<B>,
    labels: ClassLabelSet,
    device: B::Device,
}

impl<B: Backend> Classifier<B> {
    pub fn new(model: Model<B>, labels: ClassLabelSet, device: B::Device) -> Self {
        Self {
            model,
            labels,
            device,
        }
    }

    /// Opens an artifact directory written by [`crate::train`].
    pub fn load(artifact_dir: &Path, device: B::Device) -> Result<Self, ArtifactError> {
        let config_path = artifact_dir.join(CONFIG_FILE);
        let config = TrainingConfig::load(&config_path).map_err(|err| ArtifactError::Config {
            path: config_path.clone(),
            message: format!("{err:?}"),
        })?;

        config
            .model
            .check_image_size()
            .map_err(|message| ArtifactError::Config {
                path: config_path,
                message,
            })?;

        let labels = config.model.class_labels.clone();
        if !labels.is_canonical() {
            log::warn!("model uses non-standard class labels {labels}");
        }

        let model_path = artifact_dir.join(MODEL_FILE);
        let record = CompactRecorder::new()
            .load(model_path.clone(), &device)
            .map_err(|err| ArtifactError::Record {
                path: model_path,
                message: format!("{err:?}"),
            })?;
        let model = config.model.init::<B>(&device).load_record(record);

        log::info!(
            "loaded model from {} with labels {labels}",
            artifact_dir.display()
        );
        Ok(Self::new(model, labels, device))
    }

    pub fn labels(&self) -> &ClassLabelSet {
        &self.labels
    }

    /// Validates, preprocesses and classifies one uploaded file.
    pub fn classify_upload(
        &self,
        file_name: Option<&str>,
        bytes: &[u8],
    ) -> Result<Prediction, InferenceError> {
        let image = validate_upload(file_name, bytes)?;
        self.classify_image(&image)
    }

    pub fn classify_image(&self, image: &DynamicImage) -> Result<Prediction, InferenceError> {
        let prepared = PreprocessedImage::from_image(image);
        let probabilities = self.probabilities(&prepared)?;
        Prediction::from_probabilities(probabilities, &self.labels)
    }

    /// One forward pass; returns the softmax row for the single image.
    pub fn probabilities(&self, prepared: &PreprocessedImage) -> Result<Vec<f32>, InferenceError> {
        let input = prepared.to_tensor::<B>(&self.device);
        let output = self.model.predict(input);

        output
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|err| InferenceError::Output(format!("{err:?}")))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub index: usize,
    pub label: String,
    /// `100 * max(probabilities)` rounded to two decimals.
    pub confidence: f64,
    pub probabilities: Vec<f32>,
}

impl Prediction {
    pub fn from_probabilities(
        probabilities: Vec<f32>,
        labels: &ClassLabelSet,
    ) -> Result<Self, InferenceError> {
        if probabilities.len() != labels.len() {
            return Err(InferenceError::OutputShape {
                expected: labels.len(),
                got: probabilities.len(),
            });
        }
        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(InferenceError::InvalidProbabilities);
        }

        // first maximum wins on ties
        let (index, max) = probabilities
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (i, p)| {
                if p > best.1 {
                    (i, p)
                } else {
                    best
                }
            });
        let label = labels
            .get(index)
            .ok_or(InferenceError::InvalidProbabilities)?
            .to_string();

        Ok(Self {
            index,
            label,
            confidence: confidence_percent(max),
            probabilities,
        })
    }

    pub fn description(&self) -> &'static str {
        labels::description(&self.label)
    }
}

/// Percentage with two decimals, clamped to `[0, 100]`.
pub fn confidence_percent(probability: f32) -> f64 {
    let percent = (f64::from(probability) * 100.0 * 100.0).round() / 100.0;
    percent.clamp(0.0, 100.0)
}
