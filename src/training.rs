use std::path::{Path, PathBuf};

use burn::{
    data::dataloader::DataLoaderBuilder,
    optim::AdamConfig,
    prelude::*,
    record::CompactRecorder,
    tensor::backend::AutodiffBackend,
    train::{
        metric::{AccuracyMetric, LossMetric},
        LearnerBuilder,
    },
};

use crate::{
    dataset::{ImageBatcher, LabeledImageDataset},
    error::{ArtifactError, TrainingError},
    labels::ClassLabelSet,
    model::ModelConfig,
    renderer::{EpochHistory, EpochReporter, EpochSummary},
};

/// Saved next to the weights; holds the label table the classifier reads back.
pub const CONFIG_FILE: &str = "config.json";

/// Weights file stem; the recorder appends its own extension.
pub const MODEL_FILE: &str = "model";

#[derive(Config)]
pub struct TrainingConfig {
    pub model: ModelConfig,
    pub optimizer: AdamConfig,
    #[config(default = 10)]
    pub num_epochs: usize,
    #[config(default = 32)]
    pub batch_size: usize,
    #[config(default = 4)]
    pub num_workers: usize,
    #[config(default = 42)]
    pub seed: u64,
    #[config(default = 1.0e-3)]
    pub learning_rate: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self::new(ModelConfig::default(), AdamConfig::new())
    }
}

impl TrainingConfig {
    /// Same hyper-parameters, network sized for `labels`.
    pub fn with_class_labels(mut self, labels: ClassLabelSet) -> Self {
        self.model.class_labels = labels;
        self
    }
}

#[derive(Debug)]
pub struct TrainingReport {
    pub labels: ClassLabelSet,
    pub artifact_dir: PathBuf,
    /// Epochs the reporter had closed when fitting returned.
    pub epochs: Vec<EpochSummary>,
}

/// Fits the classifier on `training_dir`, evaluates every epoch on
/// `testing_dir` and writes the artifact into `artifact_dir`.
///
/// The label table stored in the artifact is the one discovered in
/// `training_dir`; whatever labels `config` carried are replaced.
pub fn train<B: AutodiffBackend>(
    artifact_dir: &Path,
    training_dir: &Path,
    testing_dir: &Path,
    config: TrainingConfig,
    device: B::Device,
) -> Result<TrainingReport, TrainingError> {
    let dataset_train = LabeledImageDataset::from_dir(training_dir)?;
    let dataset_test = LabeledImageDataset::from_dir(testing_dir)?;
    dataset_train.ensure_same_labels(&dataset_test)?;

    let labels = dataset_train.labels().clone();
    if !labels.is_canonical() {
        log::warn!("training on non-standard class labels {labels}");
    }
    for (index, label) in labels.iter().enumerate() {
        log::info!(
            "class {index} `{label}`: {} training / {} evaluation images",
            dataset_train.count_for(index),
            dataset_test.count_for(index)
        );
    }

    let config = config.with_class_labels(labels.clone());
    let config_path = artifact_dir.join(CONFIG_FILE);
    config
        .model
        .check_image_size()
        .map_err(|message| ArtifactError::Config {
            path: config_path.clone(),
            message,
        })?;

    prepare_artifact_dir(artifact_dir)?;
    config
        .save(&config_path)
        .map_err(|err| ArtifactError::Config {
            path: config_path.clone(),
            message: err.to_string(),
        })?;

    B::seed(config.seed);

    let num_classes = labels.len();
    let batcher_train = ImageBatcher::<B>::new(num_classes, device.clone());
    let batcher_valid = ImageBatcher::<B::InnerBackend>::new(num_classes, device.clone());

    let dataloader_train = DataLoaderBuilder::new(batcher_train)
        .batch_size(config.batch_size)
        .shuffle(config.seed)
        .num_workers(config.num_workers)
        .build(dataset_train);

    let dataloader_test = DataLoaderBuilder::new(batcher_valid)
        .batch_size(config.batch_size)
        .num_workers(config.num_workers)
        .build(dataset_test);

    let history = EpochHistory::default();
    let learner_dir = artifact_dir.to_string_lossy().to_string();
    let learner = LearnerBuilder::new(&learner_dir)
        .metric_train_numeric(AccuracyMetric::new())
        .metric_valid_numeric(AccuracyMetric::new())
        .metric_train_numeric(LossMetric::new())
        .metric_valid_numeric(LossMetric::new())
        .with_application_logger(None)
        .renderer(EpochReporter::new(history.clone()))
        .devices(vec![device.clone()])
        .num_epochs(config.num_epochs)
        .summary()
        .build(
            config.model.init::<B>(&device),
            config.optimizer.init(),
            config.learning_rate,
        );

    log::info!(
        "training for {} epochs with batch size {}",
        config.num_epochs,
        config.batch_size
    );
    let model_trained = learner.fit(dataloader_train, dataloader_test);

    let model_path = artifact_dir.join(MODEL_FILE);
    model_trained
        .save_file(model_path.clone(), &CompactRecorder::new())
        .map_err(|err| ArtifactError::Record {
            path: model_path,
            message: format!("{err:?}"),
        })?;
    log::info!("model saved to {}", artifact_dir.display());

    let epochs = history
        .lock()
        .map(|epochs| epochs.clone())
        .unwrap_or_default();

    Ok(TrainingReport {
        labels,
        artifact_dir: artifact_dir.to_path_buf(),
        epochs,
    })
}

fn prepare_artifact_dir(artifact_dir: &Path) -> Result<(), ArtifactError> {
    // Stale metric logs would leak into the learner summary.
    for stale in ["train", "valid"] {
        std::fs::remove_dir_all(artifact_dir.join(stale)).ok();
    }
    std::fs::create_dir_all(artifact_dir).map_err(|source| ArtifactError::Io {
        path: artifact_dir.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_reference_recipe() {
        let config = TrainingConfig::default();
        assert_eq!(config.num_epochs, 10);
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.learning_rate, 1.0e-3);
        assert!(config.model.class_labels.is_canonical());
    }

    #[test]
    fn class_labels_replace_the_model_table() {
        let labels = ClassLabelSet::new(vec!["a".to_string(), "b".to_string()]).unwrap();
        let config = TrainingConfig::default().with_class_labels(labels.clone());
        assert_eq!(config.model.class_labels, labels);
        assert_eq!(config.model.num_classes(), 2);
    }

    #[test]
    fn config_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let labels = ClassLabelSet::new(vec!["b".to_string(), "a".to_string()]).unwrap();
        TrainingConfig::default()
            .with_num_epochs(3)
            .with_class_labels(labels.clone())
            .save(&path)
            .unwrap();

        let loaded = TrainingConfig::load(&path).unwrap();
        assert_eq!(loaded.num_epochs, 3);
        assert_eq!(loaded.model.class_labels, labels);
    }

    #[test]
    fn duplicate_labels_in_a_saved_config_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        TrainingConfig::default().save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let tampered = text.replace("\"meningioma\"", "\"glioma\"");
        assert_ne!(text, tampered);
        std::fs::write(&path, tampered).unwrap();

        assert!(TrainingConfig::load(&path).is_err());
    }

    #[test]
    fn missing_training_directory_stops_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let artifact_dir = dir.path().join("model");
        let err = train::<burn::backend::Autodiff<burn::backend::NdArray>>(
            &artifact_dir,
            &dir.path().join("Training"),
            &dir.path().join("Testing"),
            TrainingConfig::default(),
            Default::default(),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            TrainingError::Dataset(crate::error::DatasetError::MissingRoot(_))
        ));
        assert!(!artifact_dir.exists());
    }

    #[test]
    fn mismatched_input_size_stops_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        for split in ["Training", "Testing"] {
            let class_dir = dir.path().join(split).join("glioma");
            std::fs::create_dir_all(&class_dir).unwrap();
            image::RgbImage::new(8, 8).save(class_dir.join("0.png")).unwrap();
        }
        let artifact_dir = dir.path().join("model");
        let config = TrainingConfig::new(
            ModelConfig::default().with_image_size(16),
            AdamConfig::new(),
        );

        let err = train::<burn::backend::Autodiff<burn::backend::NdArray>>(
            &artifact_dir,
            &dir.path().join("Training"),
            &dir.path().join("Testing"),
            config,
            Default::default(),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            TrainingError::Artifact(ArtifactError::Config { .. })
        ));
        assert!(err.to_string().contains("16x16"));
        assert!(!artifact_dir.exists());
    }
}
