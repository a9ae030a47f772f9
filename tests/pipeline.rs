//! Trains on a tiny synthetic dataset and reopens the artifact for inference.

use std::{fs, io::Cursor, path::Path};

use brain_tumor::{
    error::InferenceError,
    training::{CONFIG_FILE, MODEL_FILE},
    Classifier, ModelConfig, TrainingConfig,
};
use burn::{
    backend::{Autodiff, NdArray},
    optim::AdamConfig,
};
use image::{ImageFormat, Rgb, RgbImage};

type TestBackend = NdArray;
type TestAutodiffBackend = Autodiff<TestBackend>;

fn scan(shade: u8, stripe: bool) -> RgbImage {
    RgbImage::from_fn(64, 64, |x, _| {
        if stripe && x % 8 < 4 {
            Rgb([255, 255, 255])
        } else {
            Rgb([shade, shade, shade])
        }
    })
}

fn write_split(root: &Path) {
    for (class, stripe) in [("glioma", true), ("no_tumor", false)] {
        let dir = root.join(class);
        fs::create_dir_all(&dir).unwrap();
        for (i, shade) in [40u8, 90].into_iter().enumerate() {
            scan(shade, stripe).save(dir.join(format!("{i}.png"))).unwrap();
        }
    }
}

fn png_bytes(image: &RgbImage) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

#[test]
fn trained_artifact_can_be_loaded_and_queried() {
    let workspace = tempfile::tempdir().unwrap();
    let data_dir = workspace.path().join("brain_tumor_app");
    let artifact_dir = workspace.path().join("brain_tumor_model");
    write_split(&data_dir.join("Training"));
    write_split(&data_dir.join("Testing"));

    let config = TrainingConfig::new(ModelConfig::default(), AdamConfig::new())
        .with_batch_size(2)
        .with_num_workers(1);
    let report = brain_tumor::train::<TestAutodiffBackend>(
        &artifact_dir,
        &data_dir.join("Training"),
        &data_dir.join("Testing"),
        config,
        Default::default(),
    )
    .unwrap();

    let labels: Vec<&str> = report.labels.iter().collect();
    assert_eq!(labels, ["glioma", "no_tumor"]);

    assert_eq!(report.epochs.len(), 10);
    for (i, summary) in report.epochs.iter().enumerate() {
        assert_eq!(summary.epoch, i + 1);
        assert_eq!(summary.epoch_total, 10);
        for phase in [&summary.train, &summary.valid] {
            assert!(phase["Loss"].is_finite());
            assert!((0.0..=100.0).contains(&phase["Accuracy"]));
        }
    }
    assert!(artifact_dir.join(CONFIG_FILE).is_file());
    assert!(fs::read_dir(&artifact_dir)
        .unwrap()
        .filter_map(Result::ok)
        .any(|entry| entry.file_name().to_string_lossy().starts_with(MODEL_FILE)));

    let classifier = Classifier::<TestBackend>::load(&artifact_dir, Default::default()).unwrap();
    assert_eq!(classifier.labels(), &report.labels);

    let prediction = classifier
        .classify_upload(Some("scan.png"), &png_bytes(&scan(60, true)))
        .unwrap();
    assert!(labels.contains(&prediction.label.as_str()));
    assert_eq!(prediction.probabilities.len(), 2);
    assert!((0.0..=100.0).contains(&prediction.confidence));

    let err = classifier
        .classify_upload(Some("scan.png"), b"GIF89a but not really")
        .unwrap_err();
    assert!(matches!(err, InferenceError::Validation(_)));
}

#[test]
fn mismatched_splits_abort_training() {
    let workspace = tempfile::tempdir().unwrap();
    let training = workspace.path().join("Training");
    let testing = workspace.path().join("Testing");
    write_split(&training);
    fs::create_dir_all(testing.join("pituitary")).unwrap();
    scan(10, false).save(testing.join("pituitary/0.png")).unwrap();

    let result = brain_tumor::train::<TestAutodiffBackend>(
        &workspace.path().join("model"),
        &training,
        &testing,
        TrainingConfig::default(),
        Default::default(),
    );

    let err = result.unwrap_err();
    assert!(err.to_string().contains("class labels differ"));
}
