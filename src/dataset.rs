use std::{
    fs,
    path::{Path, PathBuf},
};

use burn::{
    data::{dataloader::batcher::Batcher, dataset::Dataset},
    prelude::Backend,
    tensor::{Int, Tensor, TensorData},
};

use crate::{
    error::DatasetError,
    labels::ClassLabelSet,
    preprocess::{channels_first, PreprocessedImage, CHANNELS, IMAGE_SIZE},
};

/// File extensions picked up when scanning a class directory.
pub const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "bmp", "gif", "tif", "tiff"];

/// A labeled image directory: every subdirectory is a class, every image file
/// inside it is a sample of that class. Classes are indexed in sorted name order.
pub struct LabeledImageDataset {
    labels: ClassLabelSet,
    items: Vec<LabeledImageItem>,
}

#[derive(Debug, Clone)]
pub struct LabeledImageItem {
    pub path: PathBuf,
    pub label: usize,
}

impl LabeledImageDataset {
    pub fn from_dir(root: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(DatasetError::MissingRoot(root.to_path_buf()));
        }

        let mut class_dirs = Vec::new();
        for entry in read_dir(root)? {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                log::warn!("skipping class directory with a non UTF-8 name: {}", path.display());
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            class_dirs.push((name.to_string(), path));
        }

        if class_dirs.is_empty() {
            return Err(DatasetError::NoClasses(root.to_path_buf()));
        }
        class_dirs.sort_by(|a, b| a.0.cmp(&b.0));

        let mut items = Vec::new();
        for (label, (name, dir)) in class_dirs.iter().enumerate() {
            let mut files: Vec<PathBuf> = read_dir(dir)?
                .into_iter()
                .map(|entry| entry.path())
                .filter(|path| path.is_file() && !is_hidden(path) && has_image_extension(path))
                .collect();
            files.sort();

            if files.is_empty() {
                log::warn!("class `{name}` in {} has no images", root.display());
            }
            items.extend(files.into_iter().map(|path| LabeledImageItem { path, label }));
        }

        if items.is_empty() {
            return Err(DatasetError::NoImages(root.to_path_buf()));
        }

        let labels = ClassLabelSet::new(class_dirs.into_iter().map(|(name, _)| name).collect())?;
        log::info!(
            "found {} images belonging to {} classes in {}",
            items.len(),
            labels.len(),
            root.display()
        );

        Ok(Self { labels, items })
    }

    pub fn labels(&self) -> &ClassLabelSet {
        &self.labels
    }

    pub fn count_for(&self, label: usize) -> usize {
        self.items.iter().filter(|item| item.label == label).count()
    }

    /// Fails unless both splits index their classes identically.
    pub fn ensure_same_labels(&self, other: &Self) -> Result<(), DatasetError> {
        if self.labels != other.labels {
            return Err(DatasetError::LabelMismatch {
                training: self.labels.to_string(),
                evaluation: other.labels.to_string(),
            });
        }
        Ok(())
    }
}

impl Dataset<LabeledImageItem> for LabeledImageDataset {
    fn get(&self, index: usize) -> Option<LabeledImageItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

fn read_dir(dir: &Path) -> Result<Vec<fs::DirEntry>, DatasetError> {
    let io_err = |source| DatasetError::Io {
        path: dir.to_path_buf(),
        source,
    };
    fs::read_dir(dir)
        .map_err(io_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err)
}

// Covers dotfiles and the `._name` resource forks macOS leaves next to copies.
fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('.'))
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// `num_classes` wide vector with a single 1 at `label`.
pub fn one_hot(label: usize, num_classes: usize) -> Vec<f32> {
    let mut encoded = vec![0.0; num_classes];
    if let Some(slot) = encoded.get_mut(label) {
        *slot = 1.0;
    }
    encoded
}

#[derive(Clone)]
pub struct ImageBatcher<B: Backend> {
    num_classes: usize,
    device: B::Device,
}

#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// `[batch_size, 3, IMAGE_SIZE, IMAGE_SIZE]`, values in `[0, 1]`.
    pub images: Tensor<B, 4>,
    /// One-hot rows, `[batch_size, num_classes]`.
    pub labels: Tensor<B, 2>,
}

impl<B: Backend> ImageBatch<B> {
    /// Class indices recovered from the one-hot rows.
    pub fn targets(&self) -> Tensor<B, 1, Int> {
        self.labels.clone().argmax(1).squeeze(1)
    }
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(num_classes: usize, device: B::Device) -> Self {
        Self {
            num_classes,
            device,
        }
    }
}

impl<B: Backend> Batcher<LabeledImageItem, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<LabeledImageItem>) -> ImageBatch<B> {
        let batch_size = items.len();
        let mut pixels = Vec::with_capacity(batch_size * IMAGE_SIZE * IMAGE_SIZE * CHANNELS);
        let mut labels = Vec::with_capacity(batch_size * self.num_classes);

        for item in items {
            let image = PreprocessedImage::open(&item.path).unwrap_or_else(|err| {
                log::warn!("could not load {}: {err}; using a blank image", item.path.display());
                PreprocessedImage::blank()
            });
            pixels.extend(image.into_pixels());
            labels.extend(one_hot(item.label, self.num_classes));
        }

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [batch_size, IMAGE_SIZE, IMAGE_SIZE, CHANNELS]),
            &self.device,
        );
        let labels = Tensor::<B, 2>::from_data(
            TensorData::new(labels, [batch_size, self.num_classes]),
            &self.device,
        );

        ImageBatch {
            images: channels_first(images),
            labels,
        }
    }
}
