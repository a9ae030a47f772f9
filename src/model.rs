use burn::{
    prelude::*,
    tensor::{
        activation::{log_softmax, softmax},
        backend::AutodiffBackend,
    },
    train::{ClassificationOutput, TrainOutput, TrainStep, ValidStep},
};
use nn::{
    conv::{Conv2d, Conv2dConfig},
    pool::{MaxPool2d, MaxPool2dConfig},
    Linear, LinearConfig, Relu,
};

use crate::{dataset::ImageBatch, labels::ClassLabelSet, preprocess::IMAGE_SIZE};

#[derive(Module, Debug)]
pub struct Model<B: Backend> {
    conv1: Conv2d<B>,
    pool1: MaxPool2d,
    conv2: Conv2d<B>,
    pool2: MaxPool2d,
    linear1: Linear<B>,
    linear2: Linear<B>,
    activation: Relu,
}

#[derive(Config, Debug)]
pub struct ModelConfig {
    /// Output index -> label table; its length is the number of classes.
    pub class_labels: ClassLabelSet,
    #[config(default = "128")]
    pub hidden_size: usize,
    #[config(default = "150")]
    pub image_size: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::new(ClassLabelSet::canonical())
    }
}

impl ModelConfig {
    pub fn num_classes(&self) -> usize {
        self.class_labels.len()
    }

    /// Fails unless the network is sized for the images the batcher and the
    /// upload path produce.
    pub fn check_image_size(&self) -> Result<(), String> {
        if self.image_size != IMAGE_SIZE {
            return Err(format!(
                "model expects {0}x{0} inputs but images are prepared at {1}x{1}",
                self.image_size, IMAGE_SIZE
            ));
        }
        Ok(())
    }

    /// Side length of the last pooled feature map: each unpadded 3x3
    /// convolution trims 2 pixels and each pooling halves.
    pub fn feature_map_size(&self) -> usize {
        let after_block = |size: usize| size.saturating_sub(2) / 2;
        after_block(after_block(self.image_size))
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Model<B> {
        let features = 64 * self.feature_map_size().pow(2);
        Model {
            conv1: Conv2dConfig::new([3, 32], [3, 3]).init(device),
            pool1: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            conv2: Conv2dConfig::new([32, 64], [3, 3]).init(device),
            pool2: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            linear1: LinearConfig::new(features, self.hidden_size).init(device),
            linear2: LinearConfig::new(self.hidden_size, self.num_classes()).init(device),
            activation: Relu::new(),
        }
    }
}

impl<B: Backend> Model<B> {
    /// # Shapes
    ///   - Images [batch_size, 3, image_size, image_size]
    ///   - Output [batch_size, num_classes] (logits)
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.conv1.forward(images); // [batch_size, 32, 148, 148]
        let x = self.activation.forward(x);
        let x = self.pool1.forward(x); // [batch_size, 32, 74, 74]

        let x = self.conv2.forward(x); // [batch_size, 64, 72, 72]
        let x = self.activation.forward(x);
        let x = self.pool2.forward(x); // [batch_size, 64, 36, 36]

        let [batch_size, channels, height, width] = x.dims();
        let x = x.reshape([batch_size, channels * height * width]);

        let x = self.linear1.forward(x);
        let x = self.activation.forward(x);

        self.linear2.forward(x)
    }

    /// Softmax over the class dimension.
    pub fn predict(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        softmax(self.forward(images), 1)
    }

    pub fn forward_classification(
        &self,
        images: Tensor<B, 4>,
        labels: Tensor<B, 2>,
    ) -> ClassificationOutput<B> {
        let output = self.forward(images);
        let loss = categorical_cross_entropy(output.clone(), labels.clone());
        let targets = labels.argmax(1).squeeze(1);

        ClassificationOutput::new(loss, output, targets)
    }
}

/// Mean over the batch of `-sum(one_hot * log_softmax(logits))`.
pub fn categorical_cross_entropy<B: Backend>(
    logits: Tensor<B, 2>,
    one_hot: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let log_probs = log_softmax(logits, 1);
    (one_hot * log_probs).sum_dim(1).mean().neg()
}

impl<B: AutodiffBackend> TrainStep<ImageBatch<B>, ClassificationOutput<B>> for Model<B> {
    fn step(&self, item: ImageBatch<B>) -> TrainOutput<ClassificationOutput<B>> {
        let item = self.forward_classification(item.images, item.labels);

        TrainOutput::new(self, item.loss.backward(), item)
    }
}

impl<B: Backend> ValidStep<ImageBatch<B>, ClassificationOutput<B>> for Model<B> {
    fn step(&self, item: ImageBatch<B>) -> ClassificationOutput<B> {
        self.forward_classification(item.images, item.labels)
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;

    use super::*;

    type TestBackend = NdArray;

    #[test]
    fn feature_map_matches_input_size() {
        let config = ModelConfig::default();
        assert_eq!(config.image_size, 150);
        assert_eq!(config.feature_map_size(), 36);
        assert_eq!(config.num_classes(), 4);

        let small = ModelConfig::default().with_image_size(16);
        assert_eq!(small.feature_map_size(), 2);
        assert!(config.check_image_size().is_ok());
        assert!(small.check_image_size().unwrap_err().contains("16x16"));
    }

    #[test]
    fn forward_maps_images_to_class_probabilities() {
        let device = Default::default();
        let model = ModelConfig::default().init::<TestBackend>(&device);

        let images = Tensor::<TestBackend, 4>::ones([2, 3, 150, 150], &device) * 0.5;
        let probabilities = model.predict(images);
        assert_eq!(probabilities.dims(), [2, 4]);

        let rows = probabilities
            .sum_dim(1)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .unwrap();
        for total in rows {
            assert!((total - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn cross_entropy_of_confident_correct_prediction_is_small() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::from_floats([[10.0, 0.0, 0.0], [0.0, 0.0, 10.0]], &device);
        let right = Tensor::<TestBackend, 2>::from_floats([[1.0, 0.0, 0.0], [0.0, 0.0, 1.0]], &device);
        let wrong = Tensor::<TestBackend, 2>::from_floats([[0.0, 1.0, 0.0], [1.0, 0.0, 0.0]], &device);

        let low = categorical_cross_entropy(logits.clone(), right).into_scalar();
        let high = categorical_cross_entropy(logits, wrong).into_scalar();
        assert!(low < 0.01);
        assert!(high > 9.0);
    }

    #[test]
    fn uniform_logits_give_log_num_classes() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::zeros([3, 4], &device);
        let labels = Tensor::<TestBackend, 2>::from_floats(
            [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 0.0, 1.0]],
            &device,
        );
        let loss = categorical_cross_entropy(logits, labels).into_scalar();
        assert!((loss - 4f32.ln()).abs() < 1e-5);
    }
}
