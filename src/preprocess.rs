use std::{io::Cursor, path::Path};

use burn::{
    prelude::Backend,
    tensor::{Tensor, TensorData},
};
use image::{imageops::FilterType, DynamicImage, ImageFormat, ImageReader};

use crate::error::ValidationError;

/// Side length of the square network input.
pub const IMAGE_SIZE: usize = 150;

/// Channels after conversion to RGB.
pub const CHANNELS: usize = 3;

/// Largest width or height accepted from an upload.
pub const MAX_UPLOAD_DIMENSION: u32 = 10_000;

pub const UPLOAD_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// One image resized to `IMAGE_SIZE` and rescaled to `[0, 1]`, stored
/// row-major as height x width x channel.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessedImage {
    pixels: Vec<f32>,
}

impl PreprocessedImage {
    pub fn from_image(image: &DynamicImage) -> Self {
        let resized = image::imageops::resize(
            &image.to_rgb8(),
            IMAGE_SIZE as u32,
            IMAGE_SIZE as u32,
            FilterType::Triangle,
        );
        let pixels = resized
            .into_raw()
            .into_iter()
            .map(|v| v as f32 / 255.0)
            .collect();

        Self { pixels }
    }

    /// An all-black image, used in place of training files that fail to decode.
    pub fn blank() -> Self {
        Self {
            pixels: vec![0.0; IMAGE_SIZE * IMAGE_SIZE * CHANNELS],
        }
    }

    pub fn open(path: &Path) -> image::ImageResult<Self> {
        Ok(Self::from_image(&image::open(path)?))
    }

    /// Batch-of-one shape in height/width/channel layout.
    pub fn shape(&self) -> [usize; 4] {
        [1, IMAGE_SIZE, IMAGE_SIZE, CHANNELS]
    }

    pub fn into_pixels(self) -> Vec<f32> {
        self.pixels
    }

    /// `[1, 3, IMAGE_SIZE, IMAGE_SIZE]` tensor ready for the model.
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 4> {
        let data = TensorData::new(self.pixels.clone(), self.shape());
        channels_first(Tensor::from_data(data, device))
    }
}

/// `[n, h, w, c]` -> `[n, c, h, w]`.
pub fn channels_first<B: Backend>(images: Tensor<B, 4>) -> Tensor<B, 4> {
    images.swap_dims(2, 3).swap_dims(1, 2)
}

/// Checks an uploaded file before it reaches the model and decodes it.
///
/// `file_name` is optional because dropped files are not always named.
pub fn validate_upload(
    file_name: Option<&str>,
    bytes: &[u8],
) -> Result<DynamicImage, ValidationError> {
    if bytes.is_empty() {
        return Err(ValidationError::Empty);
    }

    if let Some(extension) = file_name
        .and_then(|name| Path::new(name).extension())
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
    {
        if !UPLOAD_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ValidationError::UnsupportedExtension(extension));
        }
    }

    let format = image::guess_format(bytes).map_err(|_| ValidationError::UnrecognizedFormat)?;
    if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
        return Err(ValidationError::UnsupportedFormat(format!("{format:?}")));
    }

    // Only the header is read here; nothing is allocated for pixel data
    // until the dimensions are known to be acceptable.
    let (width, height) = ImageReader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .map_err(|err| ValidationError::Decode(err.to_string()))?;
    if width > MAX_UPLOAD_DIMENSION || height > MAX_UPLOAD_DIMENSION {
        return Err(ValidationError::TooLarge {
            width,
            height,
            max: MAX_UPLOAD_DIMENSION,
        });
    }

    let image = image::load_from_memory_with_format(bytes, format)
        .map_err(|err| ValidationError::Decode(err.to_string()))?;

    Ok(image)
}
