//! Image normalization for the learned classifier.
//!
//! Every input image, whatever its size or encoding, becomes a tensor of shape
//! `[size, size, 3]` with values in [0, 1]. The aspect ratio is not preserved:
//! no letterboxing and no cropping.

use image::{DynamicImage, imageops::FilterType};
use ndarray::{Array3, Array4, ArrayView3, Axis};

use crate::error::DecodeError;

/// Side length the classifier was trained with.
pub const DEFAULT_IMAGE_SIZE: u32 = 380;

/// Channel layout of the last tensor axis.
///
/// The training pipeline decoded images with OpenCV, which yields BGR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelOrder {
    #[default]
    Bgr,
    Rgb,
}

impl ChannelOrder {
    /// Source RGB channel index for each output channel.
    fn source_indices(self) -> [usize; 3] {
        match self {
            ChannelOrder::Rgb => [0, 1, 2],
            ChannelOrder::Bgr => [2, 1, 0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageNormalizerConfig {
    pub width: u32,
    pub height: u32,
    pub channel_order: ChannelOrder,
}

impl Default for ImageNormalizerConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_IMAGE_SIZE,
            height: DEFAULT_IMAGE_SIZE,
            channel_order: ChannelOrder::default(),
        }
    }
}

/// A normalized image, shape `[H, W, 3]`, values in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor(Array3<f32>);

impl ImageTensor {
    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }

    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.0.view()
    }

    /// Batch of one, `[1, H, W, 3]`, as expected by the model input.
    pub fn to_batch(&self) -> Array4<f32> {
        self.0.clone().insert_axis(Axis(0))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImageNormalizer {
    config: ImageNormalizerConfig,
}

impl ImageNormalizer {
    pub fn new(config: ImageNormalizerConfig) -> Self {
        Self { config }
    }

    /// Decode `bytes` and normalize the result.
    pub fn normalize(&self, bytes: &[u8]) -> Result<ImageTensor, DecodeError> {
        let image = image::load_from_memory(bytes)?;
        Ok(self.normalize_image(&image))
    }

    /// Resize to the configured size (bilinear) and rescale to [0, 1].
    pub fn normalize_image(&self, image: &DynamicImage) -> ImageTensor {
        let ImageNormalizerConfig {
            width,
            height,
            channel_order,
        } = self.config;
        let rgb = image
            .resize_exact(width, height, FilterType::Triangle)
            .to_rgb8();

        let sources = channel_order.source_indices();
        let mut arr = Array3::<f32>::zeros((height as usize, width as usize, 3));
        for (x, y, pixel) in rgb.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for (c, &src) in sources.iter().enumerate() {
                arr[[y, x, c]] = pixel[src] as f32 / 255.0;
            }
        }
        ImageTensor(arr)
    }
}
