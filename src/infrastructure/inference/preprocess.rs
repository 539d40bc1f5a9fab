//! Deterministic image preprocessing for the classifier

use candle_core::{DType, Device, Tensor};
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use std::path::Path;

use crate::domain::DomainError;

/// Side length of the square network input
pub const INPUT_SIZE: u32 = 224;

/// Number of channels the network expects
const INPUT_CHANNELS: usize = 3;

/// 8-bit luma with ITU-R 601-2 weights, in 16.16 fixed point
fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000) >> 16) as u8
}

/// Convert any decoded image to single-channel 8-bit luma
pub fn to_luma(image: &DynamicImage) -> GrayImage {
    let rgb = image.to_rgb8();

    ImageBuffer::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        Luma([luma(r, g, b)])
    })
}

/// Turns encoded image bytes into a normalized (1, 3, 224, 224) tensor.
///
/// Pipeline: decode, luma, bilinear resize, replicate to three channels,
/// scale to [0, 1] and normalize with mean 0.5 / std 0.5 so every value lies
/// in [-1, 1].
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    device: Device,
}

impl ImagePreprocessor {
    pub fn new(device: Device) -> Self {
        Self { device }
    }

    pub fn preprocess_path(&self, path: &Path) -> Result<Tensor, DomainError> {
        let bytes = std::fs::read(path).map_err(|e| {
            DomainError::invalid_image(format!("Cannot read {}: {}", path.display(), e))
        })?;

        self.preprocess_bytes(&bytes)
    }

    pub fn preprocess_bytes(&self, bytes: &[u8]) -> Result<Tensor, DomainError> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| DomainError::invalid_image(format!("Cannot decode image: {}", e)))?;

        self.preprocess_image(&image)
    }

    pub fn preprocess_image(&self, image: &DynamicImage) -> Result<Tensor, DomainError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(DomainError::invalid_image("Image has no pixels"));
        }

        // Resizing before channel replication gives the same result as
        // resizing three identical channels.
        let gray = to_luma(image);
        let resized = image::imageops::resize(&gray, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);

        let side = INPUT_SIZE as usize;
        let to_tensor = || -> candle_core::Result<Tensor> {
            Tensor::from_vec(resized.into_raw(), (1, 1, side, side), &self.device)?
                .to_dtype(DType::F32)?
                .affine(2.0 / 255.0, -1.0)?
                .repeat((1, INPUT_CHANNELS, 1, 1))
        };

        to_tensor().map_err(|e| DomainError::inference(format!("Failed to build input tensor: {}", e)))
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new(Device::Cpu)
    }
}
