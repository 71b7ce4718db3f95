//! Image decoding and model-input preparation.
//!
//! Encoded bytes (PNG, JPEG, GIF, BMP, TIFF, WebP) are decoded to RGB,
//! fitted to the model's spatial size, normalized per channel and laid out
//! as a `[1, 3, H, W]` or `[1, H, W, 3]` float tensor.

pub mod error;
pub mod types;

pub use error::ImageError;
pub use types::{ChannelOrder, ImageInfo, Layout, ResizeMode};

use crates_image::imageops::{self, FilterType};
use crates_image::{Rgb, RgbImage};
use sight_base::Tensor;
use std::path::Path;

pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Parameters of the preprocess stage.
///
/// `mean` and `std` are given in RGB order and follow their channel when
/// `channel_order` is `Bgr`. A pixel `p` in `0..=255` becomes
/// `(p * scale - mean[c]) / std[c]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessConfig {
    pub width: u32,
    pub height: u32,
    pub resize: ResizeMode,
    pub pad_value: u8,
    pub scale: f32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
    pub channel_order: ChannelOrder,
    pub layout: Layout,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            width: 224,
            height: 224,
            resize: ResizeMode::Stretch,
            pad_value: 114,
            scale: 1.0 / 255.0,
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
            channel_order: ChannelOrder::Rgb,
            layout: Layout::Nchw,
        }
    }
}

impl PreprocessConfig {
    pub fn validate(&self) -> Result<(), ImageError> {
        if self.width == 0 || self.height == 0 {
            return Err(ImageError::InvalidConfig(format!(
                "target size {}x{} must be non-zero",
                self.width, self.height
            )));
        }
        if !self.scale.is_finite() {
            return Err(ImageError::InvalidConfig(format!("scale {} is not finite", self.scale)));
        }
        if let Some(s) = self.std.iter().find(|s| **s == 0.0 || !s.is_finite()) {
            return Err(ImageError::InvalidConfig(format!("std value {s} is unusable")));
        }
        if self.mean.iter().any(|m| !m.is_finite()) {
            return Err(ImageError::InvalidConfig("mean must be finite".to_string()));
        }
        Ok(())
    }

    /// Shape of the tensor [`preprocess`] produces.
    pub fn output_shape(&self) -> Vec<usize> {
        self.layout.shape(self.height as usize, self.width as usize)
    }
}

/// Decode encoded bytes into an RGB `[height, width, 3]` tensor.
pub fn decode_rgb(data: &[u8]) -> Result<Tensor<u8>, ImageError> {
    let rgb = crates_image::load_from_memory(data)?.to_rgb8();
    rgb_to_tensor(rgb)
}

/// Decode, fit and normalize an encoded image into a model input tensor.
pub fn preprocess(data: &[u8], config: &PreprocessConfig) -> Result<Tensor<f32>, ImageError> {
    config.validate()?;

    let decoded = crates_image::load_from_memory(data)?.to_rgb8();
    log::debug!(
        "decoded {}x{} image, fitting to {}x{} ({:?})",
        decoded.width(),
        decoded.height(),
        config.width,
        config.height,
        config.resize
    );

    let fitted = fit(decoded, config);
    normalize(&rgb_to_tensor(fitted)?, config)
}

fn rgb_to_tensor(rgb: RgbImage) -> Result<Tensor<u8>, ImageError> {
    let (width, height) = rgb.dimensions();
    Ok(Tensor::new(
        vec![height as usize, width as usize, 3],
        rgb.into_raw(),
    )?)
}

fn fit(image: RgbImage, config: &PreprocessConfig) -> RgbImage {
    let (w, h) = image.dimensions();
    let (target_w, target_h) = (config.width, config.height);
    if (w, h) == (target_w, target_h) {
        return image;
    }

    match config.resize {
        ResizeMode::Stretch => imageops::resize(&image, target_w, target_h, FilterType::Lanczos3),
        ResizeMode::Letterbox => {
            let scale = (target_w as f32 / w as f32).min(target_h as f32 / h as f32);
            let new_w = ((w as f32 * scale).round() as u32).clamp(1, target_w);
            let new_h = ((h as f32 * scale).round() as u32).clamp(1, target_h);

            let resized = imageops::resize(&image, new_w, new_h, FilterType::Lanczos3);
            let mut canvas = RgbImage::from_pixel(target_w, target_h, Rgb([config.pad_value; 3]));
            let pad_x = (target_w - new_w) / 2;
            let pad_y = (target_h - new_h) / 2;
            imageops::overlay(&mut canvas, &resized, pad_x as i64, pad_y as i64);
            canvas
        }
    }
}

/// Normalize an RGB `[height, width, 3]` tensor that already has the
/// configured spatial size.
pub fn normalize(pixels: &Tensor<u8>, config: &PreprocessConfig) -> Result<Tensor<f32>, ImageError> {
    let (height, width) = (config.height as usize, config.width as usize);
    if pixels.shape != [height, width, 3] {
        return Err(ImageError::InvalidConfig(format!(
            "expected pixels of shape [{height}, {width}, 3], got {:?}",
            pixels.shape
        )));
    }

    let plane = height * width;
    let mut out = vec![0.0f32; plane * 3];

    for (i, px) in pixels.data.chunks_exact(3).enumerate() {
        for (src, &value) in px.iter().enumerate() {
            let dst = match config.channel_order {
                ChannelOrder::Rgb => src,
                ChannelOrder::Bgr => 2 - src,
            };
            let v = (value as f32 * config.scale - config.mean[src]) / config.std[src];
            let idx = match config.layout {
                Layout::Nchw => dst * plane + i,
                Layout::Nhwc => i * 3 + dst,
            };
            out[idx] = v;
        }
    }

    Ok(Tensor::new(config.output_shape(), out)?)
}

/// Fully decode the image at `path` and report its size and color type.
pub fn probe_image(path: impl AsRef<Path>) -> Result<ImageInfo, ImageError> {
    let path = path.as_ref();
    let image = crates_image::open(path)?;
    Ok(ImageInfo {
        width: image.width(),
        height: image.height(),
        color: format!("{:?}", image.color()),
    })
}
