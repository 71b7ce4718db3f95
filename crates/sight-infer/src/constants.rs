use sight_image::{IMAGENET_MEAN, IMAGENET_STD};

/// Spatial size used when a model declares dynamic height/width.
pub const DEFAULT_INPUT_SIZE: u32 = 224;

pub const DEFAULT_TOP_K: usize = 5;

pub const DEFAULT_MEAN: [f32; 3] = IMAGENET_MEAN;
pub const DEFAULT_STD: [f32; 3] = IMAGENET_STD;

/// Maps 8-bit pixels into [0, 1] before mean/std.
pub const DEFAULT_PIXEL_SCALE: f32 = 1.0 / 255.0;

/// Gray used for letterbox padding.
pub const DEFAULT_PAD_VALUE: u8 = 114;

/// Hosts match on these prefixes to decide whether a model is ready.
pub const LOAD_SUCCESS_PREFIX: &str = "Model loaded successfully";
pub const LOAD_FAILURE_PREFIX: &str = "Failed to load model";
