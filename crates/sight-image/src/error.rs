use std::fmt;

#[derive(Debug)]
pub enum ImageError {
    Decode(String),
    Io(String),
    InvalidConfig(String),
    Tensor(sight_base::TensorError),
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::Decode(msg) => write!(f, "decode error: {msg}"),
            ImageError::Io(msg) => write!(f, "io error: {msg}"),
            ImageError::InvalidConfig(msg) => write!(f, "invalid preprocess config: {msg}"),
            ImageError::Tensor(err) => write!(f, "tensor error: {err}"),
        }
    }
}

impl std::error::Error for ImageError {}

impl From<crates_image::ImageError> for ImageError {
    fn from(err: crates_image::ImageError) -> Self {
        match err {
            crates_image::ImageError::IoError(e) => ImageError::Io(e.to_string()),
            other => ImageError::Decode(other.to_string()),
        }
    }
}

impl From<sight_base::TensorError> for ImageError {
    fn from(err: sight_base::TensorError) -> Self {
        ImageError::Tensor(err)
    }
}
