pub mod onnx;

pub use onnx::OnnxRunner;
