pub mod logging;
pub mod tensor;

pub use logging::{init_file_logger, init_stdout_logger, set_log_level, FileLogger, LogLevel, StdoutLogger};
pub use tensor::{Tensor, TensorError};

// Re-export log crate so downstream crates can use sight_base::log::*
pub use log;
