//! Host bindings for the process-wide inference core.
//!
//! `java` exports the JNI entry points for `io.sight.SightNative`, `capi`
//! the `sight_*` C functions for every other host. Both are thin shells
//! over `sight_infer::boundary` and share `InferenceCore::global()`.

pub mod capi;
pub mod java;
