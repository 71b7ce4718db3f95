//! ONNX Runtime runners for each backend kind.
//!
//! All three kinds share one session wrapper and differ only in how the
//! session builder is configured: execution provider, thread count and
//! graph optimization level. Providers other than the default CPU one are
//! registered with `error_on_failure`, so a missing or broken provider
//! fails `initialize` and the registry moves on to the next kind.

use crate::backend::{BackendDescriptor, BackendKind, ComputeRunner};
use crate::error::BackendError;
use crate::signature::{ModelSignature, TensorSpec};
use ndarray::{ArrayViewD, IxDyn};
use ort::ep::{self, ExecutionProviderDispatch};
use ort::session::Session;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::value::TensorRef;
use sight_base::Tensor;
use std::num::NonZeroUsize;
use std::sync::OnceLock;

static ORT_INIT: OnceLock<()> = OnceLock::new();

/// Commit the ONNX Runtime environment once per process.
pub fn ensure_ort_init() {
    ORT_INIT.get_or_init(|| {
        let committed = ort::init().with_name("sight").commit();
        log::debug!("ort environment committed: {}", committed);
    });
}

/// GPU execution providers compiled into this build for this target, in
/// preference order.
fn gpu_providers() -> Vec<(&'static str, ExecutionProviderDispatch)> {
    #[allow(unused_mut)]
    let mut providers = Vec::new();

    #[cfg(all(target_os = "android", feature = "nnapi"))]
    providers.push((
        "nnapi",
        ep::NNAPI::default()
            .with_fp16(true)
            .with_disable_cpu(true)
            .build()
            .error_on_failure(),
    ));

    #[cfg(all(target_vendor = "apple", feature = "coreml"))]
    providers.push((
        "coreml",
        ep::CoreML::default()
            .with_compute_units(ep::coreml::ComputeUnits::All)
            .with_subgraphs(true)
            .build()
            .error_on_failure(),
    ));

    #[cfg(feature = "cuda")]
    providers.push(("cuda", ep::CUDA::default().build().error_on_failure()));

    providers
}

/// Whether the XNNPACK provider behind the SIMD CPU runner is compiled in
/// and usable.
pub fn simd_provider_available() -> bool {
    #[cfg(feature = "xnnpack")]
    {
        use ort::ep::ExecutionProvider;
        ensure_ort_init();
        ep::XNNPACK::default().is_available().unwrap_or(false)
    }
    #[cfg(not(feature = "xnnpack"))]
    {
        false
    }
}

/// Accelerator APIs ONNX Runtime reports as available on this device.
pub fn available_gpu_apis() -> Vec<String> {
    #[allow(unused_mut)]
    let mut apis = Vec::new();

    #[cfg(any(
        all(target_os = "android", feature = "nnapi"),
        all(target_vendor = "apple", feature = "coreml"),
        feature = "cuda"
    ))]
    {
        use ort::ep::ExecutionProvider;
        ensure_ort_init();

        #[cfg(all(target_os = "android", feature = "nnapi"))]
        if ep::NNAPI::default().is_available().unwrap_or(false) {
            apis.push("nnapi".to_string());
        }
        #[cfg(all(target_vendor = "apple", feature = "coreml"))]
        if ep::CoreML::default().is_available().unwrap_or(false) {
            apis.push("coreml".to_string());
        }
        #[cfg(feature = "cuda")]
        if ep::CUDA::default().is_available().unwrap_or(false) {
            apis.push("cuda".to_string());
        }
    }

    apis
}

pub struct OnnxRunner {
    kind: BackendKind,
    threads: usize,
    session: Option<Session>,
    input_name: String,
    output_name: String,
}

impl OnnxRunner {
    fn with_kind(kind: BackendKind, threads: usize) -> Self {
        Self {
            kind,
            threads: threads.max(1),
            session: None,
            input_name: String::new(),
            output_name: String::new(),
        }
    }

    /// Default CPU provider, one thread, basic optimizations.
    pub fn cpu() -> Self {
        Self::with_kind(BackendKind::Cpu, 1)
    }

    /// XNNPACK provider with `threads` worker threads, full optimizations.
    pub fn simd(threads: usize) -> Self {
        Self::with_kind(BackendKind::CpuSimd, threads)
    }

    /// First GPU provider compiled in for this target.
    pub fn gpu() -> Self {
        Self::with_kind(BackendKind::Gpu, 1)
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    fn err(&self, context: &str, e: impl std::fmt::Display) -> BackendError {
        BackendError::new(self.kind, format!("{context}: {e}"))
    }

    fn builder(&self) -> Result<SessionBuilder, BackendError> {
        let builder = Session::builder().map_err(|e| self.err("failed to create session builder", e))?;

        match self.kind {
            BackendKind::Cpu => builder
                .with_optimization_level(GraphOptimizationLevel::Level1)
                .and_then(|b| b.with_intra_threads(1))
                .and_then(|b| b.with_execution_providers([ep::CPU::default().build()]))
                .map_err(|e| self.err("failed to configure cpu session", e)),
            BackendKind::CpuSimd => {
                let threads = NonZeroUsize::new(self.threads).unwrap_or(NonZeroUsize::MIN);
                log::debug!("registering XNNPACK with {} threads", threads);
                // XNNPACK owns the worker pool; ORT's own pool stays at one thread
                builder
                    .with_optimization_level(GraphOptimizationLevel::Level3)
                    .and_then(|b| b.with_intra_threads(1))
                    .and_then(|b| {
                        b.with_execution_providers([ep::XNNPACK::default()
                            .with_intra_op_num_threads(threads)
                            .build()
                            .error_on_failure()])
                    })
                    .map_err(|e| self.err("XNNPACK execution provider unavailable", e))
            }
            BackendKind::Gpu => {
                let Some((name, provider)) = gpu_providers().into_iter().next() else {
                    return Err(BackendError::new(
                        self.kind,
                        "no GPU execution provider is compiled in for this target",
                    ));
                };
                log::debug!("registering {} execution provider", name);
                builder
                    .with_optimization_level(GraphOptimizationLevel::Level3)
                    .and_then(|b| b.with_execution_providers([provider]))
                    .map_err(|e| self.err(&format!("{name} execution provider unavailable"), e))
            }
        }
    }
}

fn outlet_spec(name: &str, dtype: &ort::value::ValueType) -> TensorSpec {
    let shape = dtype
        .tensor_shape()
        .map(|shape| shape.to_vec())
        .unwrap_or_default();
    TensorSpec::new(name, shape)
}

impl ComputeRunner for OnnxRunner {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn describe(&self) -> BackendDescriptor {
        let mut capabilities = vec![format!("threads={}", self.threads)];
        match self.kind {
            BackendKind::Cpu => capabilities.push("cpu".to_string()),
            BackendKind::CpuSimd => capabilities.push("xnnpack".to_string()),
            BackendKind::Gpu => capabilities.extend(gpu_providers().into_iter().map(|(name, _)| name.to_string())),
        }
        BackendDescriptor::new(self.kind, self.session.is_some(), capabilities)
    }

    fn initialize(&mut self, model: &[u8]) -> Result<ModelSignature, BackendError> {
        self.release();
        ensure_ort_init();

        let session = self
            .builder()?
            .commit_from_memory(model)
            .map_err(|e| self.err("failed to load model", e))?;

        let signature = ModelSignature {
            inputs: session
                .inputs()
                .iter()
                .map(|input| outlet_spec(input.name(), input.dtype()))
                .collect(),
            outputs: session
                .outputs()
                .iter()
                .map(|output| outlet_spec(output.name(), output.dtype()))
                .collect(),
        };

        self.input_name = signature.input().map(|s| s.name.clone()).unwrap_or_default();
        self.output_name = signature.output().map(|s| s.name.clone()).unwrap_or_default();
        self.session = Some(session);

        log::info!(
            "{} runner initialized: inputs {:?}, outputs {:?}",
            self.kind,
            signature.inputs,
            signature.outputs
        );
        Ok(signature)
    }

    fn run(&mut self, input: &Tensor<f32>) -> Result<Tensor<f32>, BackendError> {
        let kind = self.kind;
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| BackendError::new(kind, "runner is not initialized"))?;

        let view = ArrayViewD::from_shape(IxDyn(&input.shape), &input.data)
            .map_err(|e| BackendError::new(kind, format!("input does not match its shape: {e}")))?;
        let tensor_ref = TensorRef::from_array_view(view)
            .map_err(|e| BackendError::new(kind, format!("failed to create input tensor: {e}")))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => tensor_ref])
            .map_err(|e| BackendError::new(kind, format!("execution failed: {e}")))?;

        let value = outputs
            .get(&self.output_name)
            .ok_or_else(|| BackendError::new(kind, format!("output {:?} missing", self.output_name)))?;
        let array = value
            .try_extract_array::<f32>()
            .map_err(|e| BackendError::new(kind, format!("output is not f32: {e}")))?;

        ndarray_to_tensor(array.view()).map_err(|e| BackendError::new(kind, e))
    }

    fn release(&mut self) {
        if self.session.take().is_some() {
            log::debug!("{} runner released", self.kind);
        }
    }
}

pub fn ndarray_to_tensor(array: ArrayViewD<'_, f32>) -> Result<Tensor<f32>, String> {
    let shape = array.shape().to_vec();
    let data = array.iter().copied().collect();
    Tensor::new(shape, data).map_err(|e| format!("failed to create tensor from ndarray: {e}"))
}
