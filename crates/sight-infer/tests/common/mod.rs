#![allow(dead_code)]

use sight_infer::{
    BackendDescriptor, BackendError, BackendKind, BackendRegistry, ComputeRunner, CoreConfig, InferenceCore,
    MemoryModelReader, ModelSignature, Tensor, TensorSpec,
};
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Shared counters so tests can see what the registry did with runners.
#[derive(Default)]
pub struct RunnerStats {
    pub created: AtomicUsize,
    pub initialized: AtomicUsize,
    pub released: AtomicUsize,
    pub runs: AtomicUsize,
}

impl RunnerStats {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// What a fake model file describes. Fake model bytes are whitespace
/// separated `key=value` tokens, e.g. `input=1x3x8x8 output=1x3
/// values=0.2,0.2,0.9 fail_run=true delay_ms=5`. `panic_after=N` panics on
/// every run after the first N, `reject=gpu,cpu` makes those runners refuse
/// the model.
#[derive(Debug, Clone, PartialEq)]
pub struct FakeModel {
    pub input: Vec<i64>,
    pub output: Vec<i64>,
    pub values: Option<Vec<f32>>,
    pub fail_run: bool,
    pub delay_ms: u64,
    pub panic_after: Option<usize>,
    pub reject: Vec<BackendKind>,
}

fn dims(s: &str) -> Result<Vec<i64>, String> {
    s.split('x').map(|d| d.parse().map_err(|_| format!("bad dim {d:?}"))).collect()
}

impl FakeModel {
    pub fn parse(bytes: &[u8]) -> Result<Self, String> {
        let text = std::str::from_utf8(bytes).map_err(|_| "model is not a fake model".to_string())?;
        let mut model = FakeModel {
            input: Vec::new(),
            output: Vec::new(),
            values: None,
            fail_run: false,
            delay_ms: 0,
            panic_after: None,
            reject: Vec::new(),
        };
        for token in text.split_whitespace() {
            let (key, value) = token.split_once('=').ok_or_else(|| format!("bad token {token:?}"))?;
            match key {
                "input" => model.input = dims(value)?,
                "output" => model.output = dims(value)?,
                "values" => {
                    let values = value
                        .split(',')
                        .map(|v| v.parse().map_err(|_| format!("bad value {v:?}")))
                        .collect::<Result<Vec<f32>, String>>()?;
                    model.values = Some(values);
                }
                "fail_run" => model.fail_run = value == "true",
                "delay_ms" => model.delay_ms = value.parse().map_err(|_| format!("bad delay {value:?}"))?,
                "panic_after" => {
                    model.panic_after = Some(value.parse().map_err(|_| format!("bad panic_after {value:?}"))?)
                }
                "reject" => {
                    model.reject = value
                        .split(',')
                        .map(|kind| kind.parse().map_err(|_| format!("bad backend {kind:?}")))
                        .collect::<Result<Vec<BackendKind>, String>>()?;
                }
                other => return Err(format!("unknown key {other:?}")),
            }
        }
        if model.input.is_empty() {
            return Err("model has no input".to_string());
        }
        Ok(model)
    }

    pub fn signature(&self) -> ModelSignature {
        let outputs = if self.output.is_empty() {
            Vec::new()
        } else {
            vec![TensorSpec::new("output", self.output.clone())]
        };
        ModelSignature {
            inputs: vec![TensorSpec::new("input", self.input.clone())],
            outputs,
        }
    }
}

/// Encoded fake model with a `[1, 3, h, w]` input and `[1, classes]` output.
pub fn classifier_model(size: u32, classes: usize) -> Vec<u8> {
    format!("input=1x3x{size}x{size} output=1x{classes}").into_bytes()
}

/// Deterministic stand-in for an ONNX Runtime runner.
pub struct FakeRunner {
    kind: BackendKind,
    fail_init: bool,
    model: Option<FakeModel>,
    runs: usize,
    stats: Arc<RunnerStats>,
}

impl FakeRunner {
    pub fn new(kind: BackendKind, fail_init: bool, stats: Arc<RunnerStats>) -> Self {
        stats.created.fetch_add(1, Ordering::SeqCst);
        Self {
            kind,
            fail_init,
            model: None,
            runs: 0,
            stats,
        }
    }
}

impl ComputeRunner for FakeRunner {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn describe(&self) -> BackendDescriptor {
        BackendDescriptor::new(self.kind, true, vec!["fake".to_string()])
    }

    fn initialize(&mut self, model: &[u8]) -> Result<ModelSignature, BackendError> {
        self.model = None;
        if self.fail_init {
            return Err(BackendError::new(self.kind, "forced initialization failure"));
        }
        let model = FakeModel::parse(model).map_err(|e| BackendError::new(self.kind, e))?;
        if model.reject.contains(&self.kind) {
            return Err(BackendError::new(self.kind, "model rejected by this backend"));
        }
        self.runs = 0;
        let signature = model.signature();
        self.model = Some(model);
        self.stats.initialized.fetch_add(1, Ordering::SeqCst);
        Ok(signature)
    }

    fn run(&mut self, input: &Tensor<f32>) -> Result<Tensor<f32>, BackendError> {
        let model = self.model.as_ref().ok_or_else(|| BackendError::new(self.kind, "not initialized"))?;
        self.stats.runs.fetch_add(1, Ordering::SeqCst);

        let matches = input.shape.len() == model.input.len()
            && input.shape.iter().zip(&model.input).all(|(&got, &want)| want < 0 || got as i64 == want);
        if !matches {
            return Err(BackendError::new(
                self.kind,
                format!("input shape {:?} does not fit {:?}", input.shape, model.input),
            ));
        }
        if model.delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(model.delay_ms));
        }
        if model.fail_run {
            return Err(BackendError::new(self.kind, "forced run failure"));
        }
        if model.panic_after.is_some_and(|limit| self.runs >= limit) {
            panic!("runner crashed after {} runs", self.runs);
        }
        self.runs += 1;

        let shape: Vec<usize> = model.output.iter().map(|&d| if d < 0 { 1 } else { d as usize }).collect();
        let len = shape.iter().product::<usize>();
        let data = match &model.values {
            Some(values) => values.clone(),
            None => (0..len).map(|i| (i + 1) as f32 / len as f32).collect(),
        };
        Tensor::new(shape, data).map_err(|e| BackendError::new(self.kind, e.to_string()))
    }

    fn release(&mut self) {
        if self.model.take().is_some() {
            self.stats.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Registry with every kind available and backed by a FakeRunner. Kinds in
/// `failing` refuse to initialize.
pub fn fake_registry(failing: &[BackendKind], stats: Arc<RunnerStats>) -> BackendRegistry {
    let descriptors = BackendKind::ALL
        .into_iter()
        .map(|kind| BackendDescriptor::new(kind, true, vec!["fake".to_string()]))
        .collect();
    registry_with(descriptors, failing, stats)
}

pub fn registry_with(
    descriptors: Vec<BackendDescriptor>,
    failing: &[BackendKind],
    stats: Arc<RunnerStats>,
) -> BackendRegistry {
    let mut registry = BackendRegistry::new(descriptors);
    for kind in BackendKind::ALL {
        let fail_init = failing.contains(&kind);
        let stats = stats.clone();
        registry.register(kind, move |_| Box::new(FakeRunner::new(kind, fail_init, stats.clone())));
    }
    registry
}

/// Core over fake runners and an in-memory model store.
pub fn fake_core(failing: &[BackendKind], reader: MemoryModelReader) -> (InferenceCore, Arc<RunnerStats>) {
    let stats = Arc::new(RunnerStats::default());
    let core = InferenceCore::new(
        CoreConfig::default(),
        fake_registry(failing, stats.clone()),
        Box::new(reader),
    );
    (core, stats)
}

/// PNG bytes of a `width` x `height` image with a simple gradient.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128])
    });
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

pub fn temp_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("sight-infer-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
