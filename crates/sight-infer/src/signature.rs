use crate::error::LoadError;
use serde::Serialize;
use sight_image::Layout;

/// Name and declared shape of one model input or output. Dynamic
/// dimensions are `-1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TensorSpec {
    pub name: String,
    pub shape: Vec<i64>,
}

impl TensorSpec {
    pub fn new(name: impl Into<String>, shape: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }
}

/// Inputs and outputs a runner reports after initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSignature {
    pub inputs: Vec<TensorSpec>,
    pub outputs: Vec<TensorSpec>,
}

/// Concrete input the preprocess stage has to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSpec {
    pub layout: Layout,
    pub height: u32,
    pub width: u32,
}

impl InputSpec {
    pub fn shape(&self) -> Vec<usize> {
        self.layout.shape(self.height as usize, self.width as usize)
    }
}

fn invalid(msg: impl Into<String>) -> LoadError {
    LoadError::InvalidSignature(msg.into())
}

fn spatial(dim: i64, fallback: u32, axis: &str) -> Result<u32, LoadError> {
    match dim {
        -1 => Ok(fallback),
        d if d > 0 => u32::try_from(d).map_err(|_| invalid(format!("{axis} {d} is too large"))),
        d => Err(invalid(format!("{axis} {d} is not a valid dimension"))),
    }
}

impl ModelSignature {
    pub fn input(&self) -> Option<&TensorSpec> {
        self.inputs.first()
    }

    /// The output whose values are reported to the host.
    pub fn output(&self) -> Option<&TensorSpec> {
        self.outputs.first()
    }

    /// Check that this is a single-image model this core can feed.
    pub fn validate(&self) -> Result<(), LoadError> {
        self.resolve_input(1).map(|_| ())
    }

    /// Work out layout and spatial size of the image input. Dynamic height
    /// or width fall back to `default_size`.
    pub fn resolve_input(&self, default_size: u32) -> Result<InputSpec, LoadError> {
        if self.inputs.len() != 1 {
            return Err(invalid(format!(
                "expected exactly one input, model has {}",
                self.inputs.len()
            )));
        }
        if self.outputs.is_empty() {
            return Err(invalid("model has no outputs"));
        }

        let input = &self.inputs[0];
        let shape = &input.shape;
        if shape.len() != 4 {
            return Err(invalid(format!(
                "input {:?} has rank {}, expected 4 (NCHW or NHWC)",
                input.name,
                shape.len()
            )));
        }
        if !matches!(shape[0], -1 | 1) {
            return Err(invalid(format!("batch size {} is not supported", shape[0])));
        }

        // a dynamic dim is compatible with 3 channels
        let layout = match (shape[1], shape[3]) {
            (3, _) | (-1, -1) => Layout::Nchw,
            (_, 3) => Layout::Nhwc,
            _ => {
                return Err(invalid(format!(
                    "input {:?} with shape {:?} is not a 3-channel image",
                    input.name, shape
                )));
            }
        };

        let (h, w) = match layout {
            Layout::Nchw => (shape[2], shape[3]),
            Layout::Nhwc => (shape[1], shape[2]),
        };

        Ok(InputSpec {
            layout,
            height: spatial(h, default_size, "height")?,
            width: spatial(w, default_size, "width")?,
        })
    }

    /// True when the primary output is one class-score vector: `[C]` or
    /// `[1, C]` with `C >= 2` (or dynamic).
    pub fn is_classification(&self) -> bool {
        let Some(output) = self.output() else {
            return false;
        };
        let classes = match output.shape.as_slice() {
            [c] => *c,
            [-1 | 1, c] => *c,
            _ => return false,
        };
        classes == -1 || classes >= 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature(input: Vec<i64>, output: Vec<i64>) -> ModelSignature {
        ModelSignature {
            inputs: vec![TensorSpec::new("input", input)],
            outputs: vec![TensorSpec::new("output", output)],
        }
    }

    #[test]
    fn test_resolve_nchw_static() {
        let spec = signature(vec![1, 3, 224, 224], vec![1, 1000]).resolve_input(300).unwrap();
        assert_eq!(spec.layout, Layout::Nchw);
        assert_eq!((spec.height, spec.width), (224, 224));
        assert_eq!(spec.shape(), vec![1, 3, 224, 224]);
    }

    #[test]
    fn test_resolve_nhwc_dynamic_spatial() {
        let spec = signature(vec![-1, -1, -1, 3], vec![1, 10]).resolve_input(192).unwrap();
        assert_eq!(spec.layout, Layout::Nhwc);
        assert_eq!((spec.height, spec.width), (192, 192));
    }

    #[test]
    fn test_fully_dynamic_defaults_to_nchw() {
        let spec = signature(vec![-1, -1, -1, -1], vec![1, 10]).resolve_input(224).unwrap();
        assert_eq!(spec.layout, Layout::Nchw);
    }

    #[test]
    fn test_rejects_non_image_inputs() {
        assert!(signature(vec![1, 128], vec![1, 2]).validate().is_err());
        assert!(signature(vec![1, 1, 28, 28], vec![1, 10]).validate().is_err());
        assert!(signature(vec![4, 3, 224, 224], vec![4, 10]).validate().is_err());
        assert!(signature(vec![1, 3, 0, 224], vec![1, 10]).validate().is_err());
    }

    #[test]
    fn test_rejects_missing_outputs_and_extra_inputs() {
        let mut sig = signature(vec![1, 3, 8, 8], vec![1, 10]);
        sig.outputs.clear();
        assert!(matches!(sig.validate(), Err(LoadError::InvalidSignature(_))));

        let mut sig = signature(vec![1, 3, 8, 8], vec![1, 10]);
        sig.inputs.push(TensorSpec::new("mask", vec![1, 8, 8]));
        assert!(sig.validate().is_err());
    }

    #[test]
    fn test_is_classification() {
        assert!(signature(vec![1, 3, 8, 8], vec![1, 1000]).is_classification());
        assert!(signature(vec![1, 3, 8, 8], vec![1000]).is_classification());
        assert!(signature(vec![1, 3, 8, 8], vec![-1, -1]).is_classification());
        assert!(!signature(vec![1, 3, 8, 8], vec![1, 1]).is_classification());
        assert!(!signature(vec![1, 3, 8, 8], vec![1, 56, 8400]).is_classification());
        assert!(!signature(vec![1, 3, 8, 8], vec![2, 10]).is_classification());
    }
}
